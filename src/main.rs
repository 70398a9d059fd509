//! Main entry point for the podcastr terminal player.

use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, info, warn};
use podcastr::api::{fetch_episode, fetch_episodes};
use podcastr::config::{Config, MediaBackend};
use podcastr::error::AppError;
use podcastr::format::{DisplayLocale, format_header_date};
use podcastr::player::{ClockMedia, MediaElement, PlayerStore, PlayerView};
use podcastr::tui::{Action, App, Screen, draw, poll_event};
use ratatui::prelude::*;
use std::fs::File;
use std::io::{self, stdout};
use std::time::Duration;

#[cfg(unix)]
use podcastr::player::MpvMedia;
#[cfg(unix)]
use std::env;
#[cfg(unix)]
use std::path::{Path, PathBuf};

/// Command-line arguments for podcastr.
#[derive(Parser, Debug)]
#[command(
    name = "podcastr",
    version,
    about = "A terminal podcast player",
    long_about = "Browse the latest episodes of a podcast API and listen to them from the terminal."
)]
struct Args {
    /// Base URL of the episode API (overrides config)
    #[arg(short, long)]
    api_url: Option<String>,

    /// Media backend: "mpv" or "clock" (overrides config)
    #[arg(short, long)]
    backend: Option<MediaBackend>,

    /// mpv binary to use (overrides config)
    #[arg(short, long)]
    player: Option<String>,

    /// Date locale: "pt-BR" or "en-US" (overrides config)
    #[arg(short = 'L', long)]
    locale: Option<DisplayLocale>,

    /// Log verbosity level: 0=error, 1=warn, 2=info, 3=debug, 4=trace
    #[arg(short, long, default_value_t = 1)]
    log: u8,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<String>,

    /// Open this episode's detail screen at start
    #[arg(short, long)]
    episode: Option<String>,
}

/// Search for an executable in the system PATH.
#[cfg(unix)]
fn find_in_path<P: AsRef<Path>>(exe_name: P) -> Option<PathBuf> {
    let exe_path = exe_name.as_ref();

    // If it's an absolute path or contains path separators, check it directly
    if exe_path.is_absolute()
        || exe_path
            .to_string_lossy()
            .contains(std::path::MAIN_SEPARATOR)
    {
        return exe_path.is_file().then(|| exe_path.to_path_buf());
    }

    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .map(|dir| dir.join(exe_path))
            .find(|full_path| full_path.is_file())
    })
}

#[cfg(unix)]
fn spawn_mpv(player: &str, player_args: &[String]) -> podcastr::error::Result<Box<dyn MediaElement>> {
    let path = find_in_path(player)
        .ok_or_else(|| AppError::Player(format!("{} not found in PATH", player)))?;
    info!("Using mpv at {}", path.display());
    Ok(Box::new(MpvMedia::spawn(&path.to_string_lossy(), player_args)?))
}

#[cfg(not(unix))]
fn spawn_mpv(_player: &str, _player_args: &[String]) -> podcastr::error::Result<Box<dyn MediaElement>> {
    Err(AppError::Player(
        "the mpv backend needs unix domain sockets".to_string(),
    ))
}

/// Build the media element for the chosen backend.
///
/// A missing or broken mpv falls back to the silent clock backend.
fn open_media(backend: MediaBackend, player: &str, player_args: &[String]) -> Box<dyn MediaElement> {
    match backend {
        MediaBackend::Clock => {
            info!("Using the clock backend");
            Box::new(ClockMedia::new())
        }
        MediaBackend::Mpv => spawn_mpv(player, player_args).unwrap_or_else(|e| {
            warn!("{}. Falling back to the clock backend.", e);
            Box::new(ClockMedia::new())
        }),
    }
}

/// Initialize the terminal for TUI rendering.
fn init_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

/// Restore the terminal to its original state.
fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;
    Ok(())
}

fn init_logging(level: u8, log_file: Option<&str>) -> io::Result<()> {
    let log_level = match level {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log_level)
        .format_timestamp(None)
        .format_target(false);

    if let Some(path) = log_file {
        let file = File::create(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    debug!("Log level set to {:?}", log_level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    init_logging(args.log, args.log_file.as_deref())?;

    match Config::create_default_if_missing() {
        Ok(path) => debug!("Config file at {}", path.display()),
        Err(e) => warn!("Could not write a default config: {}", e),
    }

    // Load config
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config: {}. Using defaults.", e);
        Config::new()
    });

    // CLI flags override the config file
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(player) = args.player {
        config.player = player;
    }
    if let Some(locale) = args.locale {
        config.locale = locale;
    }

    info!(
        "Using API {} with the {} backend",
        config.api_url, config.backend
    );

    let mut store = PlayerStore::new();
    let media = open_media(config.backend, &config.player, &config.player_args);
    let mut view = PlayerView::new(media, &store);

    let header_date = format_header_date(&Local::now(), config.locale);
    let mut app = App::new(
        config.keybindings.clone(),
        config.locale,
        config.seek_step,
        header_date,
    );

    // Initialize terminal
    let mut terminal = init_terminal()?;

    let result = run_app(
        &mut terminal,
        &mut app,
        &mut store,
        &mut view,
        &config,
        args.episode.as_deref(),
    )
    .await;

    // Restore terminal
    restore_terminal()?;

    result
}

/// Load an episode into the detail screen, falling back to the landing list.
async fn open_episode<M: MediaElement>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    view: &PlayerView<M>,
    config: &Config,
    slug: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    app.set_loading(&format!("Loading episode '{}'...", slug));
    terminal.draw(|f| draw(f, app, view))?;

    match fetch_episode(&config.api_url, slug, config.locale).await {
        Ok(detail) => app.set_detail(detail),
        Err(e) => {
            let message = match e {
                AppError::NotFound(_) => format!("Episode '{}' was not found", slug),
                other => other.to_string(),
            };
            app.set_error(&message);
            app.screen = Screen::Home;
        }
    }
    Ok(())
}

async fn run_app<M: MediaElement>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    store: &mut PlayerStore,
    view: &mut PlayerView<M>,
    config: &Config,
    initial_episode: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    view.sync();

    app.set_loading("Loading latest episodes...");
    terminal.draw(|f| draw(f, app, view))?;

    match fetch_episodes(&config.api_url, config.episode_limit, config.locale).await {
        Ok(episodes) => app.set_episodes(episodes),
        Err(e) => {
            app.set_episodes(Vec::new());
            app.set_error(&e.to_string());
        }
    }

    if let Some(slug) = initial_episode {
        open_episode(terminal, app, view, config, slug).await?;
    }

    loop {
        // Store changes into the media element, media events back into the store
        view.sync();
        view.pump(store);
        view.sync();

        // Draw UI
        terminal.draw(|f| draw(f, app, view))?;

        // Poll for events
        let Some(Event::Key(key)) = poll_event(Duration::from_millis(100))? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.handle_input(key) {
            Action::Quit => break,
            Action::None | Action::Back => {}
            Action::OpenEpisode(slug) => {
                open_episode(terminal, app, view, config, &slug).await?;
            }
            Action::PlayFromList(index) => {
                if let Err(e) = store.play_list(app.playlist(), index) {
                    app.set_error(&e.to_string());
                }
            }
            Action::PlayDetail => {
                if let Some(detail) = &app.detail {
                    store.play(detail.episode.clone());
                }
            }
            Action::Player(command) => {
                if !view.perform(command, store) {
                    debug!("Ignored {:?}: control disabled", command);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    store.clear_player_state();
    view.sync();

    Ok(())
}
