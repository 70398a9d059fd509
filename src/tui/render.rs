//! UI rendering functions for the TUI.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
};

use super::state::{App, LATEST_COUNT};
use super::types::Screen;
use crate::format::duration_to_time_string;
use crate::player::{MediaElement, PlayerPhase, PlayerView};
use crate::types::EpisodeDetail;

/// Draw the UI.
pub fn draw<M: MediaElement>(frame: &mut Frame, app: &mut App, view: &PlayerView<M>) {
    let size = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(7), // Player
            Constraint::Length(3), // Footer
        ])
        .split(size);

    draw_header(frame, app, chunks[0]);

    match app.screen {
        Screen::Loading => draw_loading(frame, app, chunks[1]),
        Screen::Home => draw_home(frame, app, chunks[1]),
        Screen::Detail => draw_detail(frame, app, chunks[1]),
    }

    draw_player(frame, view, chunks[2]);
    draw_footer(frame, app, chunks[3]);

    if let Some(error) = &app.error_message {
        draw_error_popup(frame, error);
    }

    if app.show_help {
        draw_help_modal(frame, app);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "podcastr",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            "The best for you to listen, always",
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", app.header_date),
            Style::default().fg(Color::Cyan),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL));

    frame.render_widget(header, area);
}

fn episode_row(index: usize, detail: &EpisodeDetail) -> ListItem<'static> {
    let mut title = vec![Span::styled(
        detail.episode.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if index < LATEST_COUNT {
        title.insert(
            0,
            Span::styled("[new] ", Style::default().fg(Color::Yellow)),
        );
    }

    let meta = Line::from(vec![
        Span::styled(
            detail.episode.members.clone(),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{} · {}", detail.published_at, detail.duration_as_string),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    ListItem::new(vec![Line::from(title), meta])
}

fn draw_home(frame: &mut Frame, app: &mut App, area: Rect) {
    if app.episodes.is_empty() {
        let empty = Paragraph::new("No episodes published yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Episodes"));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .episodes
        .iter()
        .enumerate()
        .map(|(i, d)| episode_row(i, d))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Latest releases ({})", app.episodes.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.episode_list_state);
}

fn draw_detail(frame: &mut Frame, app: &App, area: Rect) {
    let Some(detail) = &app.detail else {
        draw_loading(frame, app, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let summary = Paragraph::new(vec![
        Line::from(Span::styled(
            detail.episode.title.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            detail.episode.members.clone(),
            Style::default().fg(Color::Gray),
        )),
        Line::from(vec![
            Span::styled(detail.published_at.clone(), Style::default().fg(Color::Cyan)),
            Span::raw("  "),
            Span::styled(
                detail.duration_as_string.clone(),
                Style::default().fg(Color::Green),
            ),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Episode"))
    .wrap(Wrap { trim: true });

    frame.render_widget(summary, chunks[0]);

    let description = Paragraph::new(detail.description.as_str())
        .block(Block::default().borders(Borders::ALL).title("Description"))
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));

    frame.render_widget(description, chunks[1]);
}

fn control_span(label: &str, enabled: bool, active: bool) -> Span<'static> {
    let style = if !enabled {
        Style::default().fg(Color::DarkGray)
    } else if active {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    Span::styled(format!(" {} ", label), style)
}

fn draw_player<M: MediaElement>(frame: &mut Frame, view: &PlayerView<M>, area: Rect) {
    let phase = view.phase();
    let (phase_label, phase_color) = match &phase {
        PlayerPhase::Empty => ("stopped".to_string(), Color::DarkGray),
        PlayerPhase::Paused => ("paused".to_string(), Color::Yellow),
        PlayerPhase::Playing => ("playing".to_string(), Color::Green),
        PlayerPhase::Failed(err) => (format!("error: {}", err), Color::Red),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(vec![
            Span::raw("Now playing "),
            Span::styled(format!("[{}]", phase_label), Style::default().fg(phase_color)),
        ]));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(episode) = view.episode() else {
        let idle = Paragraph::new("Select a podcast to listen")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(idle, inner);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title and members
            Constraint::Length(1), // Progress
            Constraint::Length(1), // Controls
            Constraint::Min(0),
        ])
        .split(inner);

    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            episode.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            episode.members.clone(),
            Style::default().fg(Color::Gray),
        )),
    ]);
    frame.render_widget(title, rows[0]);

    let progress = view.progress();
    let ratio = if episode.duration > 0 {
        (progress as f64 / episode.duration as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
        .ratio(ratio)
        .label(format!(
            "{} / {}",
            duration_to_time_string(progress),
            duration_to_time_string(episode.duration)
        ));
    frame.render_widget(gauge, rows[1]);

    let controls = view.controls();
    let state = view.state();
    let play_label = if phase == PlayerPhase::Playing {
        "pause"
    } else {
        "play"
    };
    let buttons = Paragraph::new(Line::from(vec![
        control_span("shuffle", controls.shuffle, state.is_shuffling()),
        control_span("prev", controls.previous, false),
        control_span(play_label, controls.play, false),
        control_span("next", controls.next, false),
        control_span("repeat", controls.repeat, state.is_looping()),
    ]));
    frame.render_widget(buttons, rows[2]);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.screen {
        Screen::Home => {
            "[↑↓] navigate  [Enter] open  [p] play  [Space] pause  [n/b] next/prev  [?] help  [q] quit"
        }
        Screen::Detail => {
            "[p] play  [↑↓] scroll  [Bksp] back  [Space] pause  [←→] seek  [?] help  [q] quit"
        }
        Screen::Loading => "[?] help  [q] quit",
    };

    let footer = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}

fn draw_loading(frame: &mut Frame, app: &App, area: Rect) {
    let loading = Paragraph::new(app.loading_message.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Loading"));

    frame.render_widget(loading, area);
}

fn draw_error_popup(frame: &mut Frame, error: &str) {
    let area = centered_rect(60, 20, frame.area());
    frame.render_widget(Clear, area);

    let popup = Paragraph::new(format!("{}\n\nPress any key to dismiss", error))
        .style(Style::default().fg(Color::Red))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Error")
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(popup, area);
}

fn draw_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 80, frame.area());
    frame.render_widget(Clear, area);

    let (title, content) = get_help_content(app);

    let help_text = Paragraph::new(content)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Help - {}", title))
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(help_text, area);
}

fn get_help_content(app: &App) -> (&'static str, String) {
    let global_keys = "\
Global Commands
───────────────
  ?           Show/hide this help
  Ctrl+C      Force quit
  Ctrl+Q      Force quit
  q           Quit

";

    let player_keys = format!(
        "\
Player
──────
  Space       Play / pause
  n           Next episode
  b           Previous episode
  s           Toggle shuffle
  r           Toggle repeat
  l / →       Forward {step}s
  h / ←       Back {step}s
  x           Stop and clear the playlist

",
        step = app.seek_step
    );

    let home_keys = "\
Episodes
────────
  j / ↓       Move down
  k / ↑       Move up
  Enter       Open episode
  p           Play from here through the list

";

    let detail_keys = "\
Episode
───────
  p           Play this episode
  j / k       Scroll description
  Backspace   Back to the list

";

    match app.screen {
        Screen::Home => (
            "Episodes",
            format!("{}{}{}Press ? to close", global_keys, home_keys, player_keys),
        ),
        Screen::Detail => (
            "Episode",
            format!("{}{}{}Press ? to close", global_keys, detail_keys, player_keys),
        ),
        Screen::Loading => (
            "Loading",
            format!("{}{}Press ? to close", global_keys, player_keys),
        ),
    }
}

/// Helper function to create a centered rect.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
