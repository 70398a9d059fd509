//! Application state management and input handling.

use crate::config::Keybindings;
use crate::format::DisplayLocale;
use crate::player::Transport;
use crate::types::{Episode, EpisodeDetail};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;

use super::types::{Action, Screen};

/// Number of episodes highlighted at the top of the landing screen.
pub const LATEST_COUNT: usize = 2;

/// Application state for the TUI.
pub struct App {
    /// Current screen being displayed
    pub screen: Screen,
    /// Whether the app should quit
    pub should_quit: bool,
    /// Landing list, newest first
    pub episodes: Vec<EpisodeDetail>,
    /// List state for the landing list
    pub episode_list_state: ListState,
    /// Episode shown on the detail screen
    pub detail: Option<EpisodeDetail>,
    /// Scroll offset of the detail description
    pub detail_scroll: u16,
    /// Loading message
    pub loading_message: String,
    /// Error message to display
    pub error_message: Option<String>,
    /// Whether help modal is shown
    pub show_help: bool,
    /// Today's date as shown in the header
    pub header_date: String,
    /// Locale used for dates
    pub locale: DisplayLocale,
    /// Seconds moved by one seek key press
    pub seek_step: u64,
    /// Custom keybindings
    pub keybindings: Keybindings,
}

impl App {
    /// Create a new App with default state.
    pub fn new(
        keybindings: Keybindings,
        locale: DisplayLocale,
        seek_step: u64,
        header_date: String,
    ) -> Self {
        Self {
            screen: Screen::Loading,
            should_quit: false,
            episodes: Vec::new(),
            episode_list_state: ListState::default(),
            detail: None,
            detail_scroll: 0,
            loading_message: String::new(),
            error_message: None,
            show_help: false,
            header_date,
            locale,
            seek_step,
            keybindings,
        }
    }

    /// Set the app to loading state with a message.
    pub fn set_loading(&mut self, message: &str) {
        self.screen = Screen::Loading;
        self.loading_message = message.to_string();
    }

    /// Set the landing list and switch to the landing screen.
    pub fn set_episodes(&mut self, episodes: Vec<EpisodeDetail>) {
        let has_episodes = !episodes.is_empty();
        self.episodes = episodes;
        self.episode_list_state
            .select(if has_episodes { Some(0) } else { None });
        self.screen = Screen::Home;
    }

    /// Show an episode on the detail screen.
    pub fn set_detail(&mut self, detail: EpisodeDetail) {
        self.detail = Some(detail);
        self.detail_scroll = 0;
        self.screen = Screen::Detail;
    }

    /// Set an error message.
    pub fn set_error(&mut self, message: &str) {
        self.error_message = Some(message.to_string());
    }

    /// Clear error message.
    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    /// The landing list as a playlist, in display order.
    pub fn playlist(&self) -> Vec<Episode> {
        self.episodes.iter().map(|d| d.episode.clone()).collect()
    }

    /// The highlighted landing-list row.
    pub fn selected_episode(&self) -> Option<&EpisodeDetail> {
        self.episode_list_state
            .selected()
            .and_then(|i| self.episodes.get(i))
    }

    /// Handle keyboard input and return an action.
    pub fn handle_input(&mut self, key: KeyEvent) -> Action {
        // Global quit with Ctrl+C or Ctrl+Q
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('q') => {
                    self.should_quit = true;
                    return Action::Quit;
                }
                _ => {}
            }
        }

        // Any key dismisses the error popup
        if self.error_message.is_some() {
            self.clear_error();
            return Action::None;
        }

        if self.show_help {
            if key.code == KeyCode::Esc
                || self.keybindings.matches(&self.keybindings.help, &key)
                || self.keybindings.matches(&self.keybindings.quit, &key)
            {
                self.show_help = false;
            }
            return Action::None;
        }

        if self.keybindings.matches(&self.keybindings.help, &key) {
            self.show_help = true;
            return Action::None;
        }

        if let Some(command) = self.player_command(&key) {
            return Action::Player(command);
        }

        match self.screen {
            Screen::Home => self.handle_home_input(key),
            Screen::Detail => self.handle_detail_input(key),
            Screen::Loading => {
                // Allow quit during loading
                if self.keybindings.matches(&self.keybindings.quit, &key) {
                    self.should_quit = true;
                    return Action::Quit;
                }
                Action::None
            }
        }
    }

    /// Transport keys work on every screen.
    fn player_command(&self, key: &KeyEvent) -> Option<Transport> {
        let kb = &self.keybindings;
        let step = self.seek_step as f64;

        if kb.matches(&kb.toggle_play, key) {
            Some(Transport::TogglePlay)
        } else if kb.matches(&kb.next, key) {
            Some(Transport::Next)
        } else if kb.matches(&kb.previous, key) {
            Some(Transport::Previous)
        } else if kb.matches(&kb.shuffle, key) {
            Some(Transport::ToggleShuffle)
        } else if kb.matches(&kb.repeat, key) {
            Some(Transport::ToggleLoop)
        } else if kb.matches(&kb.seek_forward, key) {
            Some(Transport::SeekBy(step))
        } else if kb.matches(&kb.seek_backward, key) {
            Some(Transport::SeekBy(-step))
        } else if kb.matches(&kb.stop, key) {
            Some(Transport::Stop)
        } else {
            None
        }
    }

    fn handle_home_input(&mut self, key: KeyEvent) -> Action {
        if self.keybindings.matches(&self.keybindings.up, &key) {
            let i = self.episode_list_state.selected().unwrap_or(0);
            if i > 0 {
                self.episode_list_state.select(Some(i - 1));
            }
            Action::None
        } else if self.keybindings.matches(&self.keybindings.down, &key) {
            let i = self.episode_list_state.selected().unwrap_or(0);
            if i < self.episodes.len().saturating_sub(1) {
                self.episode_list_state.select(Some(i + 1));
            }
            Action::None
        } else if self.keybindings.matches(&self.keybindings.select, &key) {
            match self.selected_episode() {
                Some(detail) => Action::OpenEpisode(detail.episode.id.clone()),
                None => Action::None,
            }
        } else if self.keybindings.matches(&self.keybindings.play, &key) {
            match self.episode_list_state.selected() {
                Some(i) if i < self.episodes.len() => Action::PlayFromList(i),
                _ => Action::None,
            }
        } else if self.keybindings.matches(&self.keybindings.quit, &key) {
            self.should_quit = true;
            Action::Quit
        } else {
            Action::None
        }
    }

    fn handle_detail_input(&mut self, key: KeyEvent) -> Action {
        if self.keybindings.matches(&self.keybindings.play, &key) {
            if self.detail.is_some() {
                Action::PlayDetail
            } else {
                Action::None
            }
        } else if self.keybindings.matches(&self.keybindings.back, &key) {
            self.screen = Screen::Home;
            Action::Back
        } else if self.keybindings.matches(&self.keybindings.down, &key) {
            self.detail_scroll = self.detail_scroll.saturating_add(1);
            Action::None
        } else if self.keybindings.matches(&self.keybindings.up, &key) {
            self.detail_scroll = self.detail_scroll.saturating_sub(1);
            Action::None
        } else if self.keybindings.matches(&self.keybindings.quit, &key) {
            self.should_quit = true;
            Action::Quit
        } else {
            Action::None
        }
    }
}
