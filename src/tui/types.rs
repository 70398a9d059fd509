//! TUI type definitions for screens and actions.

use crate::player::Transport;

/// The current screen/view of the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    /// Landing screen listing the latest episodes
    Home,
    /// A single episode
    Detail,
    /// Loading/waiting for API response
    Loading,
}

/// Actions that can be returned from the TUI.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// No action, continue running
    None,
    /// Quit the application
    Quit,
    /// Open the detail screen for an episode id
    OpenEpisode(String),
    /// Play the landing list starting at an index
    PlayFromList(usize),
    /// Play the episode shown on the detail screen on its own
    PlayDetail,
    /// Return to the landing screen
    Back,
    /// Send a command to the player
    Player(Transport),
}
