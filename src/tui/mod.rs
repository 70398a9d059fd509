//! Terminal User Interface for podcastr using ratatui.
//!
//! This module provides the landing list, the episode detail screen and the
//! always-visible player panel.

mod render;
mod state;
mod types;

pub use render::draw;
pub use state::{App, LATEST_COUNT};
pub use types::{Action, Screen};

use crossterm::event::{self, Event};
use std::io;
use std::time::Duration;

/// Poll for keyboard events with a timeout.
pub fn poll_event(timeout: Duration) -> io::Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}
