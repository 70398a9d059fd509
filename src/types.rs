//! Type definitions for the podcastr application.
//!
//! This module contains the episode value types shared by the API client,
//! the playback store and the TUI.

use serde::{Deserialize, Serialize};

/// A playable podcast episode.
///
/// Immutable once constructed; the store only ever clones it around.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Unique identifier, also used as the detail slug.
    pub id: String,

    /// Episode title.
    pub title: String,

    /// Display string of the participants.
    pub members: String,

    /// Cover image URL.
    pub thumbnail: String,

    /// Length in whole seconds.
    pub duration: u64,

    /// Audio stream URL.
    pub url: String,
}

impl Episode {
    /// Format the episode for one-line display in lists.
    ///
    /// # Examples
    ///
    /// ```
    /// use podcastr::types::Episode;
    ///
    /// let ep = Episode {
    ///     id: "a-importancia-da-contribuicao-em-open-source".to_string(),
    ///     title: "A importância da contribuição em Open Source".to_string(),
    ///     members: "Diego e Richard".to_string(),
    ///     thumbnail: "https://example.com/cover.jpg".to_string(),
    ///     duration: 3981,
    ///     url: "https://example.com/ep.m4a".to_string(),
    /// };
    /// assert_eq!(
    ///     ep.to_display(),
    ///     "A importância da contribuição em Open Source - Diego e Richard"
    /// );
    /// ```
    pub fn to_display(&self) -> String {
        if self.members.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.members)
        }
    }
}

/// An episode together with the presentation fields shown by the list and
/// detail screens.
///
/// The extra fields are formatted once when the record is loaded, never at
/// render time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EpisodeDetail {
    pub episode: Episode,

    /// Publication date, already localized (e.g. `08 jan 21`).
    pub published_at: String,

    /// Duration as `HH:MM:SS`.
    pub duration_as_string: String,

    /// Plain-text description.
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(members: &str) -> Episode {
        Episode {
            id: "ep1".to_string(),
            title: "Faladev #30".to_string(),
            members: members.to_string(),
            thumbnail: String::new(),
            duration: 60,
            url: "https://example.com/ep1.m4a".to_string(),
        }
    }

    #[test]
    fn test_episode_to_display_with_members() {
        assert_eq!(episode("Diego").to_display(), "Faladev #30 - Diego");
    }

    #[test]
    fn test_episode_to_display_without_members() {
        assert_eq!(episode("").to_display(), "Faladev #30");
    }
}
