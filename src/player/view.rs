//! The player view: owns the media element and keeps it in step with the
//! playback store.
//!
//! Store changes flow into the media element through [`PlayerView::sync`];
//! media lifecycle events flow back into store actions through
//! [`PlayerView::pump`]. UI transport commands go through
//! [`PlayerView::perform`], which refuses commands whose button would be
//! disabled.

use super::media::{MediaElement, MediaEvent};
use super::store::{PlaybackState, PlayerStore};
use crate::types::Episode;
use log::{debug, warn};
use tokio::sync::watch;

/// Where the player is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerPhase {
    /// No current episode
    Empty,
    Paused,
    Playing,
    /// The media element reported an error for the current episode
    Failed(String),
}

/// A command issued by a transport button or key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transport {
    TogglePlay,
    Next,
    Previous,
    ToggleLoop,
    ToggleShuffle,
    /// Relative seek in seconds
    SeekBy(f64),
    /// Absolute seek in seconds
    SeekTo(f64),
    /// Drop the playlist
    Stop,
}

/// Which transport controls are enabled for a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportControls {
    pub shuffle: bool,
    pub previous: bool,
    pub play: bool,
    pub next: bool,
    pub repeat: bool,
}

impl TransportControls {
    pub fn for_state(state: &PlaybackState) -> Self {
        let has_episode = state.current_episode().is_some();
        Self {
            shuffle: has_episode && state.episode_list().len() != 1,
            previous: has_episode && state.has_previous(),
            play: has_episode,
            next: has_episode && state.has_next(),
            repeat: has_episode,
        }
    }

    /// Whether `command` may run right now.
    pub fn allows(&self, command: Transport) -> bool {
        match command {
            Transport::TogglePlay | Transport::SeekBy(_) | Transport::SeekTo(_) => self.play,
            Transport::Stop => self.play,
            Transport::Next => self.next,
            Transport::Previous => self.previous,
            Transport::ToggleLoop => self.repeat,
            Transport::ToggleShuffle => self.shuffle,
        }
    }
}

/// Owns the single media element and mirrors the store into it.
pub struct PlayerView<M: MediaElement> {
    media: M,
    rx: watch::Receiver<PlaybackState>,
    state: PlaybackState,
    loaded: Option<Episode>,
    loaded_selection: u64,
    last_playing: bool,
    last_looping: bool,
    observing: bool,
    progress: u64,
    error: Option<String>,
}

impl<M: MediaElement> PlayerView<M> {
    /// Attach a media element to `store`. Call [`PlayerView::sync`] before the
    /// first frame to pick up whatever the store already holds.
    pub fn new(media: M, store: &PlayerStore) -> Self {
        let mut rx = store.subscribe();
        rx.mark_changed();
        Self {
            media,
            rx,
            state: PlaybackState::default(),
            loaded: None,
            loaded_selection: 0,
            last_playing: false,
            last_looping: false,
            observing: false,
            progress: 0,
            error: None,
        }
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    /// The snapshot the view last synced against.
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Episode currently loaded into the media element.
    pub fn episode(&self) -> Option<&Episode> {
        self.loaded.as_ref()
    }

    /// Whole seconds elapsed in the current episode.
    pub fn progress(&self) -> u64 {
        self.progress
    }

    pub fn controls(&self) -> TransportControls {
        TransportControls::for_state(&self.state)
    }

    pub fn phase(&self) -> PlayerPhase {
        if self.loaded.is_none() {
            PlayerPhase::Empty
        } else if let Some(err) = &self.error {
            PlayerPhase::Failed(err.clone())
        } else if self.last_playing {
            PlayerPhase::Playing
        } else {
            PlayerPhase::Paused
        }
    }

    /// Pull the latest store snapshot and bring the media element in line
    /// with it. Returns whether anything changed.
    pub fn sync(&mut self) -> bool {
        if !self.rx.has_changed().unwrap_or(false) {
            return false;
        }
        self.state = self.rx.borrow_and_update().clone();

        let mut reloaded = false;
        let current = self.state.current_episode().cloned();
        match current {
            None => {
                if self.loaded.take().is_some() {
                    debug!("player: list empty, unloading");
                    let result = self.media.unload();
                    self.report(result);
                }
                self.progress = 0;
                self.observing = false;
                self.error = None;
            }
            Some(episode) => {
                // a new selection restarts even an identical episode
                let selection = self.state.selection();
                if self.loaded.as_ref() != Some(&episode) || self.loaded_selection != selection {
                    self.loaded_selection = selection;
                    self.load(episode);
                    reloaded = true;
                }
            }
        }

        if self.state.is_looping() != self.last_looping {
            self.last_looping = self.state.is_looping();
            let result = self.media.set_looping(self.last_looping);
            self.report(result);
        }

        if reloaded {
            // a fresh source autoplays; its Play event brings the store along
            self.last_playing = self.state.is_playing();
        } else if self.state.is_playing() != self.last_playing {
            self.last_playing = self.state.is_playing();
            if self.loaded.is_some() {
                let result = if self.last_playing {
                    self.media.play()
                } else {
                    self.media.pause()
                };
                self.report(result);
            }
        }

        true
    }

    fn load(&mut self, episode: Episode) {
        debug!("player: loading {} from {}", episode.id, episode.url);
        self.progress = 0;
        self.observing = false;
        self.error = None;

        let result = self.media.load(&episode.url, Some(episode.duration as f64));
        self.loaded = Some(episode);
        self.report(result);

        if self.error.is_none() {
            // autoplay: the element starts as soon as it has a source
            let result = self.media.play();
            self.report(result);
        }
    }

    fn report(&mut self, result: crate::error::Result<()>) {
        if let Err(e) = result {
            warn!("player: media command failed: {}", e);
            self.error = Some(e.to_string());
        }
    }

    /// Drain media events and translate them into store actions.
    pub fn pump(&mut self, store: &mut PlayerStore) {
        for event in self.media.poll_events() {
            self.handle_event(event, store);
        }
    }

    /// React to a single media lifecycle event.
    pub fn handle_event(&mut self, event: MediaEvent, store: &mut PlayerStore) {
        match event {
            MediaEvent::MetadataLoaded { duration } => {
                debug!("player: metadata loaded, duration {:?}", duration);
                let result = self.media.seek(0.0);
                self.report(result);
                self.progress = 0;
                self.observing = true;
            }
            MediaEvent::TimeUpdate(position) => {
                if self.observing {
                    self.progress = position.max(0.0).floor() as u64;
                }
            }
            MediaEvent::Play => store.set_playing_state(true),
            MediaEvent::Pause => store.set_playing_state(false),
            MediaEvent::Ended => {
                if store.state().has_next() {
                    store.play_next();
                } else {
                    store.clear_player_state();
                }
            }
            MediaEvent::Error(message) => {
                warn!("player: media error: {}", message);
                self.error = Some(message);
                store.set_playing_state(false);
            }
        }
    }

    /// Move the play head to `seconds`, clamped to the episode length.
    pub fn seek_to(&mut self, seconds: f64) {
        let Some(episode) = &self.loaded else {
            return;
        };

        let target = seconds.clamp(0.0, episode.duration as f64);
        let result = self.media.seek(target);
        self.report(result);
        self.progress = target.floor() as u64;
    }

    pub fn seek_by(&mut self, delta: f64) {
        self.seek_to(self.progress as f64 + delta);
    }

    /// Run a transport command if its control is enabled. Returns whether it
    /// ran.
    pub fn perform(&mut self, command: Transport, store: &mut PlayerStore) -> bool {
        if !TransportControls::for_state(&store.state()).allows(command) {
            debug!("player: {:?} is disabled", command);
            return false;
        }

        match command {
            Transport::TogglePlay => store.toggle_play(),
            Transport::Next => store.play_next(),
            Transport::Previous => store.play_previous(),
            Transport::ToggleLoop => store.toggle_loop(),
            Transport::ToggleShuffle => store.toggle_shuffle(),
            Transport::SeekBy(delta) => self.seek_by(delta),
            Transport::SeekTo(target) => self.seek_to(target),
            Transport::Stop => store.clear_player_state(),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::media::ClockMedia;
    use std::time::Duration;

    fn episode(id: &str, duration: u64) -> Episode {
        Episode {
            id: id.to_string(),
            title: format!("Episode {}", id),
            members: String::new(),
            thumbnail: String::new(),
            duration,
            url: format!("https://example.com/{}.m4a", id),
        }
    }

    fn settle(view: &mut PlayerView<ClockMedia>, store: &mut PlayerStore) {
        for _ in 0..4 {
            view.sync();
            view.pump(store);
        }
        view.sync();
    }

    #[test]
    fn test_empty_store_disables_everything() {
        let store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        view.sync();

        let controls = view.controls();
        assert!(!controls.play);
        assert!(!controls.next);
        assert!(!controls.previous);
        assert!(!controls.shuffle);
        assert!(!controls.repeat);
        assert_eq!(view.phase(), PlayerPhase::Empty);
    }

    #[test]
    fn test_play_loads_and_starts_media() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);

        store.play(episode("a", 120));
        settle(&mut view, &mut store);

        assert_eq!(view.media().source(), Some("https://example.com/a.m4a"));
        assert!(view.media().is_playing());
        assert_eq!(view.phase(), PlayerPhase::Playing);
        assert_eq!(view.progress(), 0);
    }

    #[test]
    fn test_single_episode_disables_shuffle() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store.play(episode("a", 120));
        view.sync();

        assert!(!view.controls().shuffle);
        assert!(!view.perform(Transport::ToggleShuffle, &mut store));
        assert!(!store.state().is_shuffling());
    }

    #[test]
    fn test_toggle_play_pauses_media() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store.play(episode("a", 120));
        settle(&mut view, &mut store);

        assert!(view.perform(Transport::TogglePlay, &mut store));
        settle(&mut view, &mut store);

        assert!(!view.media().is_playing());
        assert!(!store.state().is_playing());
        assert_eq!(view.phase(), PlayerPhase::Paused);
    }

    #[test]
    fn test_media_pause_event_reaches_store() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store.play(episode("a", 120));
        settle(&mut view, &mut store);

        view.media_mut().pause().unwrap();
        settle(&mut view, &mut store);
        assert!(!store.state().is_playing());
    }

    #[test]
    fn test_sync_after_pump_shows_media_events_in_the_same_turn() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store.play(episode("a", 120));
        settle(&mut view, &mut store);

        view.media_mut().pause().unwrap();
        view.pump(&mut store);
        assert!(view.sync());
        assert_eq!(view.phase(), PlayerPhase::Paused);
        assert!(!view.controls().next);
    }

    #[test]
    fn test_progress_follows_time_updates() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store.play(episode("a", 120));
        settle(&mut view, &mut store);

        view.media_mut().tick(Duration::from_millis(42_700));
        view.pump(&mut store);
        assert_eq!(view.progress(), 42);
    }

    #[test]
    fn test_seek_clamps_and_updates_progress_immediately() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store.play(episode("a", 120));
        settle(&mut view, &mut store);

        assert!(view.perform(Transport::SeekTo(90.4), &mut store));
        assert_eq!(view.progress(), 90);
        assert!(view.media().position() >= 90.4);

        view.seek_to(500.0);
        assert_eq!(view.progress(), 120);

        view.seek_by(-1000.0);
        assert_eq!(view.progress(), 0);
    }

    #[test]
    fn test_end_of_track_advances_to_next() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store
            .play_list(vec![episode("a", 10), episode("b", 10)], 0)
            .unwrap();
        settle(&mut view, &mut store);

        view.media_mut().tick(Duration::from_secs(11));
        settle(&mut view, &mut store);

        assert_eq!(store.state().current_index(), 1);
        assert_eq!(view.media().source(), Some("https://example.com/b.m4a"));
        assert!(view.media().is_playing());
        assert!(store.state().is_playing());
    }

    #[test]
    fn test_end_of_track_restarts_a_repeated_shuffle_pick() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store
            .play_list(vec![episode("a", 10), episode("b", 10)], 1)
            .unwrap();
        store.toggle_shuffle();
        settle(&mut view, &mut store);

        // enough track endings for the shuffle to pick the same index again
        let mut repeated = false;
        for _ in 0..64 {
            let before = store.state().current_index();
            view.media_mut().tick(Duration::from_secs(11));
            settle(&mut view, &mut store);

            assert_eq!(view.phase(), PlayerPhase::Playing);
            assert!(store.state().is_playing());
            assert_eq!(view.progress(), 0);
            if store.state().current_index() == before {
                repeated = true;
            }
        }
        assert!(repeated);
    }

    #[test]
    fn test_end_of_track_moves_onto_duplicate_entry() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store
            .play_list(vec![episode("a", 10), episode("a", 10)], 0)
            .unwrap();
        settle(&mut view, &mut store);

        view.media_mut().tick(Duration::from_secs(11));
        settle(&mut view, &mut store);

        assert_eq!(store.state().current_index(), 1);
        assert_eq!(view.phase(), PlayerPhase::Playing);
        assert!(view.media().is_playing());
        assert!(view.media().position() < 1.0);
    }

    #[test]
    fn test_end_of_last_track_clears_the_list() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store.play(episode("e", 120));
        settle(&mut view, &mut store);

        view.media_mut().tick(Duration::from_secs(121));
        settle(&mut view, &mut store);

        assert!(store.state().is_empty());
        assert_eq!(view.phase(), PlayerPhase::Empty);
        assert!(view.media().source().is_none());
    }

    #[test]
    fn test_loop_restarts_instead_of_ending() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store.play(episode("e", 60));
        assert!(view.perform(Transport::ToggleLoop, &mut store));
        settle(&mut view, &mut store);
        assert!(view.media().is_looping());

        view.media_mut().tick(Duration::from_secs(61));
        settle(&mut view, &mut store);

        assert_eq!(store.state().episode_list().len(), 1);
        assert_eq!(view.phase(), PlayerPhase::Playing);
    }

    #[test]
    fn test_media_error_enters_failed_phase() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store.play(episode("a", 120));
        settle(&mut view, &mut store);

        view.handle_event(MediaEvent::Error("404".to_string()), &mut store);
        view.sync();

        assert_eq!(view.phase(), PlayerPhase::Failed("404".to_string()));
        assert!(!store.state().is_playing());

        store.play(episode("b", 30));
        settle(&mut view, &mut store);
        assert_eq!(view.phase(), PlayerPhase::Playing);
    }

    #[test]
    fn test_previous_disabled_at_start() {
        let mut store = PlayerStore::with_seed(3);
        let mut view = PlayerView::new(ClockMedia::new(), &store);
        store
            .play_list(vec![episode("a", 10), episode("b", 10)], 0)
            .unwrap();
        view.sync();

        assert!(!view.perform(Transport::Previous, &mut store));
        assert!(view.perform(Transport::Next, &mut store));
        assert_eq!(store.state().current_index(), 1);
        assert!(!view.perform(Transport::Next, &mut store));
    }
}
