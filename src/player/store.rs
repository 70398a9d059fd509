//! Shared playback state and the actions that mutate it.
//!
//! [`PlayerStore`] is the single writer of [`PlaybackState`]. Views hold a
//! [`watch::Receiver`] from [`PlayerStore::subscribe`] and pull the latest
//! snapshot whenever it reports a change; every action publishes exactly one
//! new state.

use crate::error::{AppError, Result};
use crate::types::Episode;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;

/// Playlist, position and transport flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    episode_list: Vec<Episode>,
    current_index: usize,
    is_playing: bool,
    is_looping: bool,
    is_shuffling: bool,
    selection: u64,
}

impl PlaybackState {
    /// Episodes in playback order.
    pub fn episode_list(&self) -> &[Episode] {
        &self.episode_list
    }

    /// Index of the current episode. Always 0 when the list is empty.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn is_shuffling(&self) -> bool {
        self.is_shuffling
    }

    /// Bumped by every action that picks the current episode, even when it
    /// picks the same one again.
    pub fn selection(&self) -> u64 {
        self.selection
    }

    pub fn is_empty(&self) -> bool {
        self.episode_list.is_empty()
    }

    /// The episode under the play head, if any.
    pub fn current_episode(&self) -> Option<&Episode> {
        self.episode_list.get(self.current_index)
    }

    /// Whether `play_next` would move. Shuffling always has a next episode.
    pub fn has_next(&self) -> bool {
        self.is_shuffling || self.current_index + 1 < self.episode_list.len()
    }

    pub fn has_previous(&self) -> bool {
        self.current_index > 0
    }
}

/// Owner of the playback state.
///
/// Created once at startup and passed by reference to whoever needs to act on
/// playback; there is no global instance.
pub struct PlayerStore {
    tx: watch::Sender<PlaybackState>,
    rng: StdRng,
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerStore {
    /// Create an empty store with an entropy-seeded shuffle RNG.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create an empty store with a fixed shuffle seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let (tx, _rx) = watch::channel(PlaybackState::default());
        Self { tx, rng }
    }

    /// Register a new observer. The receiver starts out seeing the current
    /// state as already read.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.tx.subscribe()
    }

    /// Borrow the current state.
    ///
    /// Do not hold the guard across a call to an action.
    pub fn state(&self) -> watch::Ref<'_, PlaybackState> {
        self.tx.borrow()
    }

    /// Clone the current state.
    pub fn snapshot(&self) -> PlaybackState {
        self.tx.borrow().clone()
    }

    /// Replace the playlist with a single episode and start it.
    pub fn play(&mut self, episode: Episode) {
        debug!("play: {}", episode.id);
        self.tx.send_modify(|state| {
            state.episode_list = vec![episode];
            state.current_index = 0;
            state.selection += 1;
            state.is_playing = true;
        });
    }

    /// Replace the playlist with `list` and start at `index`.
    ///
    /// An empty list or an index outside it is rejected and leaves the state
    /// untouched.
    pub fn play_list(&mut self, list: Vec<Episode>, index: usize) -> Result<()> {
        if index >= list.len() {
            return Err(AppError::InvalidInput(format!(
                "index {} out of range for a playlist of {} episodes",
                index,
                list.len()
            )));
        }

        debug!("play_list: {} episodes from index {}", list.len(), index);
        self.tx.send_modify(|state| {
            state.episode_list = list;
            state.current_index = index;
            state.selection += 1;
            state.is_playing = true;
        });
        Ok(())
    }

    pub fn toggle_play(&mut self) {
        self.tx.send_modify(|state| state.is_playing = !state.is_playing);
    }

    /// Set the playing flag directly, used to mirror media element events.
    pub fn set_playing_state(&mut self, playing: bool) {
        self.tx.send_modify(|state| state.is_playing = playing);
    }

    pub fn toggle_loop(&mut self) {
        self.tx.send_modify(|state| state.is_looping = !state.is_looping);
    }

    pub fn toggle_shuffle(&mut self) {
        self.tx
            .send_modify(|state| state.is_shuffling = !state.is_shuffling);
    }

    /// Advance to the next episode.
    ///
    /// While shuffling this picks a uniformly random index, which may be the
    /// current one. Otherwise it steps forward when possible and does nothing
    /// at the end of the list.
    pub fn play_next(&mut self) {
        let (len, shuffling, has_next) = {
            let state = self.tx.borrow();
            (state.episode_list.len(), state.is_shuffling, state.has_next())
        };

        if len == 0 {
            return;
        }

        if shuffling {
            let next = self.rng.gen_range(0..len);
            debug!("play_next: shuffled to {}", next);
            self.tx.send_modify(|state| {
                state.current_index = next;
                state.selection += 1;
            });
        } else if has_next {
            self.tx.send_modify(|state| {
                state.current_index += 1;
                state.selection += 1;
            });
        }
    }

    /// Step back one episode, or do nothing at the start of the list.
    pub fn play_previous(&mut self) {
        if self.tx.borrow().has_previous() {
            self.tx.send_modify(|state| {
                state.current_index -= 1;
                state.selection += 1;
            });
        }
    }

    /// Empty the playlist and reset the index.
    ///
    /// The playing flag is left alone; the player view reacts to the empty
    /// list by unloading its media.
    pub fn clear_player_state(&mut self) {
        debug!("clear_player_state");
        self.tx.send_modify(|state| {
            state.episode_list.clear();
            state.current_index = 0;
        });
    }
}
