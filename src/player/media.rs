//! The playable media resource behind the player view.
//!
//! A [`MediaElement`] behaves like an HTML audio element: commands are
//! fire-and-forget, and whatever happened as a result shows up later as
//! [`MediaEvent`]s from [`MediaElement::poll_events`].

use crate::error::{AppError, Result};
use log::debug;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Lifecycle notifications emitted by a media element.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// The source is loaded and its length is known (if the backend can tell).
    MetadataLoaded { duration: Option<f64> },
    /// Playback position moved, in seconds.
    TimeUpdate(f64),
    /// Playback started or resumed.
    Play,
    /// Playback paused.
    Pause,
    /// The source played to its end without looping.
    Ended,
    /// The source could not be loaded or played.
    Error(String),
}

/// Audio resource contract required by the player view.
pub trait MediaElement {
    /// Set the source and start loading it. `duration_hint` is the length the
    /// API advertised, in seconds.
    fn load(&mut self, url: &str, duration_hint: Option<f64>) -> Result<()>;

    /// Drop the current source.
    fn unload(&mut self) -> Result<()>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Current position in seconds.
    fn position(&self) -> f64;

    /// Jump to an absolute position in seconds.
    fn seek(&mut self, seconds: f64) -> Result<()>;

    /// Length of the current source, once known.
    fn duration(&self) -> Option<f64>;

    /// Restart at the beginning instead of ending.
    fn set_looping(&mut self, looping: bool) -> Result<()>;

    /// Drain everything that happened since the previous call.
    fn poll_events(&mut self) -> Vec<MediaEvent>;
}

impl<M: MediaElement + ?Sized> MediaElement for Box<M> {
    fn load(&mut self, url: &str, duration_hint: Option<f64>) -> Result<()> {
        (**self).load(url, duration_hint)
    }

    fn unload(&mut self) -> Result<()> {
        (**self).unload()
    }

    fn play(&mut self) -> Result<()> {
        (**self).play()
    }

    fn pause(&mut self) -> Result<()> {
        (**self).pause()
    }

    fn position(&self) -> f64 {
        (**self).position()
    }

    fn seek(&mut self, seconds: f64) -> Result<()> {
        (**self).seek(seconds)
    }

    fn duration(&self) -> Option<f64> {
        (**self).duration()
    }

    fn set_looping(&mut self, looping: bool) -> Result<()> {
        (**self).set_looping(looping)
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        (**self).poll_events()
    }
}

/// A silent media element whose position follows the wall clock.
///
/// It trusts the duration hint handed to [`MediaElement::load`] and emits the
/// same event sequence an audio element would. [`ClockMedia::tick`] advances
/// it by an explicit amount, which is what tests use.
#[derive(Debug, Default)]
pub struct ClockMedia {
    source: Option<String>,
    duration: Option<f64>,
    position: f64,
    playing: bool,
    looping: bool,
    metadata_pending: bool,
    last_tick: Option<Instant>,
    events: VecDeque<MediaEvent>,
}

impl ClockMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL of the loaded source.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Advance playback by `delta`, queueing the resulting events.
    pub fn tick(&mut self, delta: Duration) {
        self.flush_metadata();

        if !self.playing || self.source.is_none() {
            return;
        }

        let Some(duration) = self.duration else {
            return;
        };

        self.position += delta.as_secs_f64();

        if self.position >= duration {
            if self.looping && duration > 0.0 {
                self.position %= duration;
                self.events.push_back(MediaEvent::TimeUpdate(self.position));
            } else {
                self.position = duration;
                self.playing = false;
                self.last_tick = None;
                self.events.push_back(MediaEvent::TimeUpdate(self.position));
                self.events.push_back(MediaEvent::Pause);
                self.events.push_back(MediaEvent::Ended);
            }
        } else {
            self.events.push_back(MediaEvent::TimeUpdate(self.position));
        }
    }

    fn flush_metadata(&mut self) {
        if !self.metadata_pending {
            return;
        }
        self.metadata_pending = false;

        match self.duration {
            Some(duration) => self.events.push_back(MediaEvent::MetadataLoaded {
                duration: Some(duration),
            }),
            None => {
                self.playing = false;
                self.events
                    .push_back(MediaEvent::Error("source has no known duration".to_string()));
            }
        }
    }
}

impl MediaElement for ClockMedia {
    fn load(&mut self, url: &str, duration_hint: Option<f64>) -> Result<()> {
        if url.trim().is_empty() {
            return Err(AppError::Player("empty media URL".to_string()));
        }

        debug!("clock media: load {}", url);
        self.source = Some(url.to_string());
        self.duration = duration_hint.filter(|d| d.is_finite() && *d >= 0.0);
        self.position = 0.0;
        self.playing = false;
        self.metadata_pending = true;
        self.last_tick = None;
        self.events.clear();
        Ok(())
    }

    fn unload(&mut self) -> Result<()> {
        let was_playing = self.playing;
        *self = Self {
            looping: self.looping,
            ..Self::default()
        };
        if was_playing {
            self.events.push_back(MediaEvent::Pause);
        }
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.flush_metadata();

        if self.source.is_none() || self.duration.is_none() || self.playing {
            return Ok(());
        }

        if self.duration.is_some_and(|d| self.position >= d) {
            self.position = 0.0;
        }

        self.playing = true;
        self.last_tick = Some(Instant::now());
        self.events.push_back(MediaEvent::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if !self.playing {
            return Ok(());
        }

        if let Some(last) = self.last_tick.take() {
            self.tick(last.elapsed());
        }

        if self.playing {
            self.playing = false;
            self.events.push_back(MediaEvent::Pause);
        }
        Ok(())
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn seek(&mut self, seconds: f64) -> Result<()> {
        if self.source.is_none() {
            return Ok(());
        }

        let upper = self.duration.unwrap_or(f64::MAX);
        self.position = seconds.clamp(0.0, upper);
        if self.playing {
            self.last_tick = Some(Instant::now());
        }
        self.events.push_back(MediaEvent::TimeUpdate(self.position));
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn set_looping(&mut self, looping: bool) -> Result<()> {
        self.looping = looping;
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        if let Some(last) = self.last_tick {
            let now = Instant::now();
            self.last_tick = Some(now);
            self.tick(now.duration_since(last));
        } else {
            self.flush_metadata();
        }

        self.events.drain(..).collect()
    }
}
