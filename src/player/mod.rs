//! Playback core: the shared state store, the media element contract and the
//! view that ties them together.

pub mod media;
#[cfg(unix)]
pub mod mpv;
pub mod store;
pub mod view;

pub use media::{ClockMedia, MediaElement, MediaEvent};
#[cfg(unix)]
pub use mpv::MpvMedia;
pub use store::{PlaybackState, PlayerStore};
pub use view::{PlayerPhase, PlayerView, Transport, TransportControls};
