//! A terminal podcast player written in Rust.
//!
//! podcastr lists the latest episodes from an episode REST API, shows episode
//! details and plays them through a persistent player panel. Playback state
//! lives in a single [`player::PlayerStore`]; the [`player::PlayerView`] keeps
//! a media element (mpv over IPC, or a silent clock) in step with it.
//!
//! # Usage
//!
//! ```bash
//! # Run against a local API
//! cargo run -- --api-url http://localhost:3333
//!
//! # Run without audio output
//! cargo run -- --backend clock
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod format;
pub mod player;
pub mod tui;
pub mod types;
