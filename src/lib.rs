//! Keyclack: mechanical keyboard sounds for every key you type
//!
//! This library provides the core functionality for:
//! - Capturing system-wide key events via evdev (Linux) or rdev (macOS, X11)
//! - Mapping hardware key codes to named sounds through build-time key tables
//! - Playing each key's sound once per press, no matter how often the key
//!   auto-repeats, and a release sound on every key release
//! - Loading sound packs (synthesized or a directory of WAV files) and
//!   playing overlapping clips through rodio
//!
//! # Architecture
//!
//! ```text
//!          ┌──────────────┐   KeyEvent    ┌──────────────┐   play(name)   ┌──────────────┐
//!          │ Key listener │ ────────────▶ │  Dispatcher  │ ─────────────▶ │PlaybackQueue │
//!          │ (evdev/rdev) │  hold/release │  (KeyStates) │                │  (catalog)   │
//!          └──────────────┘               └──────────────┘                └──────────────┘
//!                                                │                               │ Arc<Clip>
//!                                                ▼                               ▼
//!                                         ┌──────────────┐                ┌──────────────┐
//!                                         │    KeyMap    │                │  Playback    │
//!                                         │ code → sound │                │thread (rodio)│
//!                                         └──────────────┘                └──────────────┘
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod dispatch;
pub mod error;
pub mod input;
pub mod keymap;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use daemon::Daemon;
pub use dispatch::{Dispatcher, KeyEvent, KeyTransition};
pub use error::{KeyclackError, Result};
pub use keymap::{KeyId, KeyMap, Layout};
