//! Audio module
//!
//! Loads the sound pack into an in-memory catalog and plays clips through
//! rodio, which works with PipeWire, PulseAudio, ALSA and CoreAudio.

pub mod catalog;
pub mod output;
pub mod source;
pub mod synth;

pub use catalog::{Clip, SoundCatalog};
pub use output::{AudioOutput, PlaybackQueue};
pub use source::{AssetSource, BuiltinSource, DirSource};

use crate::error::PlaybackError;

/// Something that can start playing a named sound
///
/// Implementations must not block until the sound finishes: every call
/// starts an independent playback that overlaps with any already running.
pub trait Player {
    /// Start playing the named sound from its beginning
    fn play(&self, name: &str) -> Result<(), PlaybackError>;
}

impl<P: Player + ?Sized> Player for &P {
    fn play(&self, name: &str) -> Result<(), PlaybackError> {
        (**self).play(name)
    }
}
