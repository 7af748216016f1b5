//! Error types for keyclack
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use crate::keymap::KeyId;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the keyclack application
#[derive(Error, Debug)]
pub enum KeyclackError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Sound loading error: {0}")]
    Load(#[from] LoadError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to capturing key events
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("evdev error: {0}")]
    Evdev(String),

    #[error("Global key hook failed: {0}")]
    Listen(String),

    #[error("Input backend '{0}' is not available on this platform")]
    Unsupported(String),
}

/// Errors related to loading the sound catalog
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot read sound pack at {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read sound '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode '{name}': {message}")]
    Decode { name: String, message: String },

    #[error("Sound '{name}' is provided by both {first} and {second}")]
    DuplicateSound {
        name: String,
        first: String,
        second: String,
    },

    #[error("Sound pack contains no .wav files")]
    Empty,

    #[error("Sound pack is missing sounds required by the key table: {}", .0.join(", "))]
    MissingSounds(Vec<String>),
}

/// Errors related to audio playback
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("No sound named '{0}' in the catalog")]
    UnknownSound(String),

    #[error("Audio output device not found: '{0}'. List devices with: keyclack devices")]
    DeviceNotFound(String),

    #[error("Failed to open audio output: {0}")]
    Output(String),

    #[error("Playback thread has stopped")]
    QueueClosed,
}

/// Errors raised while turning key events into sounds
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No sound registered for the key with code {0}")]
    UnmappedKey(KeyId),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

/// Result type alias using KeyclackError
pub type Result<T> = std::result::Result<T, KeyclackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sounds_lists_every_name() {
        let err = LoadError::MissingSounds(vec!["enter".to_string(), "release".to_string()]);
        assert_eq!(
            err.to_string(),
            "Sound pack is missing sounds required by the key table: enter, release"
        );
    }

    #[test]
    fn test_unmapped_key_message() {
        let err = DispatchError::UnmappedKey(KeyId(179));
        assert_eq!(err.to_string(), "No sound registered for the key with code 179");
    }
}
