//! Configuration loading and types for keyclack
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/keyclack/config.toml)
//! 3. Environment variables (KEYCLACK_*)
//! 4. CLI arguments (highest priority)

use crate::error::KeyclackError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Keyclack Configuration
#
# Location: ~/.config/keyclack/config.toml
# All settings can be overridden via CLI flags

[sounds]
# Sound pack: "builtin" for the synthesized clicks, or a directory of .wav
# files named after the sound they provide (a.wav ... z.wav, space.wav,
# enter.wav, backspace.wav, "caps lock.wav", release.wav)
pack = "builtin"

[input]
# Key capture backend: "auto", "evdev" (Linux) or "rdev" (macOS, X11)
# "auto" picks evdev on Linux and rdev everywhere else
backend = "auto"

# What to do when a key with no sound is pressed:
# - skip: log a warning and keep running (default)
# - fatal: stop with an error
unmapped_key = "skip"

[output]
# Audio output device ("default" uses the system default)
# List devices with: keyclack devices
device = "default"

# Sample rate in Hz for the output stream and the built-in sounds
sample_rate = 44100

# Device buffering in milliseconds. Lower values make clicks follow the key
# more closely but may crackle on slow machines
latency_ms = 100
"#;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub sounds: SoundsConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Sound pack configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SoundsConfig {
    /// "builtin" or path to a directory of .wav files
    #[serde(default = "default_pack")]
    pub pack: String,
}

/// Input backend selection
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputBackend {
    /// evdev on Linux, rdev elsewhere
    #[default]
    Auto,
    /// Kernel-level key events from /dev/input (Linux only)
    Evdev,
    /// Global keyboard hook via rdev
    Rdev,
}

impl std::str::FromStr for InputBackend {
    type Err = KeyclackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(InputBackend::Auto),
            "evdev" => Ok(InputBackend::Evdev),
            "rdev" => Ok(InputBackend::Rdev),
            other => Err(KeyclackError::Config(format!(
                "Unknown input backend '{}'. Use auto, evdev or rdev",
                other
            ))),
        }
    }
}

/// Policy for keys missing from the key table
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedKeyPolicy {
    /// Log a warning and play nothing
    #[default]
    Skip,
    /// Stop the daemon with an error
    Fatal,
}

/// Key capture configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default)]
    pub backend: InputBackend,

    #[serde(default)]
    pub unmapped_key: UnmappedKeyPolicy,
}

/// Audio output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Output device name, or "default"
    #[serde(default = "default_device")]
    pub device: String,

    /// Sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Output buffering target in milliseconds
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u32,
}

fn default_pack() -> String {
    crate::audio::source::BUILTIN_PACK.to_string()
}

fn default_device() -> String {
    crate::audio::output::DEFAULT_DEVICE.to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_latency_ms() -> u32 {
    100
}

impl Default for SoundsConfig {
    fn default() -> Self {
        Self {
            pack: default_pack(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            latency_ms: default_latency_ms(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "keyclack")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<(), KeyclackError> {
        if !(8000..=192_000).contains(&self.output.sample_rate) {
            return Err(KeyclackError::Config(format!(
                "sample_rate {} is out of range (8000-192000)",
                self.output.sample_rate
            )));
        }
        if !(1..=1000).contains(&self.output.latency_ms) {
            return Err(KeyclackError::Config(format!(
                "latency_ms {} is out of range (1-1000)",
                self.output.latency_ms
            )));
        }
        if self.sounds.pack.trim().is_empty() {
            return Err(KeyclackError::Config("sounds.pack is empty".to_string()));
        }
        Ok(())
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, KeyclackError> {
    // Start with defaults
    let mut config = Config::default();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| KeyclackError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| KeyclackError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    if let Ok(pack) = std::env::var("KEYCLACK_SOUNDS") {
        config.sounds.pack = pack;
    }
    if let Ok(backend) = std::env::var("KEYCLACK_BACKEND") {
        config.input.backend = backend.parse()?;
    }
    if let Ok(device) = std::env::var("KEYCLACK_DEVICE") {
        config.output.device = device;
    }

    Ok(config)
}
