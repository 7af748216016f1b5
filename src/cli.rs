// Command-line interface definitions for keyclack
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "keyclack")]
#[command(author, version, about = "Mechanical keyboard sounds for every key you type")]
#[command(long_about = "
Keyclack plays a mechanical keyboard click for every key you press and
release, in every application.

SETUP (Linux):
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Log out and back in
  3. Run: keyclack

SETUP (macOS):
  Grant Accessibility permission to your terminal in
  System Settings > Privacy & Security > Accessibility, then run: keyclack

SOUND PACKS:
  The built-in pack is synthesized at startup. To use your own recordings,
  point --sounds at a directory of .wav files named after each sound
  (a.wav ... z.wav, space.wav, enter.wav, backspace.wav, \"caps lock.wav\",
  release.wav) and run: keyclack check
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Sound pack: "builtin" or a directory of .wav files
    #[arg(long, value_name = "PACK")]
    pub sounds: Option<String>,

    /// Key capture backend (auto, evdev, rdev)
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<String>,

    /// Audio output device name
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Exit with an error when a key without a sound is pressed
    #[arg(long)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play key sounds (default if no command specified)
    Run,

    /// Load the sound pack and check it covers every key table
    Check,

    /// Play a single sound from the pack
    Play {
        /// Sound name, e.g. "a", "space" or "release"
        name: String,
    },

    /// List audio output devices
    Devices,

    /// Show current configuration
    Config,
}
