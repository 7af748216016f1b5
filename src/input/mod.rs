//! Key event capture module
//!
//! On Linux, the default backend reads kernel-level key events through
//! evdev. This works on every Wayland compositor and on X11 because it
//! operates at the Linux input subsystem level, but requires the user to be
//! in the 'input' group.
//!
//! Elsewhere (and on Linux when asked for), a global keyboard hook through
//! rdev is used. On macOS the terminal or app needs Accessibility
//! permission.
//!
//! Every backend delivers events from a single thread, in the order the
//! keys were pressed and released.

#[cfg(target_os = "linux")]
pub mod evdev_listener;
pub mod rdev_listener;

use crate::config::InputBackend;
use crate::dispatch::KeyEvent;
use crate::error::InputError;
use crate::keymap::Layout;
use tokio::sync::mpsc;

/// Capacity of the key event channel
pub(crate) const EVENT_CHANNEL_SIZE: usize = 256;

/// Trait for key capture implementations
#[async_trait::async_trait]
pub trait KeyListener: Send + Sync {
    /// Start listening for key events
    /// Returns a channel receiver for events
    async fn start(&mut self) -> Result<mpsc::Receiver<KeyEvent>, InputError>;

    /// Stop listening and clean up
    async fn stop(&mut self) -> Result<(), InputError>;

    /// Identifier space of the key ids this listener reports
    fn layout(&self) -> Layout;
}

/// Resolve "auto" to the preferred backend for this platform
pub fn resolve_backend(backend: InputBackend) -> InputBackend {
    match backend {
        InputBackend::Auto if cfg!(target_os = "linux") => InputBackend::Evdev,
        InputBackend::Auto => InputBackend::Rdev,
        other => other,
    }
}

/// Factory function to create the configured key listener
pub fn create_listener(backend: InputBackend) -> Result<Box<dyn KeyListener>, InputError> {
    match resolve_backend(backend) {
        InputBackend::Evdev => create_evdev_listener(),
        _ => Ok(Box::new(rdev_listener::RdevListener::new())),
    }
}

#[cfg(target_os = "linux")]
fn create_evdev_listener() -> Result<Box<dyn KeyListener>, InputError> {
    Ok(Box::new(evdev_listener::EvdevListener::new()?))
}

#[cfg(not(target_os = "linux"))]
fn create_evdev_listener() -> Result<Box<dyn KeyListener>, InputError> {
    Err(InputError::Unsupported("evdev".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_backend_is_kept() {
        assert_eq!(resolve_backend(InputBackend::Rdev), InputBackend::Rdev);
        assert_eq!(resolve_backend(InputBackend::Evdev), InputBackend::Evdev);
    }

    #[test]
    fn test_auto_backend() {
        let expected = if cfg!(target_os = "linux") {
            InputBackend::Evdev
        } else {
            InputBackend::Rdev
        };
        assert_eq!(resolve_backend(InputBackend::Auto), expected);
    }

    #[test]
    fn test_rdev_listener_reports_macos_layout() {
        let listener = create_listener(InputBackend::Rdev).unwrap();
        assert_eq!(listener.layout(), Layout::MacOs);
    }
}
