//! evdev-based key listener
//!
//! Uses the Linux evdev interface to read key events at the kernel level.
//! This works on all Wayland compositors and on X11 because it bypasses the
//! display server.
//!
//! The user must be in the 'input' group to access /dev/input/* devices.

use super::{KeyListener, EVENT_CHANNEL_SIZE};
use crate::dispatch::{KeyEvent, KeyTransition};
use crate::error::InputError;
use crate::keymap::{KeyId, Layout};
use evdev::{Device, InputEventKind, Key};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

/// evdev key event values
const KEY_RELEASED: i32 = 0;
const KEY_PRESSED: i32 = 1;
const KEY_REPEATED: i32 = 2;

/// evdev-based key listener
pub struct EvdevListener {
    /// Paths to keyboard devices
    device_paths: Vec<PathBuf>,
    /// Signal to stop the listener task
    stop_signal: Option<oneshot::Sender<()>>,
}

impl EvdevListener {
    /// Create a listener over every keyboard found in /dev/input
    pub fn new() -> Result<Self, InputError> {
        let device_paths = find_keyboard_devices()?;

        if device_paths.is_empty() {
            return Err(InputError::NoKeyboard);
        }

        tracing::debug!(
            "Found {} keyboard device(s): {:?}",
            device_paths.len(),
            device_paths
        );

        Ok(Self {
            device_paths,
            stop_signal: None,
        })
    }
}

#[async_trait::async_trait]
impl KeyListener for EvdevListener {
    async fn start(&mut self) -> Result<mpsc::Receiver<KeyEvent>, InputError> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_signal = Some(stop_tx);

        let device_paths = self.device_paths.clone();

        // Spawn the listener task
        tokio::task::spawn_blocking(move || {
            evdev_listener_loop(device_paths, tx, stop_rx);
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), InputError> {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        Ok(())
    }

    fn layout(&self) -> Layout {
        Layout::Evdev
    }
}

/// Map an evdev key event value to a transition
///
/// Auto-repeat (2) is reported as another hold, like the initial press.
fn classify(value: i32) -> Option<KeyTransition> {
    match value {
        KEY_PRESSED | KEY_REPEATED => Some(KeyTransition::Hold),
        KEY_RELEASED => Some(KeyTransition::Release),
        _ => None,
    }
}

/// Main listener loop running in a blocking task
fn evdev_listener_loop(
    device_paths: Vec<PathBuf>,
    tx: mpsc::Sender<KeyEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    // Open all keyboard devices in non-blocking mode
    let mut devices: Vec<Device> = device_paths
        .iter()
        .filter_map(|path| match Device::open(path) {
            Ok(device) => {
                // Set device to non-blocking mode so fetch_events doesn't block
                let fd = device.as_raw_fd();
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFL);
                    if flags != -1 {
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                }
                tracing::debug!("Opened device (non-blocking): {:?}", path);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("Failed to open {:?}: {}", path, e);
                None
            }
        })
        .collect();

    if devices.is_empty() {
        tracing::error!("No keyboard devices could be opened");
        return;
    }

    tracing::info!("Listening for key events on {} device(s)", devices.len());

    loop {
        // Check for stop signal (non-blocking)
        match stop_rx.try_recv() {
            Ok(_) | Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!("Key listener stopping");
                return;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        // Poll each device (all set to non-blocking mode)
        for device in &mut devices {
            // fetch_events returns immediately if no events (non-blocking)
            let Ok(events) = device.fetch_events() else {
                continue;
            };

            for event in events {
                let InputEventKind::Key(key) = event.kind() else {
                    continue;
                };
                let Some(transition) = classify(event.value()) else {
                    continue;
                };

                let key_event = KeyEvent {
                    id: KeyId(key.code() as u32),
                    transition,
                };
                tracing::trace!("{:?} value={} -> {:?}", key, event.value(), key_event);

                if tx.blocking_send(key_event).is_err() {
                    return; // Channel closed
                }
            }
        }

        // Small sleep to avoid busy-waiting
        std::thread::sleep(std::time::Duration::from_millis(2));
    }
}

/// Find all keyboard input devices
fn find_keyboard_devices() -> Result<Vec<PathBuf>, InputError> {
    let mut keyboards = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| InputError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| InputError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        // Only look at event* devices
        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);

        if !is_event_device {
            continue;
        }

        // Try to open and check if it's a keyboard
        match Device::open(&path) {
            Ok(device) => {
                let has_keys = device
                    .supported_keys()
                    .map(|keys| {
                        // A keyboard should have at least some letter keys
                        keys.contains(Key::KEY_A)
                            && keys.contains(Key::KEY_Z)
                            && keys.contains(Key::KEY_ENTER)
                    })
                    .unwrap_or(false);

                if has_keys {
                    tracing::debug!(
                        "Found keyboard: {:?} ({:?})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    keyboards.push(path);
                }
            }
            Err(e) => {
                // Permission denied is common for non-input-group users
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(InputError::DeviceAccess(path.display().to_string()));
                }
                // Other errors (device busy, etc.) - just skip
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(keyboards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::KeyMap;

    #[test]
    fn test_classify_values() {
        assert_eq!(classify(1), Some(KeyTransition::Hold));
        assert_eq!(classify(2), Some(KeyTransition::Hold));
        assert_eq!(classify(0), Some(KeyTransition::Release));
        assert_eq!(classify(7), None);
    }

    #[test]
    fn test_evdev_codes_match_table() {
        let keymap = KeyMap::builtin(Layout::Evdev);
        for (key, sound) in [
            (Key::KEY_A, "a"),
            (Key::KEY_ENTER, "enter"),
            (Key::KEY_SPACE, "space"),
            (Key::KEY_BACKSPACE, "backspace"),
            (Key::KEY_CAPSLOCK, "caps lock"),
            (Key::KEY_TAB, "caps lock"),
            (Key::KEY_LEFTSHIFT, "enter"),
            (Key::KEY_SEMICOLON, "k"),
            (Key::KEY_UP, "k"),
            (Key::KEY_ESC, "a"),
            (Key::KEY_F6, "j"),
            (Key::KEY_FN, "z"),
        ] {
            assert_eq!(keymap.resolve(KeyId(key.code() as u32)), Some(sound), "{:?}", key);
        }
    }
}
