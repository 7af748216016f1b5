//! Global key capture using rdev
//!
//! Provides system-wide keyboard event capture on macOS (and X11) using the
//! rdev crate. On macOS, Accessibility permission must be granted to the
//! terminal or app.
//!
//! rdev reports logical `Key` values, which are translated back to macOS
//! virtual key codes so the macOS key table applies on every platform.
//! Keys rdev cannot name arrive as `Key::Unknown(code)`. On macOS they keep
//! their raw code; elsewhere the code is an X11 or Windows one and the key is
//! dropped.

use super::{KeyListener, EVENT_CHANNEL_SIZE};
use crate::dispatch::KeyEvent;
use crate::error::InputError;
use crate::keymap::{KeyId, Layout};
use rdev::{listen, Event, EventType, Key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// rdev-based key listener
pub struct RdevListener {
    running: Arc<AtomicBool>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl RdevListener {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }
}

impl Default for RdevListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl KeyListener for RdevListener {
    async fn start(&mut self) -> Result<mpsc::Receiver<KeyEvent>, InputError> {
        warn_if_untrusted();

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);

        let thread_handle = std::thread::Builder::new()
            .name("keyclack-rdev".to_string())
            .spawn(move || {
                let running_clone = running.clone();

                let callback = move |event: Event| {
                    if !running_clone.load(Ordering::SeqCst) {
                        return;
                    }

                    let Some(key_event) = translate_event(&event.event_type) else {
                        return;
                    };

                    tracing::trace!("rdev event: {:?} -> {:?}", event.event_type, key_event);
                    if tx.blocking_send(key_event).is_err() {
                        // Receiver gone, nothing left to deliver to
                        running_clone.store(false, Ordering::SeqCst);
                    }
                };

                tracing::info!("Listening for key events (rdev)");

                // This blocks until an error occurs or the process is terminated
                if let Err(e) = listen(callback) {
                    tracing::error!("rdev listen error: {:?}", e);
                    tracing::warn!(
                        "Global key capture failed. On macOS grant Accessibility permission; \
                         on Linux try the evdev backend instead."
                    );
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| InputError::Listen(e.to_string()))?;

        self.thread_handle = Some(thread_handle);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), InputError> {
        self.running.store(false, Ordering::SeqCst);
        // rdev's listen() has no way to be stopped from another thread.
        // The callback goes quiet now and the thread ends with the process.
        self.thread_handle.take();
        Ok(())
    }

    fn layout(&self) -> Layout {
        Layout::MacOs
    }
}

/// Turn an rdev event into a key transition, if it is a keyboard event
/// for a key with a known code
fn translate_event(event_type: &EventType) -> Option<KeyEvent> {
    match *event_type {
        EventType::KeyPress(key) => macos_keycode(key).map(KeyEvent::hold),
        EventType::KeyRelease(key) => macos_keycode(key).map(KeyEvent::release),
        _ => None,
    }
}

/// macOS virtual key code for an rdev key
fn macos_keycode(key: Key) -> Option<KeyId> {
    let code = match key {
        Key::KeyA => 0,
        Key::KeyS => 1,
        Key::KeyD => 2,
        Key::KeyF => 3,
        Key::KeyH => 4,
        Key::KeyG => 5,
        Key::KeyZ => 6,
        Key::KeyX => 7,
        Key::KeyC => 8,
        Key::KeyV => 9,
        Key::IntlBackslash => 10,
        Key::KeyB => 11,
        Key::KeyQ => 12,
        Key::KeyW => 13,
        Key::KeyE => 14,
        Key::KeyR => 15,
        Key::KeyY => 16,
        Key::KeyT => 17,
        Key::Num1 => 18,
        Key::Num2 => 19,
        Key::Num3 => 20,
        Key::Num4 => 21,
        Key::Num6 => 22,
        Key::Num5 => 23,
        Key::Equal => 24,
        Key::Num9 => 25,
        Key::Num7 => 26,
        Key::Minus => 27,
        Key::Num8 => 28,
        Key::Num0 => 29,
        Key::RightBracket => 30,
        Key::KeyO => 31,
        Key::KeyU => 32,
        Key::LeftBracket => 33,
        Key::KeyI => 34,
        Key::KeyP => 35,
        Key::Return => 36,
        Key::KeyL => 37,
        Key::KeyJ => 38,
        Key::Quote => 39,
        Key::KeyK => 40,
        Key::SemiColon => 41,
        Key::BackSlash => 42,
        Key::Comma => 43,
        Key::Slash => 44,
        Key::KeyN => 45,
        Key::KeyM => 46,
        Key::Dot => 47,
        Key::Tab => 48,
        Key::Space => 49,
        Key::BackQuote => 50,
        Key::Backspace => 51,
        Key::Escape => 53,
        Key::MetaRight => 54,
        Key::MetaLeft => 55,
        Key::ShiftLeft => 56,
        Key::CapsLock => 57,
        Key::Alt => 58,
        Key::ControlLeft => 59,
        Key::ShiftRight => 60,
        Key::AltGr => 61,
        Key::ControlRight => 62,
        Key::Function => 63,
        Key::KpReturn => 76,
        Key::F5 => 96,
        Key::F6 => 97,
        Key::F7 => 98,
        Key::F3 => 99,
        Key::F8 => 100,
        Key::F9 => 101,
        Key::F11 => 103,
        Key::F10 => 109,
        Key::F12 => 111,
        Key::Home => 115,
        Key::PageUp => 116,
        Key::Delete => 117,
        Key::F4 => 118,
        Key::End => 119,
        Key::F2 => 120,
        Key::PageDown => 121,
        Key::F1 => 122,
        Key::LeftArrow => 123,
        Key::RightArrow => 124,
        Key::DownArrow => 125,
        Key::UpArrow => 126,
        // Only macOS reports raw codes in the virtual key code space
        #[cfg(target_os = "macos")]
        Key::Unknown(code) => code,
        other => {
            tracing::debug!("No macOS key code for {:?}, ignoring", other);
            return None;
        }
    };

    Some(KeyId(code))
}

#[cfg(target_os = "macos")]
fn warn_if_untrusted() {
    if !check_accessibility_permission() {
        tracing::warn!(
            "Accessibility permission not granted. \
             Grant access in: System Settings > Privacy & Security > Accessibility, \
             then restart keyclack"
        );
    }
}

#[cfg(not(target_os = "macos"))]
fn warn_if_untrusted() {}

/// Check if Accessibility permission is granted, prompting the user if not.
///
/// Calls AXIsProcessTrustedWithOptions with kAXTrustedCheckOptionPrompt=true,
/// which makes macOS show the "App wants to control this computer" dialog
/// if permission hasn't been granted yet.
#[cfg(target_os = "macos")]
fn check_accessibility_permission() -> bool {
    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrustedWithOptions(options: core_foundation::base::CFTypeRef) -> bool;
    }

    use core_foundation::base::TCFType;
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::CFDictionary;
    use core_foundation::string::CFString;

    let key = CFString::new("AXTrustedCheckOptionPrompt");
    let value = CFBoolean::true_value();
    let options = CFDictionary::from_CFType_pairs(&[(key.as_CFType(), value.as_CFType())]);

    unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef() as _) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::KeyMap;

    #[test]
    fn test_translate_press_and_release() {
        assert_eq!(
            translate_event(&EventType::KeyPress(Key::KeyA)),
            Some(KeyEvent::hold(KeyId(0)))
        );
        assert_eq!(
            translate_event(&EventType::KeyRelease(Key::Return)),
            Some(KeyEvent::release(KeyId(36)))
        );
    }

    #[test]
    fn test_translate_ignores_mouse() {
        assert_eq!(translate_event(&EventType::MouseMove { x: 1.0, y: 2.0 }), None);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_unknown_keys_keep_raw_code() {
        assert_eq!(macos_keycode(Key::Unknown(179)), Some(KeyId(179)));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_unknown_keys_are_dropped_off_macos() {
        // X11 keycode 122 is volume down, macOS 122 is F1
        assert_eq!(macos_keycode(Key::Unknown(122)), None);
        assert_eq!(macos_keycode(Key::Unknown(179)), None);
    }

    #[test]
    fn test_keys_without_code_are_dropped() {
        assert_eq!(macos_keycode(Key::PrintScreen), None);
        assert_eq!(macos_keycode(Key::Kp5), None);
    }

    #[test]
    fn test_every_typing_key_has_a_sound() {
        let keymap = KeyMap::builtin(Layout::MacOs);
        let typing_keys = [
            Key::BackQuote, Key::Num1, Key::Num0, Key::Minus, Key::Equal, Key::Backspace,
            Key::Tab, Key::KeyQ, Key::LeftBracket, Key::RightBracket, Key::BackSlash,
            Key::CapsLock, Key::KeyA, Key::SemiColon, Key::Quote, Key::Return,
            Key::ShiftLeft, Key::KeyZ, Key::Comma, Key::Dot, Key::Slash, Key::ShiftRight,
            Key::Function, Key::ControlLeft, Key::Alt, Key::MetaLeft, Key::Space,
            Key::MetaRight, Key::AltGr, Key::LeftArrow, Key::RightArrow, Key::DownArrow,
            Key::UpArrow, Key::Escape, Key::F1, Key::F6,
        ];

        for key in typing_keys {
            let id = macos_keycode(key).unwrap();
            assert!(keymap.resolve(id).is_some(), "{:?} ({}) has no sound", key, id);
        }
    }
}
