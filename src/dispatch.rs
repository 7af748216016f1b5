//! Key event dispatcher
//!
//! Turns the stream of raw key transitions into "play this sound" requests.
//! Input backends report a hold notification on the initial press and again
//! on every auto-repeat tick while the key stays down, so the dispatcher
//! keeps the last known state of each key and only plays a key's sound on
//! the first hold after a release:
//!
//! ```text
//!   absent/Released ──hold──▶ Held  (play key sound)
//!   Held            ──hold──▶ Held  (nothing)
//!   any             ──release─▶ Released (play "release")
//! ```
//!
//! Releases are not gated: every release plays the release
//! sound, even for a key never seen pressed.

use crate::audio::Player;
use crate::config::UnmappedKeyPolicy;
use crate::error::DispatchError;
use crate::keymap::{KeyId, KeyMap, RELEASE_SOUND};
use std::collections::HashMap;
use std::sync::Arc;

/// Kind of key transition reported by an input backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransition {
    /// Key is down (initial press or auto-repeat)
    Hold,
    /// Key was released
    Release,
}

/// A key transition tagged with the key that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub id: KeyId,
    pub transition: KeyTransition,
}

impl KeyEvent {
    pub fn hold(id: KeyId) -> Self {
        Self {
            id,
            transition: KeyTransition::Hold,
        }
    }

    pub fn release(id: KeyId) -> Self {
        Self {
            id,
            transition: KeyTransition::Release,
        }
    }
}

/// Last known state of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Held,
    Released,
}

/// Per-key transition state
///
/// Keys are added on their first event and never removed. A key with no
/// entry is treated as not held.
#[derive(Debug, Clone, Default)]
pub struct KeyStates {
    keys: HashMap<KeyId, KeyState>,
}

impl KeyStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: KeyId) -> Option<KeyState> {
        self.keys.get(&id).copied()
    }

    pub fn is_held(&self, id: KeyId) -> bool {
        self.get(id) == Some(KeyState::Held)
    }

    pub fn set(&mut self, id: KeyId, state: KeyState) {
        self.keys.insert(id, state);
    }

    /// Number of keys currently held
    pub fn held_count(&self) -> usize {
        self.keys.values().filter(|s| **s == KeyState::Held).count()
    }
}

/// What a hold notification led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome {
    /// The key's sound was requested
    Played(&'static str),
    /// The key was already held (auto-repeat)
    Repeat,
    /// The key has no sound and the policy says to skip it
    Skipped,
}

/// Maps key transitions to sounds, at most once per press
pub struct Dispatcher<P> {
    keymap: Arc<KeyMap>,
    states: KeyStates,
    player: P,
    policy: UnmappedKeyPolicy,
}

impl<P: Player> Dispatcher<P> {
    /// Create a dispatcher with fresh key state
    pub fn new(keymap: Arc<KeyMap>, player: P, policy: UnmappedKeyPolicy) -> Self {
        Self::with_states(keymap, KeyStates::new(), player, policy)
    }

    /// Create a dispatcher over an existing state store
    pub fn with_states(
        keymap: Arc<KeyMap>,
        states: KeyStates,
        player: P,
        policy: UnmappedKeyPolicy,
    ) -> Self {
        Self {
            keymap,
            states,
            player,
            policy,
        }
    }

    /// Handle one event from the input backend
    pub fn handle(&mut self, event: KeyEvent) -> Result<(), DispatchError> {
        match event.transition {
            KeyTransition::Hold => self.on_hold(event.id).map(|_| ()),
            KeyTransition::Release => self.on_release(event.id),
        }
    }

    /// A key is down: play its sound unless it was already held
    pub fn on_hold(&mut self, id: KeyId) -> Result<HoldOutcome, DispatchError> {
        if self.states.is_held(id) {
            return Ok(HoldOutcome::Repeat);
        }
        self.states.set(id, KeyState::Held);

        let Some(sound) = self.keymap.resolve(id) else {
            return match self.policy {
                UnmappedKeyPolicy::Fatal => Err(DispatchError::UnmappedKey(id)),
                UnmappedKeyPolicy::Skip => {
                    tracing::warn!("No sound registered for the key with code {}, ignoring", id);
                    Ok(HoldOutcome::Skipped)
                }
            };
        };

        tracing::debug!("Key {} pressed, playing '{}'", id, sound);
        self.player.play(sound)?;
        Ok(HoldOutcome::Played(sound))
    }

    /// A key was released: always play the release sound
    pub fn on_release(&mut self, id: KeyId) -> Result<(), DispatchError> {
        tracing::debug!("Key {} released", id);
        let played = self.player.play(RELEASE_SOUND);
        self.states.set(id, KeyState::Released);
        played.map_err(DispatchError::from)
    }

    pub fn states(&self) -> &KeyStates {
        &self.states
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn policy(&self) -> UnmappedKeyPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaybackError;
    use std::cell::RefCell;

    /// Player that records every request instead of making noise
    #[derive(Default)]
    struct RecordingPlayer {
        calls: RefCell<Vec<String>>,
        fail: bool,
    }

    impl RecordingPlayer {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Player for RecordingPlayer {
        fn play(&self, name: &str) -> Result<(), PlaybackError> {
            if self.fail {
                return Err(PlaybackError::UnknownSound(name.to_string()));
            }
            self.calls.borrow_mut().push(name.to_string());
            Ok(())
        }
    }

    fn dispatcher(policy: UnmappedKeyPolicy) -> Dispatcher<RecordingPlayer> {
        let keymap = KeyMap::new([(0, "a"), (1, "s"), (36, "enter"), (56, "enter"), (60, "enter")]);
        Dispatcher::new(Arc::new(keymap), RecordingPlayer::default(), policy)
    }

    #[test]
    fn test_repeated_holds_play_once() {
        let mut d = dispatcher(UnmappedKeyPolicy::Fatal);
        assert_eq!(d.on_hold(KeyId(0)).unwrap(), HoldOutcome::Played("a"));
        for _ in 0..20 {
            assert_eq!(d.on_hold(KeyId(0)).unwrap(), HoldOutcome::Repeat);
        }
        assert_eq!(d.player().calls(), vec!["a"]);
    }

    #[test]
    fn test_hold_after_release_plays_again() {
        let mut d = dispatcher(UnmappedKeyPolicy::Fatal);
        d.handle(KeyEvent::hold(KeyId(36))).unwrap();
        d.handle(KeyEvent::release(KeyId(36))).unwrap();
        d.handle(KeyEvent::hold(KeyId(36))).unwrap();
        assert_eq!(d.player().calls(), vec!["enter", "release", "enter"]);
    }

    #[test]
    fn test_release_is_not_gated() {
        let mut d = dispatcher(UnmappedKeyPolicy::Fatal);
        d.on_release(KeyId(0)).unwrap();
        d.on_release(KeyId(0)).unwrap();
        // Keys outside the table still make the release sound
        d.on_release(KeyId(999)).unwrap();
        assert_eq!(d.player().calls(), vec!["release"; 3]);
        assert_eq!(d.states().get(KeyId(999)), Some(KeyState::Released));
    }

    #[test]
    fn test_shared_sound_keys_are_independent() {
        let mut d = dispatcher(UnmappedKeyPolicy::Fatal);
        d.on_hold(KeyId(56)).unwrap();
        d.on_hold(KeyId(60)).unwrap();
        d.on_hold(KeyId(56)).unwrap();
        d.on_hold(KeyId(60)).unwrap();
        assert_eq!(d.player().calls(), vec!["enter", "enter"]);
        assert_eq!(d.states().held_count(), 2);
    }

    #[test]
    fn test_state_transitions() {
        let mut d = dispatcher(UnmappedKeyPolicy::Fatal);
        assert_eq!(d.states().get(KeyId(1)), None);
        d.on_hold(KeyId(1)).unwrap();
        assert_eq!(d.states().get(KeyId(1)), Some(KeyState::Held));
        d.on_release(KeyId(1)).unwrap();
        assert_eq!(d.states().get(KeyId(1)), Some(KeyState::Released));
    }

    #[test]
    fn test_unmapped_key_fatal() {
        let mut d = dispatcher(UnmappedKeyPolicy::Fatal);
        let err = d.on_hold(KeyId(179)).unwrap_err();
        assert!(matches!(err, DispatchError::UnmappedKey(KeyId(179))));
        assert!(d.player().calls().is_empty());
    }

    #[test]
    fn test_unmapped_key_skip_logs_once_per_press() {
        let mut d = dispatcher(UnmappedKeyPolicy::Skip);
        assert_eq!(d.on_hold(KeyId(179)).unwrap(), HoldOutcome::Skipped);
        assert_eq!(d.on_hold(KeyId(179)).unwrap(), HoldOutcome::Repeat);
        d.on_release(KeyId(179)).unwrap();
        assert_eq!(d.on_hold(KeyId(179)).unwrap(), HoldOutcome::Skipped);
        assert_eq!(d.player().calls(), vec!["release"]);
    }

    #[test]
    fn test_playback_error_is_returned() {
        let keymap = Arc::new(KeyMap::new([(0, "a")]));
        let player = RecordingPlayer {
            fail: true,
            ..Default::default()
        };
        let mut d = Dispatcher::new(keymap, player, UnmappedKeyPolicy::Fatal);

        assert!(matches!(d.on_hold(KeyId(0)), Err(DispatchError::Playback(_))));
        // Release still records the key as released
        assert!(d.on_release(KeyId(0)).is_err());
        assert_eq!(d.states().get(KeyId(0)), Some(KeyState::Released));
    }

    #[test]
    fn test_injected_state_is_respected() {
        let mut states = KeyStates::new();
        states.set(KeyId(0), KeyState::Held);
        let mut d = Dispatcher::with_states(
            Arc::new(KeyMap::new([(0, "a")])),
            states,
            RecordingPlayer::default(),
            UnmappedKeyPolicy::Fatal,
        );

        assert_eq!(d.on_hold(KeyId(0)).unwrap(), HoldOutcome::Repeat);
        assert!(d.player().calls().is_empty());
    }
}
