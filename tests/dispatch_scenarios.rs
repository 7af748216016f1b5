//! Key-to-sound dispatch scenarios
//!
//! Drives the public dispatcher API with scripted hold/release sequences and
//! checks exactly which sounds were requested, in order, using a recording
//! player in place of the audio device.

use keyclack::audio::{Clip, Player, PlaybackQueue, SoundCatalog};
use keyclack::config::UnmappedKeyPolicy;
use keyclack::error::{DispatchError, PlaybackError};
use keyclack::{Dispatcher, KeyEvent, KeyId, KeyMap};
use std::cell::RefCell;
use std::sync::Arc;

/// Records every play request
#[derive(Default)]
struct Recorder {
    calls: RefCell<Vec<String>>,
}

impl Player for Recorder {
    fn play(&self, name: &str) -> Result<(), PlaybackError> {
        self.calls.borrow_mut().push(name.to_string());
        Ok(())
    }
}

fn hold(code: u32) -> KeyEvent {
    KeyEvent::hold(KeyId(code))
}

fn release(code: u32) -> KeyEvent {
    KeyEvent::release(KeyId(code))
}

/// Run a sequence and return the requested sounds
fn run(keymap: KeyMap, events: &[KeyEvent]) -> Vec<String> {
    let recorder = Recorder::default();
    let mut dispatcher = Dispatcher::new(Arc::new(keymap), &recorder, UnmappedKeyPolicy::Fatal);
    for &event in events {
        dispatcher.handle(event).unwrap();
    }
    recorder.calls.take()
}

fn enter_table() -> KeyMap {
    KeyMap::new([(0, "a"), (36, "enter")])
}

// ============================================================================
// Press gating
// ============================================================================

#[test]
fn consecutive_holds_play_once() {
    let events = vec![hold(0); 50];
    assert_eq!(run(enter_table(), &events), vec!["a"]);
}

#[test]
fn hold_release_hold_retriggers() {
    let calls = run(enter_table(), &[hold(0), release(0), hold(0)]);
    assert_eq!(calls, vec!["a", "release", "a"]);
}

#[test]
fn repeats_between_presses_are_swallowed() {
    let calls = run(
        enter_table(),
        &[hold(0), hold(0), hold(0), release(0), hold(0), hold(0), release(0)],
    );
    assert_eq!(calls, vec!["a", "release", "a", "release"]);
}

// ============================================================================
// Release
// ============================================================================

#[test]
fn release_without_hold_still_plays() {
    assert_eq!(
        run(enter_table(), &[release(0), release(0)]),
        vec!["release", "release"]
    );
}

#[test]
fn release_of_different_keys_plays_each_time() {
    assert_eq!(
        run(enter_table(), &[release(0), release(36), release(12345)]),
        vec!["release", "release", "release"]
    );
}

// ============================================================================
// Shared sounds
// ============================================================================

#[test]
fn keys_sharing_a_sound_trigger_independently() {
    let keymap = KeyMap::new([(56, "enter"), (60, "enter")]);
    let calls = run(
        keymap,
        &[hold(56), hold(60), hold(56), hold(60), release(56), hold(56)],
    );
    assert_eq!(calls, vec!["enter", "enter", "release", "enter"]);
}

// ============================================================================
// Full scenario
// ============================================================================

#[test]
fn mixed_sequence_plays_in_order() {
    let calls = run(
        enter_table(),
        &[hold(0), hold(0), hold(36), release(0), hold(0), release(36)],
    );
    assert_eq!(calls, vec!["a", "enter", "release", "a", "release"]);
}

#[test]
fn mixed_sequence_through_playback_queue() {
    let clip = |v: f32| Clip::new(vec![v; 4], 1, 44100);
    let catalog = Arc::new(SoundCatalog::from_clips([
        ("a".to_string(), clip(0.1)),
        ("enter".to_string(), clip(0.2)),
        ("release".to_string(), clip(0.3)),
    ]));
    let keymap = enter_table();
    catalog.validate(&keymap).unwrap();

    let (queue, mut rx) = PlaybackQueue::new(catalog);
    let mut dispatcher = Dispatcher::new(Arc::new(keymap), queue, UnmappedKeyPolicy::Fatal);
    for event in [hold(0), hold(0), hold(36), release(0), hold(0), release(36)] {
        dispatcher.handle(event).unwrap();
    }

    let mut played = Vec::new();
    while let Ok(clip) = rx.try_recv() {
        played.push(clip.samples()[0]);
    }
    assert_eq!(played, vec![0.1, 0.2, 0.3, 0.1, 0.3]);
}

// ============================================================================
// Unmapped keys
// ============================================================================

#[test]
fn unmapped_key_is_an_error_under_fatal_policy() {
    let recorder = Recorder::default();
    let mut dispatcher =
        Dispatcher::new(Arc::new(enter_table()), &recorder, UnmappedKeyPolicy::Fatal);

    dispatcher.handle(hold(0)).unwrap();
    let err = dispatcher.handle(hold(99)).unwrap_err();
    assert!(matches!(err, DispatchError::UnmappedKey(KeyId(99))));
    assert_eq!(*recorder.calls.borrow(), vec!["a"]);
}

#[test]
fn unmapped_key_is_ignored_under_skip_policy() {
    let recorder = Recorder::default();
    let mut dispatcher =
        Dispatcher::new(Arc::new(enter_table()), &recorder, UnmappedKeyPolicy::Skip);

    for event in [hold(99), hold(99), release(99), hold(0)] {
        dispatcher.handle(event).unwrap();
    }
    assert_eq!(*recorder.calls.borrow(), vec!["release", "a"]);
}
