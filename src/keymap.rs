//! Key identifier to sound name tables
//!
//! Hardware key identifiers depend on the input backend: the rdev hook
//! reports macOS virtual key codes, evdev reports Linux input-event codes.
//! Each identifier space has its own built-in table. Both tables describe the
//! same physical keyboard, so a given key sounds the same on every backend.
//!
//! Tables are fixed at build time. There is no layout detection, so a
//! non-US or non-Apple keyboard may report codes that are not listed here.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Sound played on every key release, regardless of the key
pub const RELEASE_SOUND: &str = "release";

/// Opaque key identifier assigned by the input backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(pub u32);

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier space a key id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// macOS virtual key codes (rdev backend)
    MacOs,
    /// Linux input-event key codes (evdev backend)
    Evdev,
}

impl Layout {
    /// All built-in layouts
    pub const ALL: [Layout; 2] = [Layout::MacOs, Layout::Evdev];

    pub fn name(&self) -> &'static str {
        match self {
            Layout::MacOs => "macos",
            Layout::Evdev => "evdev",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable mapping from key identifier to sound name
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    sounds: HashMap<KeyId, &'static str>,
}

impl KeyMap {
    /// Build a table from `(code, sound name)` pairs
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, &'static str)>,
    {
        Self {
            sounds: entries
                .into_iter()
                .map(|(code, name)| (KeyId(code), name))
                .collect(),
        }
    }

    /// The built-in table for a layout
    pub fn builtin(layout: Layout) -> Self {
        match layout {
            Layout::MacOs => Self::new(MACOS.iter().copied()),
            Layout::Evdev => Self::new(EVDEV.iter().copied()),
        }
    }

    /// Look up the sound for a key
    pub fn resolve(&self, id: KeyId) -> Option<&'static str> {
        self.sounds.get(&id).copied()
    }

    /// Every distinct sound name the table can resolve to, sorted
    pub fn sound_names(&self) -> BTreeSet<&'static str> {
        self.sounds.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}

/// Every sound name reachable from any built-in table, plus the release sound
pub fn builtin_sound_names() -> BTreeSet<&'static str> {
    let mut names: BTreeSet<&'static str> = MACOS
        .iter()
        .chain(EVDEV.iter())
        .map(|&(_, name)| name)
        .collect();
    names.insert(RELEASE_SOUND);
    names
}

/// macOS virtual key codes
#[rustfmt::skip]
const MACOS: &[(u32, &str)] = &[
    (50, "a"),          // `
    (18, "q"),          // 1
    (19, "w"),          // 2
    (20, "e"),          // 3
    (21, "r"),          // 4
    (23, "t"),          // 5
    (22, "y"),          // 6
    (26, "u"),          // 7
    (28, "i"),          // 8
    (25, "o"),          // 9
    (29, "p"),          // 0
    (27, "t"),          // -
    (24, "y"),          // =
    (51, "backspace"),  // backspace

    (48, "caps lock"),  // tab
    (12, "q"),
    (13, "w"),
    (14, "e"),
    (15, "r"),
    (17, "t"),
    (16, "y"),
    (32, "u"),
    (34, "i"),
    (31, "o"),
    (35, "p"),
    (33, "o"),          // [
    (30, "p"),          // ]
    (42, "q"),          // \

    (57, "caps lock"),
    (0, "a"),
    (1, "s"),
    (2, "d"),
    (3, "f"),
    (5, "g"),
    (4, "h"),
    (38, "j"),
    (40, "k"),
    (37, "l"),
    (41, "k"),          // ;
    (39, "l"),          // '
    (36, "enter"),

    (56, "enter"),      // shift
    (6, "z"),
    (7, "x"),
    (8, "c"),
    (9, "v"),
    (11, "b"),
    (45, "n"),
    (46, "m"),
    (43, "b"),          // ,
    (47, "n"),          // .
    (44, "m"),          // /
    (60, "enter"),      // right shift

    (179, "z"),         // fn (media-key firmware)
    (63, "z"),          // fn
    (59, "x"),          // control
    (62, "x"),          // right control
    (58, "c"),          // option
    (55, "v"),          // command
    (49, "space"),
    (54, "v"),          // right command
    (61, "c"),          // right option

    (123, "h"),         // left
    (124, "l"),         // right
    (125, "j"),         // down
    (126, "k"),         // up

    (53, "a"),          // esc
    (145, "s"),         // f1 (brightness down)
    (144, "d"),         // f2 (brightness up)
    (160, "f"),         // f3 (mission control)
    (177, "g"),         // f4 (spotlight)
    (176, "h"),         // f5 (dictation)
    (178, "j"),         // f6 (do not disturb)
    (122, "s"),         // f1
    (120, "d"),         // f2
    (99, "f"),          // f3
    (118, "g"),         // f4
    (96, "h"),          // f5
    (97, "j"),          // f6
];

/// Linux input-event codes (linux/input-event-codes.h)
#[rustfmt::skip]
const EVDEV: &[(u32, &str)] = &[
    (41, "a"),          // KEY_GRAVE
    (2, "q"),           // KEY_1
    (3, "w"),
    (4, "e"),
    (5, "r"),
    (6, "t"),
    (7, "y"),
    (8, "u"),
    (9, "i"),
    (10, "o"),
    (11, "p"),          // KEY_0
    (12, "t"),          // KEY_MINUS
    (13, "y"),          // KEY_EQUAL
    (14, "backspace"),

    (15, "caps lock"),  // KEY_TAB
    (16, "q"),
    (17, "w"),
    (18, "e"),
    (19, "r"),
    (20, "t"),
    (21, "y"),
    (22, "u"),
    (23, "i"),
    (24, "o"),
    (25, "p"),
    (26, "o"),          // KEY_LEFTBRACE
    (27, "p"),          // KEY_RIGHTBRACE
    (43, "q"),          // KEY_BACKSLASH

    (58, "caps lock"),
    (30, "a"),
    (31, "s"),
    (32, "d"),
    (33, "f"),
    (34, "g"),
    (35, "h"),
    (36, "j"),
    (37, "k"),
    (38, "l"),
    (39, "k"),          // KEY_SEMICOLON
    (40, "l"),          // KEY_APOSTROPHE
    (28, "enter"),

    (42, "enter"),      // KEY_LEFTSHIFT
    (44, "z"),
    (45, "x"),
    (46, "c"),
    (47, "v"),
    (48, "b"),
    (49, "n"),
    (50, "m"),
    (51, "b"),          // KEY_COMMA
    (52, "n"),          // KEY_DOT
    (53, "m"),          // KEY_SLASH
    (54, "enter"),      // KEY_RIGHTSHIFT

    (464, "z"),         // KEY_FN
    (29, "x"),          // KEY_LEFTCTRL
    (97, "x"),          // KEY_RIGHTCTRL
    (56, "c"),          // KEY_LEFTALT
    (125, "v"),         // KEY_LEFTMETA
    (57, "space"),
    (126, "v"),         // KEY_RIGHTMETA
    (100, "c"),         // KEY_RIGHTALT

    (105, "h"),         // KEY_LEFT
    (106, "l"),         // KEY_RIGHT
    (108, "j"),         // KEY_DOWN
    (103, "k"),         // KEY_UP

    (1, "a"),           // KEY_ESC
    (59, "s"),          // KEY_F1
    (60, "d"),
    (61, "f"),
    (62, "g"),
    (63, "h"),
    (64, "j"),          // KEY_F6
];
