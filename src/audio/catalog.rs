//! Sound catalog
//!
//! Decodes every file of a sound pack once at startup and keeps the samples
//! in memory. The catalog is never mutated after loading, so it is shared
//! between the dispatcher and the playback thread through an `Arc`.

use super::source::AssetSource;
use crate::error::LoadError;
use crate::keymap::{KeyMap, RELEASE_SOUND};
use std::collections::{BTreeSet, HashMap};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A decoded sound, interleaved f32 samples in -1.0..1.0
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    samples: Arc<[f32]>,
    channels: u16,
    sample_rate: u32,
}

impl Clip {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            channels,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Decode WAV bytes into a clip
pub fn decode_wav(name: &str, data: Vec<u8>) -> Result<Clip, LoadError> {
    let decode_error = |message: String| LoadError::Decode {
        name: name.to_string(),
        message,
    };

    let reader =
        hound::WavReader::new(Cursor::new(data)).map_err(|e| decode_error(e.to_string()))?;
    let spec = reader.spec();

    if spec.sample_rate == 0 || spec.channels == 0 {
        return Err(decode_error(format!(
            "invalid format ({} Hz, {} channel(s))",
            spec.sample_rate, spec.channels
        )));
    }

    tracing::trace!(
        "Decoding {}: {} Hz, {} channel(s), {} bit {:?}",
        name,
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<Result<Vec<f32>, hound::Error>>()
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<f32>, hound::Error>>(),
    }
    .map_err(|e| decode_error(e.to_string()))?;

    if samples.is_empty() {
        return Err(decode_error("file contains no audio".to_string()));
    }

    Ok(Clip::new(samples, spec.channels, spec.sample_rate))
}

/// Immutable mapping from sound name to decoded clip
#[derive(Debug, Clone, Default)]
pub struct SoundCatalog {
    clips: HashMap<String, Arc<Clip>>,
}

impl SoundCatalog {
    /// Decode every asset of a sound pack
    ///
    /// Sounds are keyed by file name without its extension. Any unreadable or
    /// undecodable file fails the whole load.
    pub fn load_all(source: &dyn AssetSource) -> Result<Self, LoadError> {
        let files = source.list()?;
        if files.is_empty() {
            return Err(LoadError::Empty);
        }

        let mut clips = HashMap::with_capacity(files.len());
        let mut origins: HashMap<String, String> = HashMap::with_capacity(files.len());
        for file_name in files {
            let name = Path::new(&file_name)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or(&file_name)
                .to_string();

            if let Some(first) = origins.insert(name.clone(), file_name.clone()) {
                return Err(LoadError::DuplicateSound {
                    name,
                    first,
                    second: file_name,
                });
            }

            let clip = decode_wav(&name, source.read(&file_name)?)?;
            tracing::debug!(
                "Loaded sound '{}' ({:.0} ms)",
                name,
                clip.duration().as_secs_f64() * 1000.0
            );
            clips.insert(name, Arc::new(clip));
        }

        tracing::info!("Loaded {} sounds from {}", clips.len(), source.describe());
        Ok(Self { clips })
    }

    /// Build a catalog from already-decoded clips
    pub fn from_clips<I>(clips: I) -> Self
    where
        I: IntoIterator<Item = (String, Clip)>,
    {
        Self {
            clips: clips
                .into_iter()
                .map(|(name, clip)| (name, Arc::new(clip)))
                .collect(),
        }
    }

    /// Look up a sound by name
    pub fn get(&self, name: &str) -> Option<Arc<Clip>> {
        self.clips.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    /// Sorted sound names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clips.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Check that every sound the key table can resolve to is present,
    /// together with the release sound
    pub fn validate(&self, keymap: &KeyMap) -> Result<(), LoadError> {
        let mut required: BTreeSet<&str> = keymap.sound_names();
        required.insert(RELEASE_SOUND);

        let missing: Vec<String> = required
            .into_iter()
            .filter(|name| !self.contains(name))
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoadError::MissingSounds(missing))
        }
    }
}
