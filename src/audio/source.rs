//! Sound pack sources
//!
//! A sound pack is a flat, read-only collection of WAV files named after the
//! sound they provide (`a.wav`, `enter.wav`, `release.wav`, ...). Packs come
//! either from a directory on disk or from the built-in synthesizer.

use super::synth;
use crate::error::LoadError;
use crate::keymap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the synthesized sound pack in configuration
pub const BUILTIN_PACK: &str = "builtin";

/// Enumerable, read-only collection of sound files
pub trait AssetSource {
    /// Human-readable description for logs
    fn describe(&self) -> String;

    /// File names of every asset in the pack
    fn list(&self) -> Result<Vec<String>, LoadError>;

    /// Raw bytes of one asset
    fn read(&self, file_name: &str) -> Result<Vec<u8>, LoadError>;
}

/// Sound pack backed by a directory of `.wav` files
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

impl AssetSource for DirSource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn list(&self) -> Result<Vec<String>, LoadError> {
        let source_error = |source| LoadError::Source {
            path: self.dir.clone(),
            source,
        };

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(source_error)? {
            let path = entry.map_err(source_error)?.path();

            if !path.is_file() || !is_wav(&path) {
                tracing::debug!("Skipping non-WAV entry {:?}", path);
                continue;
            }

            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    fn read(&self, file_name: &str) -> Result<Vec<u8>, LoadError> {
        std::fs::read(self.dir.join(file_name)).map_err(|source| LoadError::Read {
            name: file_name.to_string(),
            source,
        })
    }
}

/// Sound pack synthesized in memory, one click per built-in sound name
pub struct BuiltinSource {
    files: BTreeMap<String, Vec<u8>>,
}

impl BuiltinSource {
    /// Synthesize every sound the built-in key tables need
    pub fn new(sample_rate: u32) -> Result<Self, LoadError> {
        let files = keymap::builtin_sound_names()
            .into_iter()
            .map(|name| {
                synth::generate_click_wav(name, sample_rate)
                    .map(|wav| (format!("{}.wav", name), wav))
                    .map_err(|e| LoadError::Decode {
                        name: name.to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self { files })
    }
}

impl AssetSource for BuiltinSource {
    fn describe(&self) -> String {
        BUILTIN_PACK.to_string()
    }

    fn list(&self) -> Result<Vec<String>, LoadError> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read(&self, file_name: &str) -> Result<Vec<u8>, LoadError> {
        self.files
            .get(file_name)
            .cloned()
            .ok_or_else(|| LoadError::Read {
                name: file_name.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }
}

/// Open the sound pack named in configuration
///
/// `"builtin"` selects the synthesized pack, anything else is a directory.
pub fn open_pack(pack: &str, sample_rate: u32) -> Result<Box<dyn AssetSource>, LoadError> {
    if pack.eq_ignore_ascii_case(BUILTIN_PACK) {
        Ok(Box::new(BuiltinSource::new(sample_rate)?))
    } else {
        Ok(Box::new(DirSource::new(pack)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_source_lists_every_sound() {
        let source = BuiltinSource::new(44100).unwrap();
        let names = source.list().unwrap();
        assert!(names.contains(&"release.wav".to_string()));
        assert!(names.contains(&"caps lock.wav".to_string()));
        assert_eq!(names.len(), keymap::builtin_sound_names().len());
    }

    #[test]
    fn test_builtin_source_read_missing() {
        let source = BuiltinSource::new(44100).unwrap();
        assert!(matches!(
            source.read("nope.wav"),
            Err(LoadError::Read { .. })
        ));
    }

    #[test]
    fn test_dir_source_skips_non_wav() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.wav"), b"x").unwrap();
        std::fs::write(dir.path().join("B.WAV"), b"x").unwrap();
        std::fs::write(dir.path().join("README.md"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested.wav")).unwrap();

        let source = DirSource::new(dir.path());
        assert_eq!(source.list().unwrap(), vec!["B.WAV", "a.wav"]);
        assert_eq!(source.read("a.wav").unwrap(), b"x");
    }

    #[test]
    fn test_dir_source_missing_dir() {
        let source = DirSource::new("/nonexistent/keyclack/sounds");
        assert!(matches!(source.list(), Err(LoadError::Source { .. })));
    }

    #[test]
    fn test_open_pack_selects_source() {
        assert_eq!(open_pack("builtin", 44100).unwrap().describe(), "builtin");
        assert_eq!(open_pack("/tmp/pack", 44100).unwrap().describe(), "/tmp/pack");
    }
}
