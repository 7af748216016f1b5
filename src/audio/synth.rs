//! Built-in key click synthesis
//!
//! Generates a short WAV per sound name so the default sound pack needs no
//! binary assets. Each click is a decaying noise burst over a damped
//! resonant "body" tone. The body pitch is derived from the sound name, so
//! every key group has a stable, slightly different timbre.

use crate::keymap::RELEASE_SOUND;
use std::io::Cursor;

/// Shape of a synthesized click
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClickShape {
    /// Total length in milliseconds
    duration_ms: u32,
    /// Resonant body frequency in Hz
    body_hz: f32,
    /// Exponential decay rate (higher = shorter tail)
    decay: f32,
    /// Noise share of the mix (0.0 to 1.0)
    noise: f32,
    /// Peak amplitude (0.0 to 1.0)
    gain: f32,
}

/// Pick the click shape for a sound name
fn shape_for(name: &str) -> ClickShape {
    let seed = name_seed(name);
    // Spread letter groups over 1.6 kHz..3.2 kHz
    let spread = (seed % 1600) as f32;

    match name {
        RELEASE_SOUND => ClickShape {
            duration_ms: 25,
            body_hz: 3600.0,
            decay: 9.0,
            noise: 0.7,
            gain: 0.35,
        },
        "space" => ClickShape {
            duration_ms: 70,
            body_hz: 420.0,
            decay: 5.0,
            noise: 0.35,
            gain: 0.6,
        },
        "enter" | "backspace" | "caps lock" => ClickShape {
            duration_ms: 55,
            body_hz: 700.0 + spread / 4.0,
            decay: 6.0,
            noise: 0.45,
            gain: 0.55,
        },
        _ => ClickShape {
            duration_ms: 40,
            body_hz: 1600.0 + spread,
            decay: 7.0,
            noise: 0.55,
            gain: 0.5,
        },
    }
}

/// FNV-1a hash of the name, used for pitch and noise seeding
fn name_seed(name: &str) -> u32 {
    name.bytes().fold(0x811c_9dc5u32, |hash, byte| {
        (hash ^ byte as u32).wrapping_mul(0x0100_0193)
    })
}

/// Render a click to mono i16 samples
fn render_click(shape: ClickShape, seed: u32, sample_rate: u32) -> Vec<i16> {
    let num_samples = (sample_rate * shape.duration_ms / 1000).max(1) as usize;
    let mut state = seed | 1;
    let mut samples = Vec::with_capacity(num_samples);

    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let progress = i as f32 / num_samples as f32;
        let envelope = (-shape.decay * progress).exp();

        // xorshift32 white noise in -1.0..1.0
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let noise = (state as f32 / u32::MAX as f32) * 2.0 - 1.0;

        let body = (2.0 * std::f32::consts::PI * shape.body_hz * t).sin();
        let mixed = noise * shape.noise + body * (1.0 - shape.noise);

        // Short linear fade-out so the tail never ends on a step
        let fade = ((num_samples - 1 - i) as f32 / 32.0).min(1.0);

        samples.push((mixed * envelope * fade * shape.gain * i16::MAX as f32) as i16);
    }

    samples
}

/// Encode mono i16 samples as a 16-bit PCM WAV file
fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Generate the WAV bytes for a named key click
pub fn generate_click_wav(name: &str, sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let samples = render_click(shape_for(name), name_seed(name), sample_rate);
    encode_wav(&samples, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_click_wav_header() {
        let wav = generate_click_wav("a", 44100).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
    }

    #[test]
    fn test_click_length_follows_shape() {
        let wav = generate_click_wav("space", 44100).unwrap();
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        // 70ms at 44.1kHz
        assert_eq!(reader.len(), 3087);
        assert_eq!(reader.spec().channels, 1);
    }

    #[test]
    fn test_clicks_are_deterministic_and_distinct() {
        assert_eq!(
            generate_click_wav("q", 44100).unwrap(),
            generate_click_wav("q", 44100).unwrap()
        );
        assert_ne!(shape_for("q").body_hz, shape_for("w").body_hz);
    }

    #[test]
    fn test_click_decays() {
        let samples = render_click(shape_for("a"), name_seed("a"), 44100);
        let quarter = samples.len() / 4;
        let peak = |s: &[i16]| s.iter().map(|v| v.unsigned_abs()).max().unwrap_or(0);
        assert!(peak(&samples[..quarter]) > peak(&samples[3 * quarter..]));
        assert_eq!(*samples.last().unwrap(), 0);
    }
}
