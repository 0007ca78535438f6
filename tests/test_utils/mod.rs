#![allow(dead_code)]

use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Unique path in the system temp directory
pub fn temp_path(extension: &str) -> PathBuf {
    std::env::temp_dir().join(format!("enftrack_test_{}.{}", Uuid::new_v4(), extension))
}

/// Removes the file when dropped
pub struct TempFile(pub PathBuf);

impl TempFile {
    pub fn new(extension: &str) -> Self {
        Self(temp_path(extension))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Pure tone at a fixed frequency
pub fn generate_tone(frequency: f64, sample_rate: f64, duration_secs: f64, amplitude: f64) -> Vec<f32> {
    let n = (sample_rate * duration_secs) as usize;
    (0..n)
        .map(|i| (amplitude * (2.0 * PI * frequency * i as f64 / sample_rate).sin()) as f32)
        .collect()
}

/// Mains hum whose frequency drifts sinusoidally around `nominal`.
///
/// Phase is `2π·nominal·t + depth·(1 - cos(2π·rate·t))`, so the instantaneous
/// frequency is `nominal + depth·rate·sin(2π·rate·t)`.
pub fn generate_modulated_hum(
    nominal: f64,
    depth: f64,
    rate: f64,
    sample_rate: f64,
    duration_secs: f64,
) -> Vec<f32> {
    let n = (sample_rate * duration_secs) as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let phase = 2.0 * PI * nominal * t + depth * (1.0 - (2.0 * PI * rate * t).cos());
            (0.5 * phase.sin()) as f32
        })
        .collect()
}

pub fn generate_silence(sample_rate: f64, duration_secs: f64) -> Vec<f32> {
    vec![0.0; (sample_rate * duration_secs) as usize]
}

/// Deterministic white noise in [-amplitude, amplitude] (xorshift64)
pub fn generate_noise(len: usize, amplitude: f32, seed: u64) -> Vec<f32> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            ((unit * 2.0 - 1.0) as f32) * amplitude
        })
        .collect()
}

/// Sample-wise sum of two equally long signals
pub fn mix(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

/// Write interleaved samples as 16-bit PCM
pub fn write_wav_i16(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Write interleaved samples as 32-bit float
pub fn write_wav_f32(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for &s in samples {
        writer.write_sample(s).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

/// One brightness value per line
pub fn write_brightness(path: &Path, luma: &[f32]) {
    let text: String = luma.iter().map(|v| format!("{}\n", v)).collect();
    std::fs::write(path, text).expect("write brightness series");
}
