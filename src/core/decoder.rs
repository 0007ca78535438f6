// src/core/decoder.rs
//
// Input decoding. WAV goes through hound; every other container is handed to
// Symphonia. Video flicker arrives as a pre-reduced brightness series (one mean
// luma value per frame, one frame per line).

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::signal::SourceSignal;
use crate::error::DecodeError;

/// Container for decoded audio data and metadata
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of audio channels
    pub channels: usize,
    /// Duration in seconds
    pub duration_secs: f64,
    /// Codec name as reported by the decoder
    pub codec_name: String,
}

impl AudioData {
    /// Down-mix to a mono audio source. Mono buffers are moved, not copied.
    pub fn into_source(self) -> SourceSignal {
        let sample_rate = self.sample_rate as f64;
        let samples = if self.channels <= 1 {
            self.samples
        } else {
            extract_mono(&self)
        };
        SourceSignal::Audio { samples, sample_rate }
    }
}

/// How an input file should be interpreted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputKind {
    /// Audio container (WAV, FLAC, MP3, ...)
    Audio,
    /// Text file of per-frame brightness values at the given frame rate
    Brightness { frame_rate: f64 },
}

/// Load any supported input as a source signal
pub fn load_source(path: &Path, kind: InputKind) -> Result<SourceSignal> {
    match kind {
        InputKind::Audio => {
            let audio = decode_audio(path)
                .with_context(|| format!("Failed to decode audio: {}", path.display()))?;
            log::debug!(
                "Decoded {}: {} Hz, {} channel(s), {:.1} s, codec {}",
                path.display(),
                audio.sample_rate,
                audio.channels,
                audio.duration_secs,
                audio.codec_name
            );
            Ok(audio.into_source())
        }
        InputKind::Brightness { frame_rate } => load_brightness_series(path, frame_rate)
            .with_context(|| format!("Failed to read brightness series: {}", path.display())),
    }
}

/// Decode an audio file, choosing hound for WAV and Symphonia otherwise
pub fn decode_audio(path: &Path) -> Result<AudioData, DecodeError> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav") || e.eq_ignore_ascii_case("wave"));

    if is_wav {
        decode_wav(path)
    } else {
        decode_with_symphonia(path)
    }
}

/// Decode a WAV file with hound
pub fn decode_wav(path: &Path) -> Result<AudioData, DecodeError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(DecodeError::Unsupported("WAV reports 0 channels".into()));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    if samples.is_empty() {
        return Err(DecodeError::NoSamples);
    }

    let duration_secs = samples.len() as f64 / (spec.sample_rate as f64 * channels as f64);
    Ok(AudioData {
        samples,
        sample_rate: spec.sample_rate,
        channels,
        duration_secs,
        codec_name: format!("PCM {}-bit {:?}", spec.bits_per_sample, spec.sample_format),
    })
}

/// Decode any Symphonia-supported container to floating-point samples
pub fn decode_with_symphonia(path: &Path) -> Result<AudioData, DecodeError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::Unsupported("no supported audio track".into()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::Unsupported("file does not specify a sample rate".into()))?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    if channels == 0 {
        return Err(DecodeError::Unsupported("file reports 0 audio channels".into()));
    }
    let codec_name = format!("{:?}", track.codec_params.codec);

    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match probed.format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(symphonia::core::errors::Error::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::new(decoded.capacity() as u64, *decoded.spec())
        });
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    if samples.is_empty() {
        return Err(DecodeError::NoSamples);
    }

    let duration_secs = samples.len() as f64 / (sample_rate as f64 * channels as f64);
    Ok(AudioData {
        samples,
        sample_rate,
        channels,
        duration_secs,
        codec_name,
    })
}

/// Extract mono samples from potentially multi-channel audio
pub fn extract_mono(audio: &AudioData) -> Vec<f32> {
    if audio.channels <= 1 {
        return audio.samples.clone();
    }

    audio
        .samples
        .chunks_exact(audio.channels)
        .map(|frame| frame.iter().sum::<f32>() / audio.channels as f32)
        .collect()
}

/// Read a brightness series: one value per line, blank lines and `#` comments
/// ignored. With several comma/whitespace separated columns (e.g. `frame,luma`)
/// the last column is the value.
pub fn load_brightness_series(path: &Path, frame_rate: f64) -> Result<SourceSignal, DecodeError> {
    let reader = BufReader::new(File::open(path)?);
    parse_brightness(reader, frame_rate)
}

pub fn parse_brightness<R: BufRead>(reader: R, frame_rate: f64) -> Result<SourceSignal, DecodeError> {
    if !frame_rate.is_finite() || frame_rate <= 0.0 {
        return Err(DecodeError::Unsupported(format!("invalid frame rate {}", frame_rate)));
    }

    let mut luma = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let field = trimmed
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .last()
            .unwrap_or(trimmed);

        let value: f32 = field.parse().map_err(|_| DecodeError::Brightness {
            line: index + 1,
            reason: format!("'{}' is not a number", field),
        })?;
        if !value.is_finite() {
            return Err(DecodeError::Brightness {
                line: index + 1,
                reason: "value is not finite".into(),
            });
        }
        luma.push(value);
    }

    if luma.is_empty() {
        return Err(DecodeError::NoSamples);
    }

    Ok(SourceSignal::VideoBrightness { luma, frame_rate })
}
