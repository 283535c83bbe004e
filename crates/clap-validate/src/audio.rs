//! Test signals: decoding, resampling, channel adaptation and comparison.

use std::f32::consts::TAU;
use std::fs::File;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AudioError;

/// Planar audio with equal-length channels.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Shorter channels are zero-padded to the longest one.
    pub fn new(sample_rate: u32, mut channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
        for channel in &mut channels {
            channel.resize(frames, 0.0);
        }
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// `(channels, frames)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.channel_count(), self.frames())
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn is_finite(&self) -> bool {
        self.channels
            .iter()
            .all(|channel| channel.iter().all(|sample| sample.is_finite()))
    }

    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|channel| channel.iter())
            .fold(0.0f32, |peak, sample| peak.max(sample.abs()))
    }

    pub fn to_stereo(&self) -> Self {
        match self.channel_count() {
            1 => Self::new(
                self.sample_rate,
                vec![self.channels[0].clone(), self.channels[0].clone()],
            ),
            2 => self.clone(),
            _ => self.remix(2),
        }
    }

    /// Sum of the stereo pair halved.
    pub fn to_mono(&self) -> Self {
        let stereo = self.to_stereo();
        let mono = stereo.channels[0]
            .iter()
            .zip(&stereo.channels[1])
            .map(|(left, right)| (left + right) / 2.0)
            .collect();
        Self::new(self.sample_rate, vec![mono])
    }

    /// Adapts the channel count: average into mono, duplicate out of mono,
    /// otherwise keep the leading channels and zero-fill the rest.
    pub fn remix(&self, target: usize) -> Self {
        let source = self.channel_count();
        let frames = self.frames();
        let channels = if target == source {
            self.channels.clone()
        } else if target == 0 {
            Vec::new()
        } else if source == 0 {
            vec![vec![0.0; frames]; target]
        } else if target == 1 {
            let scale = 1.0 / source as f32;
            let mixed = (0..frames)
                .map(|frame| {
                    self.channels
                        .iter()
                        .map(|channel| channel[frame])
                        .sum::<f32>()
                        * scale
                })
                .collect();
            vec![mixed]
        } else if source == 1 {
            vec![self.channels[0].clone(); target]
        } else {
            (0..target)
                .map(|index| {
                    self.channels
                        .get(index)
                        .cloned()
                        .unwrap_or_else(|| vec![0.0; frames])
                })
                .collect()
        };
        Self {
            sample_rate: self.sample_rate,
            channels,
        }
    }

    pub fn resampled(&self, sample_rate: u32) -> Self {
        if sample_rate == self.sample_rate {
            return self.clone();
        }
        let channels = self
            .channels
            .iter()
            .map(|channel| resample::resample(channel, self.sample_rate, sample_rate))
            .collect();
        Self::new(sample_rate, channels)
    }

    /// Per-channel mean squared error against `reference`. Channels or frames
    /// missing from either side are skipped.
    pub fn mean_squared_error(&self, reference: &AudioBuffer) -> Vec<f64> {
        self.channels
            .iter()
            .zip(&reference.channels)
            .map(|(output, input)| {
                let frames = output.len().min(input.len());
                if frames == 0 {
                    return 0.0;
                }
                let sum: f64 = output
                    .iter()
                    .zip(input)
                    .map(|(a, b)| {
                        let delta = f64::from(*a) - f64::from(*b);
                        delta * delta
                    })
                    .sum();
                sum / frames as f64
            })
            .collect()
    }

    pub fn write_wav<P: AsRef<Path>>(&self, path: P) -> Result<(), AudioError> {
        let mut writer = hound::WavWriter::create(
            path,
            hound::WavSpec {
                channels: self.channels.len().max(1) as u16,
                sample_rate: self.sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            },
        )?;
        for frame in 0..self.frames() {
            for channel in &self.channels {
                writer.write_sample(channel[frame])?;
            }
        }
        writer.finalize()?;
        Ok(())
    }
}

/// Decodes `path` and resamples it to `sample_rate`.
pub fn load_test_signal<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<AudioBuffer, AudioError> {
    let decoded = decode_file(path.as_ref())?;
    if decoded.frames() == 0 {
        return Err(AudioError::Empty);
    }
    Ok(decoded.resampled(sample_rate))
}

fn decode_file(path: &Path) -> Result<AudioBuffer, AudioError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;
    let (codec_params, track_id) = {
        let track = format
            .default_track()
            .ok_or(AudioError::NoSupportedTracks)?;
        (track.codec_params.clone(), track.id)
    };

    let mut decoder =
        symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channel_data: Vec<Vec<f32>> = Vec::new();
    let mut sample_buffer: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(err.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(err)) => {
                tracing::warn!("skipping undecodable packet in {}: {err}", path.display());
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let spec = *decoded.spec();
        let channel_count = spec.channels.count();
        if channel_data.is_empty() {
            channel_data = vec![Vec::new(); channel_count];
        }
        if sample_rate == 0 {
            sample_rate = spec.rate;
        }
        let needs_buffer = sample_buffer
            .as_ref()
            .map(|buffer| buffer.capacity() < decoded.capacity() * channel_count)
            .unwrap_or(true);
        if needs_buffer {
            sample_buffer = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }
        let Some(buffer) = sample_buffer.as_mut() else {
            continue;
        };
        buffer.copy_interleaved_ref(decoded);
        let samples = buffer.samples();
        for (index, channel) in channel_data.iter_mut().enumerate().take(channel_count) {
            channel.extend(samples[index..].iter().step_by(channel_count).copied());
        }
    }

    if channel_data.is_empty() {
        return Err(AudioError::Empty);
    }
    Ok(AudioBuffer::new(sample_rate, channel_data))
}

/// Deterministic stereo fallback signal: two sines under seeded white noise.
pub fn synthesize(sample_rate: u32, seconds: f32, seed: u64) -> AudioBuffer {
    let frames = (sample_rate as f32 * seconds.max(0.0)).round() as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in 0..frames {
        let t = frame as f32 / sample_rate.max(1) as f32;
        left.push(0.4 * (TAU * 220.0 * t).sin() + 0.1 * rng.gen_range(-1.0f32..1.0));
        right.push(0.4 * (TAU * 330.0 * t).sin() + 0.1 * rng.gen_range(-1.0f32..1.0));
    }
    AudioBuffer::new(sample_rate, vec![left, right])
}
