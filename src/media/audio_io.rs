// SYNOID Bench Audio I/O Module
// Microphone Recording & Audio Extraction
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::file_utils::{ffmpeg_bin, safe_arg_path};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Extra wait past the nominal duration before a silent device is given up on.
const STALL_GRACE: Duration = Duration::from_secs(5);

/// Mono 16-bit PCM samples at a fixed sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    samples: Vec<i16>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, samples: Vec<i16>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Number of samples a `duration_secs` buffer holds at `sample_rate`.
    pub fn expected_len(duration_secs: u32, sample_rate: u32) -> usize {
        duration_secs as usize * sample_rate as usize
    }

    /// Truncate or zero-pad `samples` to exactly `duration_secs * sample_rate`.
    pub fn fixed_length(mut samples: Vec<i16>, sample_rate: u32, duration_secs: u32) -> Self {
        samples.resize(Self::expected_len(duration_secs, sample_rate), 0);
        Self::new(sample_rate, samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Write as a mono 16-bit PCM WAV.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("Creating WAV {:?}", path))?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize().context("Finalizing WAV")?;
        Ok(())
    }

    /// Read a 16-bit PCM WAV. Multi-channel files are downmixed to mono.
    pub fn read_wav(path: &Path) -> Result<Self> {
        let mut reader =
            hound::WavReader::open(path).with_context(|| format!("Opening WAV {:?}", path))?;
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            bail!(
                "Expected 16-bit PCM WAV, got {}-bit {:?}",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let interleaved = reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Reading WAV samples")?;

        Ok(Self::new(
            spec.sample_rate,
            downmix_to_mono(&interleaved, spec.channels),
        ))
    }
}

/// Format and length of a WAV file, read from its header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames per channel.
    pub frames: u32,
}

impl WavInfo {
    pub fn read(path: &Path) -> Result<Self> {
        let reader =
            hound::WavReader::open(path).with_context(|| format!("Opening WAV {:?}", path))?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            bail!("WAV {:?} reports a zero sample rate", path);
        }
        Ok(Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            frames: reader.duration(),
        })
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Duration of a WAV file from its header, without loading samples.
pub fn wav_duration_secs(path: &Path) -> Result<f64> {
    Ok(WavInfo::read(path)?.duration_secs())
}

/// Average interleaved channels into one.
pub fn downmix_to_mono(interleaved: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

/// Microphone capture at a fixed sample rate.
pub struct AudioIO {
    sample_rate: u32,
}

impl AudioIO {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Record exactly `duration_secs * sample_rate` mono samples from the
    /// default input device. Blocks until the buffer is full.
    pub async fn record(&self, duration_secs: u32) -> Result<AudioBuffer> {
        let target = AudioBuffer::expected_len(duration_secs, self.sample_rate);
        info!(
            "[AUDIO] Recording audio for {}s at {} Hz sample rate...",
            duration_secs, self.sample_rate
        );

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("No input device available")?;
        let default_config = device
            .default_input_config()
            .context("Querying input device config")?;

        let config = cpal::StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let samples: Arc<Mutex<Vec<i16>>> = Arc::new(Mutex::new(Vec::with_capacity(target)));

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => build_input::<f32>(&device, &config, samples.clone(), target),
            cpal::SampleFormat::I16 => build_input::<i16>(&device, &config, samples.clone(), target),
            cpal::SampleFormat::U16 => build_input::<u16>(&device, &config, samples.clone(), target),
            other => bail!("Unsupported input sample format {:?}", other),
        }?;

        stream.play().context("Starting input stream")?;

        let deadline = Instant::now() + Duration::from_secs(duration_secs as u64) + STALL_GRACE;
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let filled = samples
                .lock()
                .map_err(|_| anyhow!("Audio buffer lock poisoned"))?
                .len();
            if filled >= target {
                break;
            }
            if Instant::now() >= deadline {
                warn!(
                    "[AUDIO] Input stalled at {}/{} samples; padding with silence",
                    filled, target
                );
                break;
            }
        }

        drop(stream);

        let captured = std::mem::take(
            &mut *samples
                .lock()
                .map_err(|_| anyhow!("Audio buffer lock poisoned"))?,
        );
        Ok(AudioBuffer::fixed_length(
            captured,
            self.sample_rate,
            duration_secs,
        ))
    }
}

/// Write `buffer` as WAV off the async thread.
pub async fn save_wav(buffer: &AudioBuffer, output_path: &Path) -> Result<()> {
    let path = output_path.to_path_buf();
    let to_write = buffer.clone();
    tokio::task::spawn_blocking(move || to_write.write_wav(&path))
        .await
        .context("WAV writer task")??;

    info!("[AUDIO] Audio saved as {:?}", output_path);
    Ok(())
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sink: Arc<Mutex<Vec<i16>>>,
    target: usize,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if let Ok(mut buf) = sink.lock() {
                for frame in data.chunks(channels) {
                    if buf.len() >= target {
                        break;
                    }
                    let sum: i32 = frame.iter().map(|s| s.to_sample::<i16>() as i32).sum();
                    buf.push((sum / frame.len() as i32) as i16);
                }
            }
        },
        |err| error!("[AUDIO] Stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

/// Write the first audio track of `video_path` to a mono 16-bit WAV at the
/// source's own sample rate. Only the header is read back.
pub async fn extract_audio(video_path: &Path, output_path: &Path) -> Result<WavInfo> {
    info!("[AUDIO] Extracting audio track from {:?}", video_path);

    let status = Command::new(ffmpeg_bin())
        .args(["-y", "-v", "error", "-nostdin", "-i"])
        .arg(safe_arg_path(video_path))
        .args(["-vn", "-map", "0:a:0", "-ac", "1", "-c:a", "pcm_s16le"])
        .arg(safe_arg_path(output_path))
        .status()
        .await
        .context("Running FFmpeg audio extraction")?;

    if !status.success() {
        bail!("FFmpeg audio extraction failed for {:?}", video_path);
    }

    let wav = WavInfo::read(output_path)?;
    info!(
        "[AUDIO] Extracted {:.2}s at {} Hz to {:?}",
        wav.duration_secs(),
        wav.sample_rate,
        output_path
    );
    Ok(wav)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_length_matches_duration_times_rate() {
        let short = AudioBuffer::fixed_length(vec![7; 10], 44_100, 2);
        assert_eq!(short.len(), 88_200);
        assert_eq!(short.samples()[9], 7);
        assert_eq!(short.samples()[10], 0);
        assert_eq!(short.duration_secs(), 2.0);

        let long = AudioBuffer::fixed_length(vec![1; 100_000], 44_100, 2);
        assert_eq!(long.len(), 88_200);
    }

    #[test]
    fn test_downmix_to_mono() {
        assert_eq!(downmix_to_mono(&[100, 300, -50, 50], 2), vec![200, 0]);
        assert_eq!(downmix_to_mono(&[1, 2, 3], 1), vec![1, 2, 3]);
    }

    #[test]
    fn test_wav_info_rejects_missing_file() {
        assert!(WavInfo::read(Path::new("/nonexistent/synoid_bench.wav")).is_err());
    }

    #[tokio::test]
    async fn test_save_wav_writes_exact_length() {
        let path = std::env::temp_dir().join(format!("synoid_bench_save_{}.wav", std::process::id()));
        let buffer = AudioBuffer::fixed_length(vec![3; 5], 16_000, 1);
        save_wav(&buffer, &path).await.unwrap();
        assert_eq!(WavInfo::read(&path).unwrap().frames, 16_000);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_wav_keeps_rate_and_length() {
        let path = std::env::temp_dir().join(format!("synoid_bench_audio_{}.wav", std::process::id()));
        let buffer = AudioBuffer::fixed_length(vec![1000, -1000], 8_000, 3);
        buffer.write_wav(&path).unwrap();

        let loaded = AudioBuffer::read_wav(&path).unwrap();
        assert_eq!(loaded.sample_rate(), 8_000);
        assert_eq!(loaded.len(), 24_000);
        assert_eq!(loaded.duration_secs(), 3.0);
        assert_eq!(&loaded.samples()[..3], &[1000, -1000, 0]);
        assert_eq!(wav_duration_secs(&path).unwrap(), 3.0);
        assert_eq!(
            WavInfo::read(&path).unwrap(),
            WavInfo {
                sample_rate: 8_000,
                channels: 1,
                frames: 24_000,
            }
        );

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_read_wav_downmixes_stereo() {
        let path = std::env::temp_dir().join(format!("synoid_bench_stereo_{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..480 {
            writer.write_sample(200i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        // Header info counts frames, not interleaved samples
        let info = WavInfo::read(&path).unwrap();
        assert_eq!((info.channels, info.frames), (2, 480));
        assert_eq!(info.duration_secs(), 0.01);

        let loaded = AudioBuffer::read_wav(&path).unwrap();
        assert_eq!(loaded.len(), 480);
        assert_eq!(loaded.samples()[0], 100);
        assert_eq!(loaded.duration_secs(), 0.01);

        let _ = std::fs::remove_file(path);
    }
}
