// SYNOID Bench Pipeline - Capture → Extract → Combine → Report
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Single forward pass with two branch points: file import vs. live capture,
// and (import only) source audio vs. a fresh microphone recording.

use crate::config::{InputMode, RunConfig};
use crate::file_utils::unique_filename;
use crate::interrupt::InterruptHandle;
use crate::media::audio_io::{extract_audio, save_wav, AudioBuffer, AudioIO};
use crate::media::frame_sampler::{extract_frames, extract_frames_with_info, FrameSequence};
use crate::media::muxer::{combine_audio_video, EncodeResult};
use crate::media::probe::probe_media;
use crate::media::webcam::record_webcam_video;
use crate::report::RunStats;
use anyhow::{Context, Result};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Name of the WAV written when the imported file carries its own audio.
pub const EXTRACTED_AUDIO_FILE: &str = "extracted_audio.wav";

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Acquire, // Import file or record webcam
    Sample,  // Frame extraction at target rate
    Audio,   // Extract or record audio
    Encode,  // Two-pass encode + mux
    Report,  // Statistics
}

impl PipelineStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Acquire => "acquire",
            Self::Sample => "sample",
            Self::Audio => "audio",
            Self::Encode => "encode",
            Self::Report => "report",
        }
    }
}

/// Where the audio for the final mux came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSource {
    /// Extracted from the imported video.
    Extracted,
    /// Recorded from the microphone.
    Recorded,
}

/// Everything produced before encoding.
struct Acquired {
    video_path: PathBuf,
    frames: FrameSequence,
    fps: f64,
    audio_path: PathBuf,
    audio_sample_rate: u32,
    audio_source: AudioSource,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub video_path: PathBuf,
    pub audio_path: PathBuf,
    pub audio_source: AudioSource,
    pub frames_kept: usize,
    pub encode: EncodeResult,
    pub stats: RunStats,
}

type ProgressFn = Arc<dyn Fn(PipelineStage, &str) + Send + Sync>;

/// Future produced by a microphone recorder.
pub type RecordFuture = Pin<Box<dyn Future<Output = Result<AudioBuffer>>>>;

/// Records `(sample_rate, duration_secs)` of microphone audio.
pub type RecorderFn = Arc<dyn Fn(u32, u32) -> RecordFuture + Send + Sync>;

pub struct Pipeline {
    config: RunConfig,
    progress_callback: Option<ProgressFn>,
    recorder: Option<RecorderFn>,
    interrupts: InterruptHandle,
}

impl Pipeline {
    /// Validate the config and build a pipeline.
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            progress_callback: None,
            recorder: None,
            interrupts: InterruptHandle::new(),
        })
    }

    pub fn with_progress(mut self, callback: ProgressFn) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Replace the default input device recorder.
    pub fn with_recorder(mut self, recorder: RecorderFn) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Route Ctrl-C through `interrupts` so it can stop webcam capture.
    pub fn with_interrupts(mut self, interrupts: InterruptHandle) -> Self {
        self.interrupts = interrupts;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn report_progress(&self, stage: PipelineStage, msg: &str) {
        info!("[PIPELINE] [{}] {}", stage.label(), msg);
        if let Some(cb) = &self.progress_callback {
            cb(stage, msg);
        }
    }

    /// Run the whole benchmark for `mode`.
    pub async fn run(&self, mode: InputMode) -> Result<RunOutcome> {
        let start = Instant::now();
        std::fs::create_dir_all(&self.config.work_dir)
            .with_context(|| format!("Creating work dir {:?}", self.config.work_dir))?;

        let acquired = match mode {
            InputMode::Import(path) => self.import(path).await?,
            InputMode::Record => self.record().await?,
        };

        self.report_progress(
            PipelineStage::Encode,
            &format!(
                "Encoding {} frames at {} fps into {:?}",
                acquired.frames.len(),
                acquired.fps,
                self.config.output
            ),
        );
        let encode = combine_audio_video(
            &acquired.frames,
            &acquired.audio_path,
            acquired.fps,
            &self.config.output,
            &self.config.video_bitrate,
        )
        .await?;

        self.report_progress(PipelineStage::Report, "Collecting statistics");
        let stats = RunStats::collect(
            &[acquired.video_path.clone(), acquired.audio_path.clone()],
            &self.config.output,
            encode.encode_secs,
            acquired.audio_sample_rate,
            self.config.fps,
            self.config.resolution(),
            start.elapsed().as_secs_f64(),
        );

        Ok(RunOutcome {
            video_path: acquired.video_path,
            audio_path: acquired.audio_path,
            audio_source: acquired.audio_source,
            frames_kept: acquired.frames.len(),
            encode,
            stats,
        })
    }

    async fn import(&self, video_path: PathBuf) -> Result<Acquired> {
        let cfg = &self.config;
        self.report_progress(PipelineStage::Acquire, &format!("Importing {:?}", video_path));
        let info = probe_media(&video_path).await?;

        self.report_progress(PipelineStage::Sample, "Extracting frames");
        let (frames, fps) =
            extract_frames_with_info(&video_path, &info, cfg.fps, cfg.width, cfg.height).await?;

        let (audio_path, audio_sample_rate, audio_source) = if info.has_audio() {
            self.report_progress(PipelineStage::Audio, "Extracting source audio");
            let audio_path = cfg.work_dir.join(EXTRACTED_AUDIO_FILE);
            let wav = extract_audio(&video_path, &audio_path).await?;
            (audio_path, wav.sample_rate, AudioSource::Extracted)
        } else {
            self.report_progress(
                PipelineStage::Audio,
                "Source has no audio track; recording from microphone",
            );
            let (path, rate) = self.record_audio().await?;
            (path, rate, AudioSource::Recorded)
        };

        Ok(Acquired {
            video_path,
            frames,
            fps,
            audio_path,
            audio_sample_rate,
            audio_source,
        })
    }

    async fn record(&self) -> Result<Acquired> {
        let cfg = &self.config;
        let video_path = unique_filename(&cfg.work_dir, "test", "mp4");

        self.report_progress(PipelineStage::Acquire, &format!("Recording webcam to {:?}", video_path));
        let recording = record_webcam_video(
            &video_path,
            cfg.duration_secs,
            cfg.fps,
            cfg.width,
            cfg.height,
            cfg.camera.as_deref(),
            &self.interrupts,
        )
        .await?;

        self.report_progress(PipelineStage::Sample, "Extracting frames");
        let (frames, fps) = extract_frames(&recording.path, cfg.fps, cfg.width, cfg.height).await?;

        self.report_progress(PipelineStage::Audio, "Recording from microphone");
        let (audio_path, audio_sample_rate) = self.record_audio().await?;

        Ok(Acquired {
            video_path: recording.path,
            frames,
            fps,
            audio_path,
            audio_sample_rate,
            audio_source: AudioSource::Recorded,
        })
    }

    async fn record_audio(&self) -> Result<(PathBuf, u32)> {
        let cfg = &self.config;
        let path = unique_filename(&cfg.work_dir, "audio", "wav");
        let recorded = match &self.recorder {
            Some(record) => record(cfg.sample_rate, cfg.duration_secs).await?,
            None => AudioIO::new(cfg.sample_rate).record(cfg.duration_secs).await?,
        };
        let buffer =
            AudioBuffer::fixed_length(recorded.into_samples(), cfg.sample_rate, cfg.duration_secs);
        save_wav(&buffer, &path).await?;
        Ok((path, buffer.sample_rate()))
    }
}
