// SYNOID Bench Frame Sampler
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Nearest-ratio downsampling: keep every Nth decoded frame where
// N = max(1, round(source_fps / target_fps)). Timing is never interpolated,
// so the effective output rate is approximate when the ratio isn't integral.
// A source slower than the target passes through unchanged (no upsampling).

use crate::file_utils::{ffmpeg_bin, safe_arg_path};
use crate::media::probe::{probe_media, MediaInfo};
use anyhow::{bail, Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{info, warn};

/// Bytes per packed pixel (BGR / RGB).
const CHANNELS: usize = 3;

/// Number of decoded frames to advance between two retained frames.
///
/// An unknown or unusable source rate is treated as equal to the target,
/// which yields 1. Exact halves round to the even neighbour.
pub fn sampling_interval(source_fps: Option<f64>, target_fps: f64) -> usize {
    let source = source_fps
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(target_fps);
    let ratio = (source / target_fps).round_ties_even();
    if ratio.is_finite() && ratio >= 1.0 {
        ratio as usize
    } else {
        1
    }
}

/// Frames kept out of `total_frames` at the given interval.
pub fn retained_count(total_frames: usize, interval: usize) -> usize {
    total_frames.div_ceil(interval.max(1))
}

/// Stateful keep/drop decision over a stream of decoded frames.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval: usize,
    decoded: usize,
    kept: usize,
}

impl FrameSampler {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            decoded: 0,
            kept: 0,
        }
    }

    pub fn from_rates(source_fps: Option<f64>, target_fps: f64) -> Self {
        Self::new(sampling_interval(source_fps, target_fps))
    }

    /// Register the next decoded frame; true if it should be kept.
    pub fn keep_next(&mut self) -> bool {
        let keep = self.decoded % self.interval == 0;
        self.decoded += 1;
        if keep {
            self.kept += 1;
        }
        keep
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn decoded(&self) -> usize {
        self.decoded
    }

    pub fn kept(&self) -> usize {
        self.kept
    }
}

/// Ordered frames of uniform size, built at a fixed frame rate.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    width: u32,
    height: u32,
    fps: f64,
    frames: Vec<RgbImage>,
}

impl FrameSequence {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            fps,
            frames: Vec::new(),
        }
    }

    /// Append a frame. Frames must match the sequence dimensions.
    pub fn push(&mut self, frame: RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            bail!(
                "Frame is {}x{}, sequence is {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            );
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Clip length when played back at `fps`.
    pub fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }

    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }
}

/// Swap packed BGR pixels to RGB in place.
pub fn bgr_to_rgb(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(CHANNELS) {
        px.swap(0, 2);
    }
}

/// Turn one raw BGR frame of `src_w`x`src_h` into an RGB image of `dst_w`x`dst_h`.
pub fn convert_frame(
    mut bgr: Vec<u8>,
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
) -> Result<RgbImage> {
    bgr_to_rgb(&mut bgr);
    let img = RgbImage::from_raw(src_w, src_h, bgr)
        .with_context(|| format!("Raw frame does not fit {}x{}", src_w, src_h))?;
    if (src_w, src_h) == (dst_w, dst_h) {
        return Ok(img);
    }
    Ok(imageops::resize(&img, dst_w, dst_h, FilterType::Triangle))
}

/// Decode `video_path`, keep every Nth frame for `target_fps`, and resize
/// kept frames to `width`x`height` RGB.
///
/// Returns the sequence together with the rate the clip is built at, which
/// is always the target rate.
pub async fn extract_frames(
    video_path: &Path,
    target_fps: f64,
    width: u32,
    height: u32,
) -> Result<(FrameSequence, f64)> {
    let info = probe_media(video_path).await?;
    extract_frames_with_info(video_path, &info, target_fps, width, height).await
}

/// Same as `extract_frames` for a source that has already been probed.
pub async fn extract_frames_with_info(
    video_path: &Path,
    info: &MediaInfo,
    target_fps: f64,
    width: u32,
    height: u32,
) -> Result<(FrameSequence, f64)> {
    if info.fps.is_none() {
        warn!(
            "[SAMPLER] Source frame rate unavailable; assuming target {} fps",
            target_fps
        );
    }

    let mut sampler = FrameSampler::from_rates(info.fps, target_fps);
    info!(
        "[SAMPLER] Extracting from {:?}: source {:?} fps -> target {} fps (interval {})",
        video_path,
        info.fps,
        target_fps,
        sampler.interval()
    );

    let frame_size = info.width as usize * info.height as usize * CHANNELS;

    // -vsync 0 hands over every decoded frame without duplication or drops.
    // -noautorotate keeps the output size equal to the probed stream size.
    let mut child = Command::new(ffmpeg_bin())
        .args(["-v", "error", "-nostdin", "-noautorotate", "-i"])
        .arg(safe_arg_path(video_path))
        .args([
            "-map", "0:v:0",
            "-vsync", "0",
            "-f", "rawvideo",
            "-pix_fmt", "bgr24",
            "-",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .context("Spawning FFmpeg decoder")?;

    let mut stdout = child
        .stdout
        .take()
        .context("FFmpeg decoder has no stdout")?;

    let mut sequence = FrameSequence::new(width, height, target_fps);
    let mut buf = vec![0u8; frame_size];

    loop {
        match stdout.read_exact(&mut buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e).context("Reading decoded frames"),
        }
        if sampler.keep_next() {
            let frame = convert_frame(buf.clone(), info.width, info.height, width, height)?;
            sequence.push(frame)?;
        }
    }

    let status = child.wait().await.context("Waiting for FFmpeg decoder")?;
    if !status.success() {
        if sequence.is_empty() {
            bail!("FFmpeg failed to decode {:?}", video_path);
        }
        warn!(
            "[SAMPLER] Decoder exited with {} after {} frames; keeping what was decoded",
            status,
            sampler.decoded()
        );
    }

    info!(
        "[SAMPLER] ✅ Decoded {} frames, kept {} at {}x{}",
        sampler.decoded(),
        sampler.kept(),
        width,
        height
    );
    Ok((sequence, target_fps))
}
