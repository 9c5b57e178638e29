// SYNOID Bench Muxer Module
// Two-pass encode: silent H.264 from raw frames, then mux with trimmed audio
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use crate::file_utils::{ffmpeg_bin, file_size_mb, safe_arg_path};
use crate::media::audio_io::wav_duration_secs;
use crate::media::frame_sampler::FrameSequence;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

/// Outcome of `combine_audio_video`.
#[derive(Debug, Clone)]
pub struct EncodeResult {
    pub output_path: PathBuf,
    pub video_duration: f64,
    pub audio_duration: f64,
    /// Length both streams were trimmed to.
    pub duration: f64,
    /// Wall-clock time spent in both encode passes.
    pub encode_secs: f64,
    pub size_mb: f64,
}

/// The muxed output is as long as the shorter of the two streams.
pub fn output_duration(video_secs: f64, audio_secs: f64) -> f64 {
    video_secs.min(audio_secs)
}

/// Silent intermediate written next to the final output.
pub fn temp_video_path(out_path: &Path) -> PathBuf {
    let stem = out_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    out_path.with_file_name(format!("{}_temp_video.mp4", stem))
}

fn silent_encode_args(width: u32, height: u32, fps: f64, bitrate: &str, temp: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-s".into(),
        format!("{}x{}", width, height),
        "-r".into(),
        fps.to_string(),
        "-i".into(),
        "-".into(),
        "-an".into(),
        "-c:v".into(),
        "libx264".into(),
        "-b:v".into(),
        bitrate.to_string(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        safe_arg_path(temp).to_string_lossy().into_owned(),
    ]
}

fn mux_args(temp: &Path, audio: &Path, duration: f64, bitrate: &str, out: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-nostdin".into(),
        "-i".into(),
        safe_arg_path(temp).to_string_lossy().into_owned(),
        "-i".into(),
        safe_arg_path(audio).to_string_lossy().into_owned(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
        "-t".into(),
        format!("{:.6}", duration),
        "-c:v".into(),
        "libx264".into(),
        "-b:v".into(),
        bitrate.to_string(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-c:a".into(),
        "aac".into(),
        safe_arg_path(out).to_string_lossy().into_owned(),
    ]
}

/// Pass 1: pipe the frames as raw RGB into FFmpeg and encode without audio.
pub async fn encode_silent_video(
    frames: &FrameSequence,
    fps: f64,
    bitrate: &str,
    temp_path: &Path,
) -> Result<()> {
    let mut child = Command::new(ffmpeg_bin())
        .args(silent_encode_args(
            frames.width(),
            frames.height(),
            fps,
            bitrate,
            temp_path,
        ))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .context("Spawning FFmpeg encoder")?;

    let mut stdin = child.stdin.take().context("FFmpeg encoder has no stdin")?;
    for frame in frames.frames() {
        stdin
            .write_all(frame.as_raw())
            .await
            .context("Piping frames to FFmpeg encoder")?;
    }
    stdin.flush().await?;
    // Closing stdin signals end of stream
    drop(stdin);

    let status = child.wait().await.context("Waiting for FFmpeg encoder")?;
    if !status.success() {
        bail!("FFmpeg silent video encode failed ({})", status);
    }
    Ok(())
}

/// Pass 2: re-encode the silent video together with the audio, both trimmed
/// to `duration` seconds.
pub async fn mux_with_audio(
    temp_path: &Path,
    audio_path: &Path,
    duration: f64,
    bitrate: &str,
    out_path: &Path,
) -> Result<()> {
    let status = Command::new(ffmpeg_bin())
        .args(mux_args(temp_path, audio_path, duration, bitrate, out_path))
        .status()
        .await
        .context("Running FFmpeg mux")?;

    if !status.success() {
        bail!("FFmpeg audio/video mux failed ({})", status);
    }
    Ok(())
}

/// Encode `frames` at `fps`, attach the audio at `audio_path`, trim both to
/// the shorter stream and write `out_path`.
pub async fn combine_audio_video(
    frames: &FrameSequence,
    audio_path: &Path,
    fps: f64,
    out_path: &Path,
    bitrate: &str,
) -> Result<EncodeResult> {
    if frames.is_empty() {
        bail!("No frames to encode");
    }
    if !fps.is_finite() || fps <= 0.0 {
        bail!("Invalid output frame rate {}", fps);
    }

    info!("[MUXER] Encoding video and combining with audio...");
    let start = Instant::now();

    let temp_path = temp_video_path(out_path);
    let video_duration = frames.len() as f64 / fps;

    let passes = async {
        encode_silent_video(frames, fps, bitrate, &temp_path).await?;

        let audio_duration = wav_duration_secs(audio_path)?;
        let duration = output_duration(video_duration, audio_duration);
        info!(
            "[MUXER] Video {:.3}s, audio {:.3}s -> trimming to {:.3}s",
            video_duration, audio_duration, duration
        );

        mux_with_audio(&temp_path, audio_path, duration, bitrate, out_path).await?;
        Ok::<_, anyhow::Error>((audio_duration, duration))
    }
    .await;

    // The intermediate goes away whether or not the passes succeeded
    if temp_path.exists() {
        if let Err(e) = std::fs::remove_file(&temp_path) {
            warn!("[MUXER] Could not remove {:?}: {}", temp_path, e);
        }
    }
    let (audio_duration, duration) = passes?;

    let encode_secs = start.elapsed().as_secs_f64();
    let size_mb = file_size_mb(out_path).unwrap_or(0.0);
    info!(
        "[MUXER] ✅ Output saved as {:?} in {:.2} seconds.",
        out_path, encode_secs
    );

    Ok(EncodeResult {
        output_path: out_path.to_path_buf(),
        video_duration,
        audio_duration,
        duration,
        encode_secs,
        size_mb,
    })
}
