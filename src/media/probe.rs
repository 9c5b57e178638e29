// SYNOID Bench Probe Tools
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Stream metadata via ffprobe: frame rate, frame size, duration and
// whether an audio track is present.

use crate::file_utils::{ffprobe_bin, safe_arg_path};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// Header reads are near-instant; anything longer means a stuck ffprobe.
const PROBE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    sample_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// What the pipeline needs to know about a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    /// Reported frame rate of the first video stream, if any was reported.
    pub fps: Option<f64>,
    /// Container duration in seconds.
    pub duration: Option<f64>,
    /// Sample rate of the first audio stream; `None` when there is no audio.
    pub audio_sample_rate: Option<u32>,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.audio_sample_rate.is_some()
    }
}

/// Parse an ffprobe rate such as "30000/1001" or "25".
/// Returns `None` for "0/0" and other unusable values.
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    let s = s.trim();
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

fn parse_probe_json(json: &str) -> Result<MediaInfo> {
    let parsed: ProbeOutput = serde_json::from_str(json).context("Parsing ffprobe JSON")?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let Some(video) = video else {
        bail!("No video stream found");
    };

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => bail!("Video stream has no frame size"),
    };

    let fps = video
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video.avg_frame_rate.as_deref().and_then(parse_frame_rate));

    let audio_sample_rate = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|a| {
            a.sample_rate
                .as_deref()
                .and_then(|r| r.trim().parse().ok())
                .unwrap_or(0)
        });

    let duration = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0);

    Ok(MediaInfo {
        width,
        height,
        fps,
        duration,
        audio_sample_rate,
    })
}

async fn run_ffprobe(path: &Path, args: &[&str]) -> Result<String> {
    let safe_path = safe_arg_path(path);
    let output = tokio::time::timeout(
        tokio::time::Duration::from_secs(PROBE_TIMEOUT_SECS),
        Command::new(ffprobe_bin())
            .kill_on_drop(true)
            .args(["-v", "error"])
            .args(args)
            .arg(&safe_path)
            .output(),
    )
    .await
    .context("ffprobe timed out")?
    .context("Running ffprobe")?;

    if !output.status.success() {
        bail!(
            "ffprobe failed on {:?}: {}",
            path,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Probe a media file for its first video stream and optional audio stream.
pub async fn probe_media(path: &Path) -> Result<MediaInfo> {
    let json = run_ffprobe(
        path,
        &[
            "-show_entries",
            "stream=codec_type,width,height,r_frame_rate,avg_frame_rate,sample_rate:format=duration",
            "-of",
            "json",
        ],
    )
    .await?;

    let info = parse_probe_json(&json).with_context(|| format!("Probing {:?}", path))?;
    info!(
        "[PROBE] {:?}: {}x{} @ {:?} fps, audio: {}",
        path,
        info.width,
        info.height,
        info.fps,
        if info.has_audio() { "yes" } else { "no" }
    );
    Ok(info)
}

/// Count decoded video packets. Used to report frames captured from the webcam.
pub async fn count_video_frames(path: &Path) -> Result<u64> {
    let out = run_ffprobe(
        path,
        &[
            "-select_streams",
            "v:0",
            "-count_packets",
            "-show_entries",
            "stream=nb_read_packets",
            "-of",
            "csv=p=0",
        ],
    )
    .await?;
    debug!("[PROBE] nb_read_packets raw: {:?}", out);
    out.trim()
        .trim_end_matches(',')
        .parse()
        .with_context(|| format!("Parsing frame count {:?}", out.trim()))
}
