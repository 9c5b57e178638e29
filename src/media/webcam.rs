// SYNOID Bench Webcam Capture
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Records the live camera to an intermediate MP4 through FFmpeg's device
// demuxers (v4l2 / avfoundation / dshow). Capture runs for a fixed
// duration or until the user stops it; FFmpeg finalizes the file either
// way, so frames already written are kept.

use crate::file_utils::{ffmpeg_bin, safe_arg_path};
use crate::interrupt::InterruptHandle;
use crate::media::probe::count_video_frames;
use anyhow::{bail, Context, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// FFmpeg's exit code after it was stopped by a signal.
const FFMPEG_SIGNAL_EXIT: i32 = 255;

/// A finished webcam recording.
#[derive(Debug, Clone)]
pub struct WebcamRecording {
    pub path: PathBuf,
    pub frames: u64,
    /// True when the user stopped capture before the duration elapsed.
    pub interrupted: bool,
}

/// FFmpeg input arguments for the platform camera.
pub fn capture_input_args(
    camera: Option<&str>,
    fps: f64,
    width: u32,
    height: u32,
) -> Result<Vec<String>> {
    let (format, input) = if cfg!(target_os = "linux") {
        ("v4l2", camera.unwrap_or("/dev/video0").to_string())
    } else if cfg!(target_os = "macos") {
        ("avfoundation", format!("{}:none", camera.unwrap_or("0")))
    } else if cfg!(target_os = "windows") {
        let Some(name) = camera else {
            bail!("No DirectShow camera found; pass --camera \"<device name>\"");
        };
        ("dshow", format!("video={}", name))
    } else {
        bail!("Webcam capture is not supported on this platform");
    };

    Ok(vec![
        "-f".to_string(),
        format.to_string(),
        "-framerate".to_string(),
        fps.to_string(),
        "-video_size".to_string(),
        format!("{}x{}", width, height),
        "-i".to_string(),
        input,
    ])
}

/// Video device names from `ffmpeg -list_devices true -f dshow -i dummy`.
///
/// Handles both listing layouts: per-device `(video)` tags and the older
/// "DirectShow video devices" section header.
pub fn parse_dshow_video_devices(listing: &str) -> Vec<String> {
    let mut in_video_section = false;
    let mut devices = Vec::new();

    for line in listing.lines() {
        let trimmed = line.trim_start();
        let body = match trimmed.find(']') {
            Some(end) if trimmed.starts_with('[') => &trimmed[end + 1..],
            _ => trimmed,
        }
        .trim();

        if body.starts_with("DirectShow video devices") {
            in_video_section = true;
            continue;
        }
        if body.starts_with("DirectShow audio devices") {
            in_video_section = false;
            continue;
        }

        let Some(rest) = body.strip_prefix('"') else {
            continue;
        };
        let Some(end) = rest.find('"') else {
            continue;
        };
        let name = &rest[..end];
        let tag = rest[end + 1..].trim();

        let is_video = if tag.starts_with('(') {
            tag.contains("video")
        } else {
            in_video_section
        };
        if is_video && !name.is_empty() {
            devices.push(name.to_string());
        }
    }
    devices
}

/// Ask FFmpeg for the DirectShow video devices.
async fn list_dshow_video_devices() -> Result<Vec<String>> {
    // FFmpeg exits non-zero for the dummy input; the listing is on stderr.
    let output = Command::new(ffmpeg_bin())
        .args(["-hide_banner", "-list_devices", "true", "-f", "dshow", "-i", "dummy"])
        .stdin(Stdio::null())
        .output()
        .await
        .context("Listing DirectShow devices")?;
    Ok(parse_dshow_video_devices(&String::from_utf8_lossy(
        &output.stderr,
    )))
}

/// Camera to open. On Windows with no name given this is the first
/// DirectShow video device.
pub async fn resolve_camera(camera: Option<&str>) -> Result<Option<String>> {
    if camera.is_some() || !cfg!(target_os = "windows") {
        return Ok(camera.map(str::to_string));
    }
    let first = list_dshow_video_devices().await?.into_iter().next();
    if let Some(name) = &first {
        info!("[WEBCAM] Using DirectShow device \"{}\"", name);
    }
    Ok(first)
}

fn is_quit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}

/// Forward console lines from a dedicated thread.
///
/// The thread is never joined. Once the receiver is dropped it exits on the
/// next line, and it never holds up runtime shutdown or process exit.
pub fn spawn_console_reader() -> Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("webcam-console".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.lock().read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line.trim().to_string()).is_err() {
                            break;
                        }
                    }
                }
            }
        })
        .context("Spawning console reader")?;
    Ok(rx)
}

/// Ask FFmpeg to stop by sending its interactive quit key.
async fn request_stop(stdin: &mut Option<ChildStdin>) {
    if let Some(mut pipe) = stdin.take() {
        let _ = pipe.write_all(b"q").await;
        let _ = pipe.flush().await;
    }
}

/// Wait for the capture process, forwarding a console `q` or an interrupt
/// as a stop request. Returns the exit status and whether a stop was
/// requested.
pub async fn supervise_capture(
    child: &mut Child,
    mut console: mpsc::UnboundedReceiver<String>,
    interrupts: &InterruptHandle,
) -> Result<(ExitStatus, bool)> {
    let _capturing = interrupts.begin_capture();
    let mut ffmpeg_stdin = child.stdin.take();
    let mut console_open = true;
    let mut interrupted = false;

    let status = loop {
        tokio::select! {
            status = child.wait() => break status.context("Waiting for FFmpeg webcam capture")?,
            _ = interrupts.capture_stopped() => {
                interrupted = true;
                request_stop(&mut ffmpeg_stdin).await;
            }
            line = console.recv(), if console_open => match line {
                Some(l) if is_quit_command(&l) => {
                    info!("[WEBCAM] Stop requested, finishing capture...");
                    interrupted = true;
                    request_stop(&mut ffmpeg_stdin).await;
                }
                Some(_) => {}
                None => console_open = false,
            },
        }
    };

    // A terminal Ctrl-C also reaches FFmpeg, which may exit before the
    // stop request is routed here.
    if status.code() == Some(FFMPEG_SIGNAL_EXIT) {
        interrupted = true;
    }

    Ok((status, interrupted))
}

/// Record `duration_secs` of webcam video into `out_path` (MPEG-4 Part 2).
///
/// Type `q` + Enter or press Ctrl-C to stop early.
pub async fn record_webcam_video(
    out_path: &Path,
    duration_secs: u32,
    fps: f64,
    width: u32,
    height: u32,
    camera: Option<&str>,
    interrupts: &InterruptHandle,
) -> Result<WebcamRecording> {
    info!(
        "[WEBCAM] Recording webcam video for {}s at {} FPS and {}x{} resolution.",
        duration_secs, fps, width, height
    );

    let camera = resolve_camera(camera).await?;
    let input_args = capture_input_args(camera.as_deref(), fps, width, height)?;
    info!("[WEBCAM] Type 'q' + Enter (or Ctrl-C) to stop early.");

    let mut child = Command::new(ffmpeg_bin())
        .args(["-y", "-v", "error"])
        .args(input_args)
        .args(["-t", &duration_secs.to_string()])
        .args(["-c:v", "mpeg4", "-q:v", "2", "-pix_fmt", "yuv420p"])
        .arg(safe_arg_path(out_path))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .context("Spawning FFmpeg webcam capture")?;

    let console = spawn_console_reader()?;
    let (status, interrupted) = supervise_capture(&mut child, console, interrupts).await?;

    if !status.success() {
        if !(interrupted && out_path.exists()) {
            bail!("FFmpeg webcam capture failed ({})", status);
        }
        warn!("[WEBCAM] Capture exited with {} after interrupt", status);
    }

    let frames = count_video_frames(out_path).await?;
    info!(
        "[WEBCAM] Webcam video saved as {:?}, captured {} frames.",
        out_path, frames
    );

    Ok(WebcamRecording {
        path: out_path.to_path_buf(),
        frames,
        interrupted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_capture_input_args_carry_rate_and_size() {
        let args = match capture_input_args(Some("cam0"), 60.0, 640, 480) {
            Ok(args) => args,
            // Platforms without a supported demuxer
            Err(_) => return,
        };
        let rate_idx = args.iter().position(|a| a == "-framerate").unwrap();
        assert_eq!(args[rate_idx + 1], "60");
        let size_idx = args.iter().position(|a| a == "-video_size").unwrap();
        assert_eq!(args[size_idx + 1], "640x480");
        // Input comes last
        assert_eq!(args[args.len() - 2], "-i");
        assert!(args.last().unwrap().contains("cam0"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_default_device() {
        let args = capture_input_args(None, 30.0, 320, 240).unwrap();
        assert!(args.contains(&"v4l2".to_string()));
        assert_eq!(args.last().unwrap(), "/dev/video0");
    }

    #[test]
    fn test_parse_dshow_tagged_listing() {
        let listing = r#"[dshow @ 000001f5c1a4e2c0] "Integrated Camera" (video)
[dshow @ 000001f5c1a4e2c0]   Alternative name "@device_pnp_\\?\usb#vid_04f2"
[dshow @ 000001f5c1a4e2c0] "OBS Virtual Camera" (none)
[dshow @ 000001f5c1a4e2c0] "Microphone Array (Realtek(R) Audio)" (audio)
[dshow @ 000001f5c1a4e2c0] "USB Capture HDMI" (audio, video)
dummy: Immediate exit requested"#;
        assert_eq!(
            parse_dshow_video_devices(listing),
            vec!["Integrated Camera", "USB Capture HDMI"]
        );
    }

    #[test]
    fn test_parse_dshow_sectioned_listing() {
        let listing = r#"[dshow @ 0000000000535a40] DirectShow video devices (some may be both video and audio devices)
[dshow @ 0000000000535a40]  "HD WebCam"
[dshow @ 0000000000535a40]     Alternative name "@device_pnp_\\?\usb#vid_0c45"
[dshow @ 0000000000535a40] DirectShow audio devices
[dshow @ 0000000000535a40]  "Microphone (HD Audio)"
"#;
        assert_eq!(parse_dshow_video_devices(listing), vec!["HD WebCam"]);
        assert!(parse_dshow_video_devices("dummy: Immediate exit requested").is_empty());
    }

    #[tokio::test]
    async fn test_explicit_camera_is_kept() {
        let camera = resolve_camera(Some("cam0")).await.unwrap();
        assert_eq!(camera.as_deref(), Some("cam0"));
    }

    #[test]
    fn test_quit_command() {
        assert!(is_quit_command("q"));
        assert!(is_quit_command(" Q \r"));
        assert!(!is_quit_command("quit"));
    }

    #[cfg(unix)]
    #[test]
    fn test_finished_capture_releases_runtime() {
        let start = Instant::now();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (status, interrupted) = rt.block_on(async {
            let mut child = Command::new("sleep")
                .arg("1")
                .stdin(Stdio::piped())
                .spawn()
                .unwrap();
            // Console stays open with nothing typed
            let console = spawn_console_reader().unwrap();
            supervise_capture(&mut child, console, &InterruptHandle::new())
                .await
                .unwrap()
        });
        drop(rt);

        assert!(status.success());
        assert!(!interrupted);
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "Runtime shutdown took {:?}",
            start.elapsed()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_console_quit_stops_capture() {
        // `cat` exits once its stdin is closed after the quit key
        let mut child = Command::new("cat")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let (tx, console) = mpsc::unbounded_channel();
        tx.send("hello".to_string()).unwrap();
        tx.send("q".to_string()).unwrap();

        let handle = InterruptHandle::new();
        let (status, interrupted) = tokio::time::timeout(
            Duration::from_secs(5),
            supervise_capture(&mut child, console, &handle),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(status.success());
        assert!(interrupted);
        assert!(!handle.is_capturing());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupt_stops_capture_without_aborting() {
        let mut child = Command::new("cat")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let (_tx, console) = mpsc::unbounded_channel();

        let handle = InterruptHandle::new();
        let signaller = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            signaller.interrupt();
        });

        let (_, interrupted) = tokio::time::timeout(
            Duration::from_secs(5),
            supervise_capture(&mut child, console, &handle),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(interrupted);

        // The interrupt was consumed by the capture, not the run
        assert!(
            tokio::time::timeout(Duration::from_millis(50), handle.aborted())
                .await
                .is_err()
        );
    }
}
