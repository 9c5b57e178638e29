// SYNOID Bench Entry Point
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use synoid_bench::config::{InputMode, MenuChoice, RunConfig};
use synoid_bench::file_utils::check_dependencies;
use synoid_bench::interrupt::InterruptHandle;
use synoid_bench::pipeline::Pipeline;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "synoid-bench")]
#[command(about = "SYNOID Capture & Encode Benchmark", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Capture duration in seconds (webcam and microphone)
    #[arg(long, global = true, default_value_t = synoid_bench::config::DEFAULT_DURATION_SECS)]
    duration: u32,

    /// Target output frame rate
    #[arg(long, global = true, default_value_t = synoid_bench::config::DEFAULT_FPS)]
    fps: f64,

    /// Output frame width
    #[arg(long, global = true, default_value_t = synoid_bench::config::DEFAULT_WIDTH)]
    width: u32,

    /// Output frame height
    #[arg(long, global = true, default_value_t = synoid_bench::config::DEFAULT_HEIGHT)]
    height: u32,

    /// Microphone sample rate in Hz
    #[arg(long, global = true, default_value_t = synoid_bench::config::DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Video bitrate (FFmpeg syntax)
    #[arg(long, global = true, default_value = synoid_bench::config::DEFAULT_VIDEO_BITRATE)]
    bitrate: String,

    /// Path of the final muxed video
    #[arg(short, long, global = true, default_value = synoid_bench::config::DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Directory for intermediate recordings and extracted audio
    #[arg(long, global = true, default_value = ".")]
    work_dir: PathBuf,

    /// Also write the statistics as JSON to this path
    #[arg(long, global = true)]
    report_json: Option<PathBuf>,

    /// Capture device (v4l2 path, avfoundation index or dshow name)
    #[arg(long, global = true)]
    camera: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import an existing video file
    Import {
        /// Input video path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Record from webcam + microphone
    Record,
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Reading console input")?;
    Ok(line.trim().to_string())
}

/// Interactive console menu. `None` means the choice was invalid.
fn prompt_mode() -> Result<Option<InputMode>> {
    println!("Select input method:");
    println!("1: Import video file");
    println!("2: Record from webcam");
    let choice = prompt_line("Enter 1 or 2: ")?;

    match MenuChoice::from_input(&choice) {
        Some(MenuChoice::ImportFile) => {
            let path = prompt_line("Enter path to video file: ")?;
            Ok(Some(InputMode::Import(PathBuf::from(path))))
        }
        Some(MenuChoice::RecordWebcam) => Ok(Some(InputMode::Record)),
        None => Ok(None),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("🚨 [SYNOID BENCH PANIC] at {}: {}", location, message);
    }));

    let missing_deps = check_dependencies();
    if !missing_deps.is_empty() {
        warn!("⚠️ Missing dependencies: {:?}. Capture and encoding will fail.", missing_deps);
    }

    let args = Cli::parse();

    let config = RunConfig {
        duration_secs: args.duration,
        fps: args.fps,
        width: args.width,
        height: args.height,
        sample_rate: args.sample_rate,
        video_bitrate: args.bitrate,
        output: args.output,
        work_dir: args.work_dir,
        camera: args.camera,
    };

    let mode = match args.command {
        Some(Commands::Import { input }) => InputMode::Import(input),
        Some(Commands::Record) => InputMode::Record,
        None => match prompt_mode()? {
            Some(mode) => mode,
            None => {
                println!("Invalid choice, exiting.");
                return Ok(());
            }
        },
    };

    let interrupts = InterruptHandle::new();
    let pipeline = Pipeline::new(config)?.with_interrupts(interrupts.clone());
    info!("--- SYNOID BENCH v{} ---", env!("CARGO_PKG_VERSION"));

    // Ctrl-C during capture ends the capture; anywhere else it aborts.
    interrupts.listen_for_ctrl_c();
    let outcome = tokio::select! {
        outcome = pipeline.run(mode) => outcome?,
        _ = interrupts.aborted() => bail!("Interrupted by Ctrl-C"),
    };
    println!("{}", outcome.stats);

    if let Some(path) = args.report_json {
        outcome.stats.write_json(&path)?;
    }

    Ok(())
}
