// SYNOID Bench Report
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Compression and encoding statistics gathered after a run. Observational
// only: nothing here feeds back into the pipeline.

use crate::file_utils::file_size_mb;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use sysinfo::SystemExt;
use tracing::info;

const BYTES_PER_GB: f64 = 1_073_741_824.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileStat {
    pub name: String,
    pub size_mb: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MemoryUsage {
    pub used_gb: f64,
    pub total_gb: f64,
}

impl MemoryUsage {
    /// Snapshot of host memory via sysinfo.
    pub fn sample() -> Self {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        Self::from_bytes(sys.used_memory(), sys.total_memory())
    }

    pub fn from_bytes(used: u64, total: u64) -> Self {
        Self {
            used_gb: used as f64 / BYTES_PER_GB,
            total_gb: total as f64 / BYTES_PER_GB,
        }
    }
}

/// Everything printed at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// Source files that existed when stats were collected.
    pub source_files: Vec<FileStat>,
    pub output_file: PathBuf,
    pub output_size_mb: Option<f64>,
    pub encode_secs: f64,
    pub memory: MemoryUsage,
    pub audio_sample_rate: u32,
    pub fps: f64,
    pub resolution: (u32, u32),
    pub total_secs: f64,
}

impl RunStats {
    /// Gather file sizes and host memory. Missing files are skipped.
    pub fn collect(
        source_files: &[PathBuf],
        output_file: &Path,
        encode_secs: f64,
        audio_sample_rate: u32,
        fps: f64,
        resolution: (u32, u32),
        total_secs: f64,
    ) -> Self {
        let source_files = source_files
            .iter()
            .filter_map(|p| {
                file_size_mb(p).map(|size_mb| FileStat {
                    name: p
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| p.to_string_lossy().into_owned()),
                    size_mb,
                })
            })
            .collect();

        Self {
            source_files,
            output_file: output_file.to_path_buf(),
            output_size_mb: file_size_mb(output_file),
            encode_secs,
            memory: MemoryUsage::sample(),
            audio_sample_rate,
            fps,
            resolution,
            total_secs,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Serializing run stats")?;
        std::fs::write(path, json).with_context(|| format!("Writing report {:?}", path))?;
        info!("[REPORT] 💾 Stats saved: {:?}", path);
        Ok(())
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n--- Compression and Encoding Statistics ---")?;
        for file in &self.source_files {
            writeln!(f, "{} size: {:.2} MB", file.name, file.size_mb)?;
        }
        if let Some(size) = self.output_size_mb {
            writeln!(f, "Output file size: {:.2} MB", size)?;
        }
        writeln!(f, "Encoding time: {:.2} seconds", self.encode_secs)?;
        writeln!(
            f,
            "System Memory usage: Used {:.2} GB / Total {:.2} GB",
            self.memory.used_gb, self.memory.total_gb
        )?;
        writeln!(f, "Audio sample rate: {} Hz", self.audio_sample_rate)?;
        writeln!(f, "Video FPS: {}", self.fps)?;
        writeln!(
            f,
            "Video resolution: {}x{}",
            self.resolution.0, self.resolution.1
        )?;
        write!(f, "Total processing time: {:.2} seconds", self.total_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> RunStats {
        RunStats {
            source_files: vec![FileStat {
                name: "test1.mp4".to_string(),
                size_mb: 12.346,
            }],
            output_file: PathBuf::from("result.mp4"),
            output_size_mb: Some(4.5),
            encode_secs: 7.891,
            memory: MemoryUsage::from_bytes(4 * 1_073_741_824, 16 * 1_073_741_824),
            audio_sample_rate: 44_100,
            fps: 60.0,
            resolution: (640, 480),
            total_secs: 70.0,
        }
    }

    #[test]
    fn test_report_layout() {
        let text = stats().to_string();
        assert!(text.contains("--- Compression and Encoding Statistics ---"));
        assert!(text.contains("test1.mp4 size: 12.35 MB"));
        assert!(text.contains("Output file size: 4.50 MB"));
        assert!(text.contains("Encoding time: 7.89 seconds"));
        assert!(text.contains("Used 4.00 GB / Total 16.00 GB"));
        assert!(text.contains("Audio sample rate: 44100 Hz"));
        assert!(text.contains("Video FPS: 60"));
        assert!(text.contains("Video resolution: 640x480"));
        assert!(text.ends_with("Total processing time: 70.00 seconds"));
    }

    #[test]
    fn test_collect_skips_missing_files() {
        let dir = std::env::temp_dir().join(format!("synoid_bench_report_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let present = dir.join("audio1.wav");
        std::fs::write(&present, vec![0u8; 1_048_576]).unwrap();

        let stats = RunStats::collect(
            &[present.clone(), dir.join("gone.mp4")],
            &dir.join("result.mp4"),
            1.0,
            44_100,
            60.0,
            (640, 480),
            2.0,
        );
        assert_eq!(stats.source_files.len(), 1);
        assert_eq!(stats.source_files[0].name, "audio1.wav");
        assert_eq!(stats.source_files[0].size_mb, 1.0);
        assert_eq!(stats.output_size_mb, None);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_json_report() {
        let path = std::env::temp_dir().join(format!("synoid_bench_stats_{}.json", std::process::id()));
        stats().write_json(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["audio_sample_rate"], 44_100);
        assert_eq!(value["resolution"][0], 640);
        let _ = std::fs::remove_file(path);
    }
}
