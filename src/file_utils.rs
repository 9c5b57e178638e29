// SYNOID Bench File Utilities
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Output naming, argument-safe paths and external tool discovery.

use std::path::{Path, PathBuf};

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Return the first `{base}{N}.{ext}` inside `dir` (N starting at 1) that
/// does not exist yet, so earlier recordings are never overwritten.
pub fn unique_filename(dir: &Path, base: &str, ext: &str) -> PathBuf {
    let mut i: u32 = 1;
    loop {
        let candidate = dir.join(format!("{}{}.{}", base, i, ext));
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}

/// Prefix relative paths that start with '-' with "./" so FFmpeg does not
/// read them as flags.
pub fn safe_arg_path(path: &Path) -> PathBuf {
    if path.is_relative() && path.to_string_lossy().starts_with('-') {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}

/// File size in MiB, or `None` if the file is missing.
pub fn file_size_mb(path: &Path) -> Option<f64> {
    std::fs::metadata(path)
        .ok()
        .map(|m| m.len() as f64 / BYTES_PER_MB)
}

/// FFmpeg binary, overridable via `FFMPEG_BIN`.
pub fn ffmpeg_bin() -> String {
    std::env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string())
}

/// FFprobe binary, overridable via `FFPROBE_BIN`.
pub fn ffprobe_bin() -> String {
    std::env::var("FFPROBE_BIN").unwrap_or_else(|_| "ffprobe".to_string())
}

pub fn which_exists(name: &str) -> bool {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return direct.exists();
    }
    if let Some(path_env) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_env) {
            let candidate = dir.join(name);
            if candidate.exists() || candidate.with_extension("exe").exists() {
                return true;
            }
        }
    }
    false
}

/// Names of required external tools that could not be found.
pub fn check_dependencies() -> Vec<String> {
    [ffmpeg_bin(), ffprobe_bin()]
        .into_iter()
        .filter(|bin| !which_exists(bin))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("synoid_bench_{}_{}", name, std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).unwrap();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_unique_filename_starts_at_one() {
        let dir = scratch_dir("unique_empty");
        assert_eq!(unique_filename(&dir, "test", "mp4"), dir.join("test1.mp4"));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_unique_filename_never_overwrites() {
        let dir = scratch_dir("unique_taken");
        fs::write(dir.join("test1.mp4"), b"x").unwrap();
        assert_eq!(unique_filename(&dir, "test", "mp4"), dir.join("test2.mp4"));

        fs::write(dir.join("test2.mp4"), b"x").unwrap();
        assert_eq!(unique_filename(&dir, "test", "mp4"), dir.join("test3.mp4"));

        // Other extensions don't block the name
        assert_eq!(unique_filename(&dir, "test", "wav"), dir.join("test1.wav"));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_safe_arg_path() {
        assert_eq!(safe_arg_path(Path::new("-out.mp4")), Path::new(".").join("-out.mp4"));
        assert_eq!(safe_arg_path(Path::new("out.mp4")), PathBuf::from("out.mp4"));
    }

    #[test]
    fn test_file_size_mb() {
        let dir = scratch_dir("size");
        let path = dir.join("blob.bin");
        fs::write(&path, vec![0u8; 524_288]).unwrap();
        assert_eq!(file_size_mb(&path), Some(0.5));
        assert_eq!(file_size_mb(&dir.join("missing.bin")), None);
        let _ = fs::remove_dir_all(dir);
    }
}
