//! Frame sampling from the mission video.
//!
//! Decoding is delegated to the `ffmpeg` CLI: `ffprobe` resolves the
//! video duration up front, then each sampled frame is a single-frame
//! seek-and-grab returning JPEG bytes on stdout. The sampler is a lazy,
//! finite iterator; rebuilding it over the same file yields the same
//! sequence, which keeps the whole pipeline deterministic.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::warn;

use crate::model::Frame;

/// Errors that make the video unusable. Always fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("video not found: {0}")]
    NotFound(PathBuf),

    #[error("could not probe {path}: {reason}")]
    Probe { path: PathBuf, reason: String },
}

/// Lazy sequence of frames sampled at a fixed interval.
#[derive(Debug)]
pub struct FrameSampler {
    video: PathBuf,
    interval_ms: u64,
    duration_ms: u64,
    cursor_ms: u64,
}

impl FrameSampler {
    /// Open the video and probe its duration.
    ///
    /// Fails if the file is missing or `ffprobe` cannot parse it.
    pub fn open(video: &Path, interval_ms: u64) -> Result<Self, SourceError> {
        if !video.exists() {
            return Err(SourceError::NotFound(video.to_path_buf()));
        }
        let duration_ms = probe_duration_ms(video)?;
        Ok(Self {
            video: video.to_path_buf(),
            interval_ms: interval_ms.max(1),
            duration_ms,
            cursor_ms: 0,
        })
    }

    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

impl Iterator for FrameSampler {
    type Item = Frame;

    /// Yields the next decodable frame, skipping decode failures with a
    /// warning. Timestamps are strictly increasing.
    fn next(&mut self) -> Option<Frame> {
        while self.cursor_ms < self.duration_ms {
            let timestamp_ms = self.cursor_ms;
            self.cursor_ms += self.interval_ms;

            match extract_jpeg(&self.video, timestamp_ms) {
                Some(jpeg) => return Some(Frame { timestamp_ms, jpeg }),
                None => {
                    warn!(timestamp_ms, "skipping frame that failed to decode");
                }
            }
        }
        None
    }
}

/// Total video duration via `ffprobe`.
fn probe_duration_ms(video: &Path) -> Result<u64, SourceError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(video)
        .output()
        .map_err(|e| SourceError::Probe {
            path: video.to_path_buf(),
            reason: format!("ffprobe could not be run: {e}"),
        })?;

    if !output.status.success() {
        return Err(SourceError::Probe {
            path: video.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_duration_ms(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        SourceError::Probe {
            path: video.to_path_buf(),
            reason: "unparseable duration".to_string(),
        }
    })
}

/// Parse ffprobe's duration output (seconds, fractional) into ms.
fn parse_duration_ms(raw: &str) -> Option<u64> {
    let seconds: f64 = raw.trim().parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some((seconds * 1000.0).round() as u64)
}

/// Grab a single JPEG at the given timestamp, or `None` if the frame
/// cannot be decoded.
fn extract_jpeg(video: &Path, timestamp_ms: u64) -> Option<Vec<u8>> {
    let seconds = format!("{}.{:03}", timestamp_ms / 1000, timestamp_ms % 1000);
    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &seconds, "-i"])
        .arg(video)
        .args([
            "-frames:v", "1", "-f", "image2", "-c:v", "mjpeg", "pipe:1",
        ])
        .output()
        .ok()?;

    if output.status.success() && !output.stdout.is_empty() {
        Some(output.stdout)
    } else {
        None
    }
}
