//! Cairn configuration.
//!
//! Loaded from `~/.cairn/config.toml` when present. Every field has a
//! default, so the file is optional; CLI flags override individual
//! values per run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::aggregate::MergeConfig;

/// Tunable pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub sampling: SamplingSettings,
    pub merge: MergeSettings,
    pub oracle: OracleSettings,
}

/// Frame sampling.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SamplingSettings {
    /// Milliseconds between sampled frames.
    pub interval_ms: u64,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

/// Merge policy tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MergeSettings {
    /// Merge window as a multiple of the sampling interval.
    pub window_multiplier: u64,

    /// Minimum description similarity (0..=1) required to merge.
    pub similarity_threshold: f64,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            window_multiplier: 3,
            similarity_threshold: 0.5,
        }
    }
}

/// External collaborator tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OracleSettings {
    /// Model name for the Gemini backend.
    pub model: String,

    /// Recognition attempts per frame, including the first.
    pub attempts: u32,

    /// Backoff before the first retry; doubles each retry.
    pub backoff_ms: u64,

    /// Per-call HTTP timeout.
    pub timeout_secs: u64,

    /// Maximum in-flight recognition calls.
    pub concurrency: usize,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            attempts: 3,
            backoff_ms: 500,
            timeout_secs: 30,
            concurrency: 4,
        }
    }
}

impl Config {
    /// Load config from an explicit path, or from the default location.
    ///
    /// An explicit path must exist and parse; a missing default-location
    /// file yields the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The default config file path: `~/.cairn/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".cairn").join("config.toml"))
    }

    /// Resolve the merge tuning against the effective sampling interval.
    #[must_use]
    pub fn merge_config(&self, interval_ms: u64) -> MergeConfig {
        MergeConfig {
            window_ms: interval_ms.saturating_mul(self.merge.window_multiplier),
            similarity_threshold: self.merge.similarity_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    #[test]
    fn defaults_are_total() {
        let config = Config::default();
        assert_eq!(config.sampling.interval_ms, 1000);
        assert_eq!(config.merge.window_multiplier, 3);
        assert_eq!(config.oracle.attempts, 3);
        assert_eq!(config.oracle.model, "gemini-2.5-flash");
    }

    #[test]
    fn partial_file_keeps_unmentioned_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[merge]\nsimilarity-threshold = 0.8\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.merge.similarity_threshold, 0.8);
        assert_eq!(config.merge.window_multiplier, 3);
        assert_eq!(config.sampling.interval_ms, 1000);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/config.toml"))).unwrap_err();
        assert!(err.contains("failed to read"));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not valid {").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.contains("invalid config"));
    }

    #[test]
    fn merge_window_scales_with_the_interval() {
        let config = Config::default();
        assert_eq!(config.merge_config(1000).window_ms, 3000);
        assert_eq!(config.merge_config(500).window_ms, 1500);
    }
}
