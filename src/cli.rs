//! CLI interface for Cairn.
//!
//! One non-interactive subcommand: `cairn run <video>` drives the full
//! pipeline and prints the report path on success. The exit code is 0
//! whenever a report was written, partial ones included, and non-zero
//! only for fatal errors (unreadable video, unwritable output root).

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::model::Mission;
use crate::observe::{LandmarkObserver, RetryPolicy};
use crate::oracle::{DisabledOracle, GeminiOracle, RecognitionOracle, SummaryOracle};
use crate::pipeline::{self, PipelineOptions};
use crate::pose::PoseTrack;
use crate::video::FrameSampler;

/// Cairn: turn a rover mission video into a landmark report.
#[derive(Debug, Parser)]
#[command(name = "cairn")]
pub struct Cli {
    /// Path to an alternate config file (default: ~/.cairn/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the landmark pipeline over a mission video and write the report.
    ///
    /// Recognition uses the Gemini backend when GEMINI_API_KEY is set;
    /// without it the run still produces a (landmark-free) report.
    Run {
        /// Path to the mission video.
        video: PathBuf,

        /// JSON trajectory log: an array of {timestampMs, x, y,
        /// headingDegrees} records. The report degrades gracefully
        /// without one.
        #[arg(long)]
        pose_file: Option<PathBuf>,

        /// Mission identifier. Generated when omitted; pin it for
        /// reproducible output paths.
        #[arg(long)]
        mission_id: Option<String>,

        /// Root directory for report artifacts.
        #[arg(long, default_value = "outputs")]
        output_root: PathBuf,

        /// Override the frame sampling interval.
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Mission deadline in seconds. On expiry a partial report is
        /// assembled from whatever was observed so far.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

/// Run the CLI, returning an error message on fatal failure.
pub async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            video,
            pose_file,
            mission_id,
            output_root,
            interval_ms,
            timeout_secs,
        } => {
            cmd_run(
                &config,
                &video,
                pose_file.as_deref(),
                mission_id,
                output_root,
                interval_ms,
                timeout_secs,
            )
            .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    config: &Config,
    video: &std::path::Path,
    pose_file: Option<&std::path::Path>,
    mission_id: Option<String>,
    output_root: PathBuf,
    interval_ms: Option<u64>,
    timeout_secs: Option<u64>,
) -> Result<(), String> {
    let mission = Mission {
        id: mission_id.unwrap_or_else(generate_mission_id),
        output_root,
    };
    info!(mission_id = %mission.id, video = %video.display(), "starting mission");

    // A malformed pose file downgrades to "no pose data"; the report
    // then reads "location unavailable" throughout.
    let poses = match pose_file {
        Some(path) => match PoseTrack::load(path) {
            Ok(track) => track,
            Err(e) => {
                warn!("proceeding without pose data: {e}");
                PoseTrack::empty()
            }
        },
        None => PoseTrack::empty(),
    };

    let interval_ms = interval_ms.unwrap_or(config.sampling.interval_ms);
    let sampler = FrameSampler::open(video, interval_ms)
        .map_err(|e| format!("cannot open mission video: {e}"))?;

    let (recognition, summarizer) = build_oracles(config)?;
    let observer = LandmarkObserver::new(
        recognition,
        RetryPolicy {
            attempts: config.oracle.attempts,
            base_backoff: Duration::from_millis(config.oracle.backoff_ms),
        },
    );

    let options = PipelineOptions {
        concurrency: config.oracle.concurrency,
        merge: config.merge_config(interval_ms),
        deadline: timeout_secs.map(Duration::from_secs),
    };

    let report_path =
        pipeline::run_mission(&mission, sampler, &poses, &observer, summarizer, &options)
            .await
            .map_err(|e| format!("failed to write report: {e}"))?;

    println!("{}", report_path.display());
    Ok(())
}

/// Build the collaborator pair from the environment.
///
/// Without credentials, recognition is disabled and the narrative
/// summary degrades to its placeholder.
#[allow(clippy::type_complexity)]
fn build_oracles(
    config: &Config,
) -> Result<(Arc<dyn RecognitionOracle>, Option<Arc<dyn SummaryOracle>>), String> {
    let timeout = Duration::from_secs(config.oracle.timeout_secs);
    match env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => {
            let oracle = Arc::new(
                GeminiOracle::new(key, config.oracle.model.clone(), timeout)
                    .map_err(|e| format!("failed to build recognition client: {e}"))?,
            );
            Ok((
                oracle.clone() as Arc<dyn RecognitionOracle>,
                Some(oracle as Arc<dyn SummaryOracle>),
            ))
        }
        _ => {
            warn!("GEMINI_API_KEY not set; recognition disabled, the report will hold no landmarks");
            Ok((Arc::new(DisabledOracle), None))
        }
    }
}

/// A short generated mission id, for runs that don't pin one.
fn generate_mission_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("mission-{}", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_mission_ids_are_distinct() {
        let a = generate_mission_id();
        let b = generate_mission_id();
        assert!(a.starts_with("mission-"));
        assert_ne!(a, b);
    }
}
