//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryConfig;

/// Pipeline and batch-run configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory scanned for input videos
    pub video_dir: PathBuf,
    /// Ledger document path
    pub ledger_path: PathBuf,
    /// Game named in the analysis prompt
    pub game_name: String,
    /// Optional area the critique should prioritize
    pub focus_on: Option<String>,
    /// Delay between activation status checks
    pub poll_interval: Duration,
    /// Total activation wait budget
    pub max_wait: Duration,
    /// Per-request timeout for generation
    pub analysis_timeout: Duration,
    /// Distinct filenames processed in parallel
    pub max_concurrent_videos: usize,
    /// Optional wall-clock limit for a batch run
    pub run_deadline: Option<Duration>,
    /// Backoff policy for remote calls
    pub retry: RetryConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from("videos"),
            ledger_path: PathBuf::from("processed_videos.json"),
            game_name: "EA FC 24".to_string(),
            focus_on: None,
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(120),
            analysis_timeout: Duration::from_secs(600),
            max_concurrent_videos: 1,
            run_deadline: None,
            retry: RetryConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            video_dir: std::env::var("VIDEO_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.video_dir),
            ledger_path: std::env::var("LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ledger_path),
            game_name: std::env::var("GAME_NAME").unwrap_or(defaults.game_name),
            focus_on: std::env::var("FOCUS_ON").ok().filter(|s| !s.trim().is_empty()),
            poll_interval: env_parse("UPLOAD_POLL_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            max_wait: env_parse("UPLOAD_MAX_WAIT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_wait),
            analysis_timeout: env_parse("ANALYSIS_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.analysis_timeout),
            max_concurrent_videos: env_parse::<usize>("MAX_CONCURRENT_VIDEOS")
                .unwrap_or(defaults.max_concurrent_videos)
                .max(1),
            run_deadline: env_parse("RUN_DEADLINE_SECS").map(Duration::from_secs),
            retry: RetryConfig::from_env(),
        }
    }

    /// Number of status checks made before giving up on activation.
    pub fn max_polls(&self) -> u32 {
        max_polls(self.max_wait, self.poll_interval)
    }
}

/// `ceil(max_wait / interval)`, at least one.
pub fn max_polls(max_wait: Duration, interval: Duration) -> u32 {
    let interval = interval.as_millis().max(1);
    let polls = max_wait.as_millis().div_ceil(interval);
    u32::try_from(polls).unwrap_or(u32::MAX).max(1)
}
