//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; the API process installs the
//! Prometheus recorder that exports them.

use std::time::Duration;

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Videos reaching an outcome, by outcome (completed, failed, skipped).
    pub const VIDEOS_TOTAL: &str = "playcoach_videos_total";

    /// Retry attempts against the remote service, by operation.
    pub const REMOTE_RETRIES_TOTAL: &str = "playcoach_remote_retries_total";

    /// Time spent in each pipeline stage.
    pub const STAGE_DURATION_SECONDS: &str = "playcoach_stage_duration_seconds";
}

pub fn record_outcome(outcome: &str) {
    counter!(names::VIDEOS_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

pub fn record_retry(operation: &str) {
    counter!(names::REMOTE_RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}

pub fn record_stage(stage: &str, elapsed: Duration) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage.to_string())
        .record(elapsed.as_secs_f64());
}
