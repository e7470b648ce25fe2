//! Metric names and recording helpers.
//!
//! Everything goes through the `metrics` facade. Without an installed recorder
//! the calls are no-ops, so library users opt in by installing their own.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::sync::Once;
use std::time::Instant;

pub const STORE_REQUESTS_TOTAL: &str = "learnlog_store_requests_total";
pub const STORE_REQUEST_DURATION: &str = "learnlog_store_request_duration_seconds";
pub const STATEMENTS_FOLDED: &str = "learnlog_projection_statements_folded";
pub const ERRORS_TOTAL: &str = "learnlog_errors_total";

static DESCRIBE: Once = Once::new();

/// Register metric descriptions with the installed recorder. Idempotent.
pub fn describe_metrics() {
    DESCRIBE.call_once(|| {
        describe_counter!(STORE_REQUESTS_TOTAL, "Statement store calls by operation and outcome");
        describe_histogram!(
            STORE_REQUEST_DURATION,
            "Statement store call latency in seconds"
        );
        describe_counter!(
            STATEMENTS_FOLDED,
            "Statements consumed by projection folds"
        );
        describe_counter!(ERRORS_TOTAL, "Errors by code and category");
    });
}

/// Store call metrics.
pub struct StoreMetrics;

impl StoreMetrics {
    pub fn record(operation: &'static str, outcome: &str, duration_seconds: f64) {
        histogram!(
            STORE_REQUEST_DURATION,
            "operation" => operation,
        )
        .record(duration_seconds);

        counter!(
            STORE_REQUESTS_TOTAL,
            "operation" => operation,
            "outcome" => outcome.to_string(),
        )
        .increment(1);
    }

    /// Start timing a store call.
    pub fn start(operation: &'static str) -> StoreTimer {
        StoreTimer {
            start: Instant::now(),
            operation,
        }
    }
}

/// Times one store call; call [`StoreTimer::finish`] with its outcome.
pub struct StoreTimer {
    start: Instant,
    operation: &'static str,
}

impl StoreTimer {
    /// Record the call. `outcome` is `"ok"` or an error kind.
    pub fn finish<T>(self, result: &crate::error::Result<T>) {
        let outcome = match result {
            Ok(_) => "ok".to_string(),
            Err(e) => e.kind().to_string(),
        };
        StoreMetrics::record(self.operation, &outcome, self.start.elapsed().as_secs_f64());
    }
}

/// Projection metrics.
pub struct ProjectionMetrics;

impl ProjectionMetrics {
    pub fn folded(projection: &'static str, statements: usize) {
        counter!(STATEMENTS_FOLDED, "projection" => projection).increment(statements as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LearnlogError;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        describe_metrics();
        describe_metrics();
        StoreMetrics::start("append").finish(&Ok::<_, LearnlogError>(()));
        StoreMetrics::start("query").finish::<()>(&Err(LearnlogError::rejected("bad")));
        ProjectionMetrics::folded("projects", 3);
    }
}
