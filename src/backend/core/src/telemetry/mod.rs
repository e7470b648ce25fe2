//! Telemetry: structured logging and metrics.

pub mod logging;
pub mod metrics;

pub use logging::{
    init_logging, LogFormat, LoggingConfig, RedactionConfig, RedactionPattern,
    SensitiveFieldRedactor,
};
pub use metrics::{describe_metrics, ProjectionMetrics, StoreMetrics, StoreTimer};
