#![allow(clippy::result_large_err)]
//! # Learnlog Core
//!
//! Learner-activity statements for an AI-assisted language-learning platform.
//!
//! ## Architecture
//!
//! - **Statement**: Typed statement model, platform vocabulary and builders
//! - **Store**: Append/query client for a Learning Record Store, plus an in-memory store
//! - **Projection**: Project and learning-outcome views folded from the statement log
//! - **Telemetry**: Structured logging with credential redaction, store and fold metrics
//! - **Config**: File and environment configuration for the store and vocabulary

pub mod config;
pub mod error;
pub mod projection;
pub mod statement;
pub mod store;
pub mod telemetry;

pub use error::{ErrorCode, ErrorDetails, ErrorKind, ErrorSeverity, LearnlogError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, CredentialConfig, StoreConfig, VocabularyConfig};
    pub use crate::error::{ErrorCode, ErrorKind, LearnlogError, Result};
    pub use crate::projection::{
        OutcomeProgress, ProgressReport, Projection, ProjectionEngine, ProjectView,
    };
    pub use crate::statement::{
        ActorKey, Learner, LearningOutcome, ProjectDetails, ProjectStage, Statement,
        StatementBuilder, StatementId, VerbKind,
    };
    pub use crate::store::{
        CallContext, InMemoryStore, LrsClient, StatementPage, StatementQuery, StatementStore,
    };
}
