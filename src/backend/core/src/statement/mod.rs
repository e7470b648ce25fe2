//! Learner-activity statements: the wire model, the platform vocabulary and
//! the builders that produce well-formed statements.

pub mod builder;
pub mod model;
pub mod vocabulary;

pub use builder::{new_project_id, Learner, ProjectDetails, StatementBuilder};
pub use model::{
    Account, Activity, ActivityDefinition, ActorKey, Agent, Context, ContextActivities, Extensions,
    LanguageMap, Score, Statement, StatementId, StatementResult, Verb,
};
pub use vocabulary::{LearningOutcome, ProjectStage, VerbKind};
