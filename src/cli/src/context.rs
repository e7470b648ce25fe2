//! Shared state for command execution: configuration, store and engine.

use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;

use learnlog_core::config::Config;
use learnlog_core::projection::ProjectionEngine;
use learnlog_core::statement::{ActorKey, Learner, StatementBuilder};
use learnlog_core::store::{CallContext, LrsClient};
use learnlog_core::telemetry;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<LrsClient>,
    pub builder: StatementBuilder,
    pub engine: ProjectionEngine<LrsClient>,
}

impl AppContext {
    /// Load configuration, install logging and connect the store client.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path))?,
            None => Config::load().context(
                "Failed to load configuration from the environment (set LEARNLOG__STORE__ENDPOINT)",
            )?,
        };

        telemetry::init_logging(&config.logging)?;
        telemetry::describe_metrics();

        let store = Arc::new(LrsClient::new(config.store.clone())?);
        let builder = StatementBuilder::new(config.vocabulary.clone());
        let engine = ProjectionEngine::new(Arc::clone(&store), builder.clone());
        tracing::debug!(endpoint = %config.store.endpoint, "Store client ready");

        Ok(Self {
            config,
            store,
            builder,
            engine,
        })
    }

    /// Call scope bounded by the configured request timeout.
    pub fn call(&self) -> CallContext {
        CallContext::with_timeout(self.config.store.timeout)
    }
}

/// Learner identity options shared by commands.
#[derive(Args, Debug, Clone)]
pub struct LearnerArgs {
    /// Learner account name
    #[arg(short, long)]
    pub learner: String,

    /// Display name (defaults to the account name)
    #[arg(long)]
    pub name: Option<String>,

    /// Role recorded in statement context
    #[arg(long, default_value = "student")]
    pub role: String,
}

impl LearnerArgs {
    pub fn learner(&self) -> Learner {
        Learner::new(
            &self.learner,
            self.name.clone().unwrap_or_else(|| self.learner.clone()),
            &self.role,
        )
    }

    pub fn actor(&self, builder: &StatementBuilder) -> ActorKey {
        builder.actor_key(&self.learner)
    }
}
