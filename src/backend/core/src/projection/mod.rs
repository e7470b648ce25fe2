//! Read-side projections over the statement log.
//!
//! Folds are pure: the same statements in any order produce the same views.
//! The engine only adds the queries that gather those statements.

pub mod progress;
pub mod project;

pub use progress::{latest_achievement, AchievementProjection, OutcomeProgress, ProgressReport};
pub use project::{fold_projects, ProjectKey, ProjectView, ProjectsProjection};

use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::statement::{ActorKey, LearningOutcome, Statement, StatementBuilder, VerbKind};
use crate::store::{CallContext, StatementQuery, StatementStore};
use crate::telemetry::ProjectionMetrics;

// =============================================================================
// Projection Trait
// =============================================================================

/// A view rebuilt from a stream of statements.
///
/// Starts at its `Default` state and folds each statement via `apply`.
/// `apply` must not perform I/O or fail, and its result must not depend on
/// the order statements arrive in.
pub trait Projection: Default {
    type Output;

    /// Label for metrics.
    const NAME: &'static str;

    fn apply(&mut self, statement: &Statement);

    /// Statements that contributed to the view so far.
    fn folded(&self) -> usize;

    fn finish(self) -> Self::Output;
}

/// Run a projection over `statements`.
pub fn fold<P: Projection>(statements: &[Statement]) -> P::Output {
    let mut projection = P::default();
    for statement in statements {
        projection.apply(statement);
    }
    ProjectionMetrics::folded(P::NAME, projection.folded());
    projection.finish()
}

// =============================================================================
// Projection Engine
// =============================================================================

/// Answers learner-facing questions from a statement store.
///
/// Holds no state of its own; every call re-reads the store.
pub struct ProjectionEngine<S> {
    store: Arc<S>,
    builder: StatementBuilder,
}

impl<S> Clone for ProjectionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            builder: self.builder.clone(),
        }
    }
}

impl<S: StatementStore> ProjectionEngine<S> {
    /// `builder` supplies the activity ids queries are keyed on, so it must
    /// use the same vocabulary as the statements were built with.
    pub fn new(store: Arc<S>, builder: StatementBuilder) -> Self {
        Self { store, builder }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Current state of each of the actor's projects, newest first.
    #[instrument(skip(self, actor, ctx), fields(actor = %actor))]
    pub async fn project_projects_for(
        &self,
        actor: &ActorKey,
        ctx: &CallContext,
    ) -> Result<Vec<ProjectView>> {
        // The statements resource cannot filter on activity type, so the
        // fold drops everything that is not a language project.
        let statements = self
            .store
            .query_all(&StatementQuery::for_actor(actor), ctx)
            .await?;

        let views = fold_projects(&statements);
        debug!(statements = statements.len(), projects = views.len(), "Projects projected");
        Ok(views)
    }

    /// Latest achievement on every learning outcome.
    ///
    /// One query per outcome, run concurrently. The first failure cancels
    /// the others and fails the whole call.
    #[instrument(skip(self, actor, ctx), fields(actor = %actor))]
    pub async fn project_progress_for(
        &self,
        actor: &ActorKey,
        ctx: &CallContext,
    ) -> Result<ProgressReport> {
        let scope = ctx.child();

        let per_outcome = LearningOutcome::ALL.into_iter().map(|outcome| {
            let scope = scope.clone();
            let query = StatementQuery::for_actor(actor)
                .with_activity(self.builder.outcome_activity_id(outcome.slug()))
                .with_verb(VerbKind::Achieved.id());

            async move {
                match self.store.query_all(&query, &scope).await {
                    Ok(statements) => Ok((outcome, latest_achievement(&statements))),
                    Err(e) => {
                        scope.cancel();
                        Err(e)
                    }
                }
            }
        });

        let report: ProgressReport = try_join_all(per_outcome).await?.into_iter().collect();
        debug!(outcomes = report.len(), "Progress projected");
        Ok(report)
    }

    /// Every statement about one project, oldest first.
    #[instrument(skip(self, actor, ctx), fields(actor = %actor))]
    pub async fn project_timeline(
        &self,
        actor: &ActorKey,
        project_id: &str,
        ctx: &CallContext,
    ) -> Result<Vec<Statement>> {
        let activity = self.builder.project_activity_id(project_id);
        let query = StatementQuery::for_project(activity, Some(actor));
        let mut statements = self.store.query_all(&query, ctx).await?;

        statements.sort_by(|a, b| (a.timestamp, &a.id).cmp(&(b.timestamp, &b.id)));
        ProjectionMetrics::folded("timeline", statements.len());
        Ok(statements)
    }
}
