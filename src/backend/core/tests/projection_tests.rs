//! Projection and store semantics exercised end-to-end over in-process stores.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use learnlog_core::error::{ErrorCode, ErrorKind, LearnlogError, Result};
use learnlog_core::projection::{OutcomeProgress, ProjectionEngine};
use learnlog_core::statement::vocabulary::extensions;
use learnlog_core::statement::{
    Learner, LearningOutcome, ProjectDetails, ProjectStage, Statement, StatementBuilder,
    StatementId,
};
use learnlog_core::store::{
    CallContext, InMemoryStore, StatementPage, StatementQuery, StatementStore,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

// ============================================================================
// Test Utilities
// ============================================================================

fn learner() -> Learner {
    Learner::new("learner-42", "Mei Chen", "student")
}

fn engine_over(store: Arc<InMemoryStore>) -> ProjectionEngine<InMemoryStore> {
    ProjectionEngine::new(store, StatementBuilder::default())
}

fn at(day: u32, mut statement: Statement) -> Statement {
    statement.timestamp = Utc.with_ymd_and_hms(2024, 4, day, 12, 0, 0).unwrap();
    statement
}

// ============================================================================
// Projects
// ============================================================================

#[tokio::test]
async fn test_project_stage_follows_latest_statement() {
    let store = Arc::new(InMemoryStore::new());
    let builder = StatementBuilder::default();
    let l = learner();
    let ctx = CallContext::new();

    // Appended out of timestamp order: stores are not trusted to sort.
    let batch = vec![
        at(3, builder.build_project_event(&l, "proj_1", "create", "zh-CN")),
        at(1, builder.build_project_event(&l, "proj_1", "define", "zh-CN")),
        at(2, builder.build_project_event(&l, "proj_1", "collect", "zh-CN")),
    ];
    store.append_batch(&batch, &ctx).await.unwrap();

    let engine = engine_over(store);
    let views = engine
        .project_projects_for(&builder.actor_key("learner-42"), &ctx)
        .await
        .unwrap();

    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, "proj_1");
    assert_eq!(views[0].stage.as_deref(), Some("create"));
    assert_eq!(views[0].last_updated, batch[0].timestamp);
}

#[tokio::test]
async fn test_equal_timestamps_pick_greater_id() {
    let store = Arc::new(InMemoryStore::new());
    let builder = StatementBuilder::default();
    let l = learner();
    let ctx = CallContext::new();

    let mut a = at(5, builder.build_project_event(&l, "proj_1", "define", "en"));
    a.id = StatementId::from("a");
    let mut b = at(5, builder.build_project_event(&l, "proj_1", "collect", "en"));
    b.id = StatementId::from("b");
    store.append_batch(&[b, a], &ctx).await.unwrap();

    let views = engine_over(store)
        .project_projects_for(&builder.actor_key("learner-42"), &ctx)
        .await
        .unwrap();
    assert_eq!(views[0].stage.as_deref(), Some("collect"));
}

#[tokio::test]
async fn test_projects_projection_is_idempotent() {
    let store = Arc::new(InMemoryStore::new());
    let builder = StatementBuilder::default();
    let l = learner();
    let ctx = CallContext::new();

    let details = ProjectDetails {
        title: "Street Food".to_string(),
        theme: "Food".to_string(),
        language: "th".to_string(),
        goals: vec!["ordering".to_string()],
    };
    store
        .append(&builder.build_project_creation_event(&l, "proj_a", &details), &ctx)
        .await
        .unwrap();
    store
        .append(
            &builder.build_stage_progression_event(&l, "proj_a", ProjectStage::Collect, "th"),
            &ctx,
        )
        .await
        .unwrap();
    store
        .append(&builder.build_project_event(&l, "proj_b", "define", "ko"), &ctx)
        .await
        .unwrap();

    let engine = engine_over(store);
    let actor = builder.actor_key("learner-42");
    let first = engine.project_projects_for(&actor, &ctx).await.unwrap();
    let second = engine.project_projects_for(&actor, &ctx).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    let street_food = first.iter().find(|v| v.id == "proj_a").unwrap();
    assert_eq!(street_food.title.as_deref(), Some("Street Food"));
    assert_eq!(street_food.stage.as_deref(), Some("collect"));
}

#[tokio::test]
async fn test_projects_scoped_to_actor() {
    let store = Arc::new(InMemoryStore::new());
    let builder = StatementBuilder::default();
    let ctx = CallContext::new();

    store
        .append(&builder.build_project_event(&learner(), "mine", "define", "en"), &ctx)
        .await
        .unwrap();
    store
        .append(
            &builder.build_project_event(
                &Learner::new("other", "Other", "student"),
                "theirs",
                "define",
                "en",
            ),
            &ctx,
        )
        .await
        .unwrap();

    let views = engine_over(store)
        .project_projects_for(&builder.actor_key("learner-42"), &ctx)
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, "mine");
}

// ============================================================================
// Progress
// ============================================================================

#[tokio::test]
async fn test_missing_achievement_defaults() {
    let store = Arc::new(InMemoryStore::new());
    let builder = StatementBuilder::default();
    let ctx = CallContext::new();

    store
        .append(
            &builder.build_achievement_event(&learner(), "use-explain-evaluate", 40.0, "essay"),
            &ctx,
        )
        .await
        .unwrap();

    let report = engine_over(store)
        .project_progress_for(&builder.actor_key("learner-42"), &ctx)
        .await
        .unwrap();

    assert_eq!(report.len(), LearningOutcome::ALL.len());
    assert_eq!(report.get(LearningOutcome::UseExplainEvaluate).score, 40.0);
    assert_eq!(
        report.get(LearningOutcome::CriticallyAssessOutput),
        OutcomeProgress {
            score: 0.0,
            timestamp: None,
            evidence: None,
        }
    );
}

#[tokio::test]
async fn test_achievement_round_trip() {
    let store = Arc::new(InMemoryStore::new());
    let builder = StatementBuilder::default();
    let ctx = CallContext::new();

    let statement =
        builder.build_achievement_event(&learner(), "apply-ethical-guidelines", 75.0, "evidence-x");
    let id = store.append(&statement, &ctx).await.unwrap();

    let back = store.get_by_id(&id, &ctx).await.unwrap();
    assert_eq!(back.score_raw(), Some(75.0));
    assert_eq!(
        back.result_extension(extensions::EVIDENCE).and_then(|v| v.as_str()),
        Some("evidence-x")
    );

    let report = engine_over(store)
        .project_progress_for(&builder.actor_key("learner-42"), &ctx)
        .await
        .unwrap();
    let progress = report.get(LearningOutcome::ApplyEthicalGuidelines);
    assert_eq!(progress.score, 75.0);
    assert_eq!(progress.evidence.as_deref(), Some("evidence-x"));
    assert_eq!(progress.timestamp, Some(statement.timestamp));
}

/// Delegates to an in-memory store, but one outcome's query sleeps and then
/// fails. Records how many queries ran to completion.
struct FlakyOutcomeStore {
    inner: InMemoryStore,
    failing_activity: String,
    completed: Mutex<usize>,
}

#[async_trait]
impl StatementStore for FlakyOutcomeStore {
    async fn append(&self, statement: &Statement, ctx: &CallContext) -> Result<StatementId> {
        self.inner.append(statement, ctx).await
    }

    async fn append_batch(
        &self,
        statements: &[Statement],
        ctx: &CallContext,
    ) -> Result<Vec<StatementId>> {
        self.inner.append_batch(statements, ctx).await
    }

    async fn query(&self, query: &StatementQuery, ctx: &CallContext) -> Result<StatementPage> {
        if query.activity.as_deref() == Some(self.failing_activity.as_str()) {
            tokio::time::sleep(Duration::from_millis(50)).await;
            return Err(LearnlogError::transport(
                ErrorCode::StoreUnavailable,
                "simulated outage",
            ));
        }
        let page = ctx
            .run("query", async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                self.inner.query(query, ctx).await
            })
            .await?;
        *self.completed.lock() += 1;
        Ok(page)
    }

    async fn query_more(&self, more: &str, ctx: &CallContext) -> Result<StatementPage> {
        self.inner.query_more(more, ctx).await
    }

    async fn get_by_id(&self, id: &StatementId, ctx: &CallContext) -> Result<Statement> {
        self.inner.get_by_id(id, ctx).await
    }
}

#[tokio::test]
async fn test_progress_fails_whole_when_one_outcome_fails() {
    let builder = StatementBuilder::default();
    let store = Arc::new(FlakyOutcomeStore {
        inner: InMemoryStore::new(),
        failing_activity: builder.outcome_activity_id("design-refine-prompts"),
        completed: Mutex::new(0),
    });
    let ctx = CallContext::new();
    store
        .append(
            &builder.build_achievement_event(&learner(), "use-explain-evaluate", 80.0, "e"),
            &ctx,
        )
        .await
        .unwrap();

    let engine = ProjectionEngine::new(store.clone(), builder.clone());
    let err = engine
        .project_progress_for(&builder.actor_key("learner-42"), &ctx)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::StoreUnavailable);
    assert_eq!(err.kind(), ErrorKind::Transport);
    // The slower sibling queries were abandoned, not completed.
    assert_eq!(*store.completed.lock(), 0);
    // The caller's own scope is untouched.
    assert!(!ctx.is_cancelled());
}

#[tokio::test]
async fn test_progress_honours_caller_deadline() {
    let builder = StatementBuilder::default();
    let store = Arc::new(FlakyOutcomeStore {
        inner: InMemoryStore::new(),
        failing_activity: "none".to_string(),
        completed: Mutex::new(0),
    });
    let engine = ProjectionEngine::new(store, builder.clone());

    let ctx = CallContext::with_timeout(Duration::from_millis(50));
    let err = engine
        .project_progress_for(&builder.actor_key("learner-42"), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DeadlineExceeded);
}

// ============================================================================
// Store Semantics
// ============================================================================

#[tokio::test]
async fn test_batch_rejected_on_third_of_five_stores_nothing() {
    let store = InMemoryStore::new();
    let builder = StatementBuilder::default();
    let ctx = CallContext::new();

    let batch: Vec<_> = (0..5)
        .map(|i| builder.build_project_event(&learner(), &format!("proj_{}", i), "define", "en"))
        .collect();
    let refused = batch[2].id.clone();
    store.reject_when(move |s| (s.id == refused).then(|| "schema violation".to_string()));

    let err = assert_err!(store.append_batch(&batch, &ctx).await);
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert!(store.is_empty());

    store.clear_rejections();
    let ids = assert_ok!(store.append_batch(&batch, &ctx).await);
    assert_eq!(ids.len(), 5);
    assert_eq!(ids[2], batch[2].id);
}

#[tokio::test]
async fn test_invalid_batch_member_fails_before_store() {
    let store = InMemoryStore::new();
    let builder = StatementBuilder::default();
    let ctx = CallContext::new();

    let mut batch: Vec<_> = (0..5)
        .map(|i| builder.build_project_event(&learner(), &format!("proj_{}", i), "define", "en"))
        .collect();
    batch[2].object.id.clear();

    let err = store.append_batch(&batch, &ctx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.details().field.as_deref(), Some("object.id"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_projection_drains_every_page() {
    // Every query is paged at 4 even though the engine sets no limit.
    let store = Arc::new(InMemoryStore::with_page_size(4));
    let builder = StatementBuilder::default();
    let ctx = CallContext::new();

    let batch: Vec<_> = (0..25)
        .map(|i| {
            let project_id = format!("proj_{:02}", i);
            at(1 + i % 20, builder.build_project_event(&learner(), &project_id, "define", "en"))
        })
        .collect();
    store.append_batch(&batch, &ctx).await.unwrap();

    let actor = builder.actor_key("learner-42");
    let first = store.query(&StatementQuery::for_actor(&actor), &ctx).await.unwrap();
    assert_eq!(first.count, 4);
    assert!(first.more.is_some());

    let views = engine_over(store.clone())
        .project_projects_for(&actor, &ctx)
        .await
        .unwrap();
    assert_eq!(views.len(), 25);
    assert!(views.windows(2).all(|w| w[0].last_updated >= w[1].last_updated));

    // Only the cursor from the single-page query above is left open.
    assert_eq!(store.open_cursors(), 1);
}
