//! In-process statement store.
//!
//! Behaves like an LRS as far as callers can tell: same validation, same
//! all-or-nothing batches, same filters and continuation paging. Results
//! come back newest-inserted first unless the query asks for ascending order.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{validate_batch, CallContext, StatementPage, StatementQuery, StatementStore};
use crate::error::{ErrorCode, ErrorDetails, LearnlogError, Result};
use crate::statement::{Statement, StatementId};

type RejectRule = Arc<dyn Fn(&Statement) -> Option<String> + Send + Sync>;

/// Continuation tokens kept alive at once; the oldest is dropped beyond this.
pub const MAX_OPEN_CURSORS: usize = 64;

/// Append-only statement log held in memory.
#[derive(Default)]
pub struct InMemoryStore {
    statements: RwLock<Vec<Statement>>,
    cursors: Mutex<Cursors>,
    reject: RwLock<Option<RejectRule>>,
    /// Page size applied when a query sets no limit (0 = unpaged)
    page_size: usize,
}

struct Cursor {
    remaining: Vec<Statement>,
    limit: usize,
}

/// Remaining results behind each continuation token, oldest first.
#[derive(Default)]
struct Cursors {
    open: HashMap<String, Cursor>,
    order: VecDeque<String>,
}

impl Cursors {
    fn open(&mut self, token: String, cursor: Cursor) {
        while self.open.len() >= MAX_OPEN_CURSORS {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if self.open.remove(&oldest).is_some() {
                debug!(token = %oldest, "Evicted abandoned continuation token");
            }
        }
        self.order.push_back(token.clone());
        self.open.insert(token, cursor);
    }

    fn take(&mut self, token: &str) -> Option<Cursor> {
        let cursor = self.open.remove(token)?;
        self.order.retain(|t| t != token);
        Some(cursor)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("statements", &self.statements.read().len())
            .field("open_cursors", &self.open_cursors())
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that pages every unlimited query at `page_size`, like an LRS
    /// with a server-side default limit.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Refuse any append that contains a statement for which `rule` returns
    /// a reason, the way an LRS refuses a schema-invalid statement.
    pub fn reject_when<F>(&self, rule: F)
    where
        F: Fn(&Statement) -> Option<String> + Send + Sync + 'static,
    {
        *self.reject.write() = Some(Arc::new(rule));
    }

    pub fn clear_rejections(&self) {
        *self.reject.write() = None;
    }

    pub fn len(&self) -> usize {
        self.statements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.read().is_empty()
    }

    /// Continuation tokens not yet followed.
    pub fn open_cursors(&self) -> usize {
        self.cursors.lock().open.len()
    }

    /// Check the scripted rule and id uniqueness, then store the whole slice.
    fn insert_all(&self, statements: &[Statement]) -> Result<Vec<StatementId>> {
        if let Some(rule) = self.reject.read().clone() {
            for (index, statement) in statements.iter().enumerate() {
                if let Some(reason) = rule(statement) {
                    return Err(LearnlogError::rejected(reason)
                        .with_details(
                            ErrorDetails::new()
                                .with_status(400)
                                .with_entity("statement", statement.id.as_str()),
                        )
                        .with_context("batch_index", index));
                }
            }
        }

        let mut stored = self.statements.write();

        let mut seen: HashSet<&StatementId> = stored.iter().map(|s| &s.id).collect();
        for statement in statements {
            if !seen.insert(&statement.id) {
                return Err(LearnlogError::new(
                    ErrorCode::StatementConflict,
                    format!("Statement id already stored: {}", statement.id),
                )
                .with_details(ErrorDetails::new().with_status(409)));
            }
        }

        let now = Utc::now();
        let ids = statements.iter().map(|s| s.id.clone()).collect();
        stored.extend(statements.iter().cloned().map(|mut s| {
            s.stored = Some(now);
            s
        }));
        Ok(ids)
    }

    fn page(&self, mut remaining: Vec<Statement>, limit: usize) -> StatementPage {
        if limit == 0 || remaining.len() <= limit {
            return StatementPage::new(remaining, None);
        }

        let rest = remaining.split_off(limit);
        let token = format!("/statements?more={}", uuid::Uuid::new_v4());
        self.cursors.lock().open(
            token.clone(),
            Cursor {
                remaining: rest,
                limit,
            },
        );
        StatementPage::new(remaining, Some(token))
    }
}

fn query_matches(query: &StatementQuery, statement: &Statement) -> bool {
    if let Some(agent) = &query.agent {
        if statement.actor_key().as_ref() != Some(agent) {
            return false;
        }
    }
    if let Some(verb) = &query.verb {
        if &statement.verb.id != verb {
            return false;
        }
    }
    if let Some(activity) = &query.activity {
        let hit = if query.related_activities {
            statement.related_activity_ids().any(|id| id == activity)
        } else {
            &statement.object.id == activity
        };
        if !hit {
            return false;
        }
    }
    if let Some(registration) = &query.registration {
        if statement.context.as_ref().and_then(|c| c.registration.as_ref()) != Some(registration) {
            return false;
        }
    }

    let stored = statement.stored.unwrap_or(statement.timestamp);
    if matches!(query.since, Some(since) if stored <= since) {
        return false;
    }
    if matches!(query.until, Some(until) if stored > until) {
        return false;
    }
    true
}

#[async_trait]
impl StatementStore for InMemoryStore {
    #[instrument(skip(self, statement, ctx), fields(statement_id = %statement.id))]
    async fn append(&self, statement: &Statement, ctx: &CallContext) -> Result<StatementId> {
        statement.validate()?;
        ctx.run("append", async {
            let mut ids = self.insert_all(std::slice::from_ref(statement))?;
            ids.pop()
                .ok_or_else(|| LearnlogError::internal("append produced no id"))
        })
        .await
    }

    #[instrument(skip(self, statements, ctx), fields(batch_size = statements.len()))]
    async fn append_batch(
        &self,
        statements: &[Statement],
        ctx: &CallContext,
    ) -> Result<Vec<StatementId>> {
        validate_batch(statements)?;
        ctx.run("append_batch", async { self.insert_all(statements) })
            .await
    }

    #[instrument(skip(self, query, ctx))]
    async fn query(&self, query: &StatementQuery, ctx: &CallContext) -> Result<StatementPage> {
        ctx.run("query", async {
            let mut hits: Vec<Statement> = self
                .statements
                .read()
                .iter()
                .filter(|s| query_matches(query, s))
                .cloned()
                .collect();
            if query.ascending != Some(true) {
                hits.reverse();
            }

            let limit = query.limit.map_or(self.page_size, |l| l as usize);
            let page = self.page(hits, limit);
            debug!(count = page.count, more = page.more.is_some(), "Statements queried");
            Ok(page)
        })
        .await
    }

    #[instrument(skip(self, ctx))]
    async fn query_more(&self, more: &str, ctx: &CallContext) -> Result<StatementPage> {
        ctx.run("query_more", async {
            let cursor = self.cursors.lock().take(more).ok_or_else(|| {
                LearnlogError::new(
                    ErrorCode::InvalidResponse,
                    "Unknown or expired continuation token",
                )
                .with_context("more", more)
            })?;
            Ok(self.page(cursor.remaining, cursor.limit))
        })
        .await
    }

    #[instrument(skip(self, ctx), fields(statement_id = %id))]
    async fn get_by_id(&self, id: &StatementId, ctx: &CallContext) -> Result<Statement> {
        ctx.run("get_by_id", async {
            self.statements
                .read()
                .iter()
                .find(|s| &s.id == id)
                .cloned()
                .ok_or_else(|| LearnlogError::statement_not_found(id.as_str()))
        })
        .await
    }
}
