//! Statement store abstraction.
//!
//! A store is an append-only log of statements reachable over the network
//! (or in memory for tests). Every call takes a [`CallContext`] carrying the
//! caller's deadline and cancellation token.

pub mod client;
pub mod memory;
pub mod query;

pub use client::LrsClient;
pub use memory::InMemoryStore;
pub use query::{StatementPage, StatementQuery};

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{LearnlogError, Result};
use crate::statement::{Statement, StatementId};

// =============================================================================
// Call Context
// =============================================================================

/// Deadline and cancellation scope for one logical operation.
///
/// Cloning shares the same token. [`CallContext::child`] creates a scope
/// that can be cancelled without touching its parent.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl CallContext {
    /// No deadline, fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Bind to an externally owned token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Same deadline, child token.
    pub fn child(&self) -> Self {
        Self {
            deadline: self.deadline,
            cancel: self.cancel.child_token(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Race `fut` against the deadline and the cancellation token.
    ///
    /// Dropping `fut` on either outcome aborts the in-flight request.
    pub async fn run<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(LearnlogError::cancelled(operation));
        }
        if matches!(self.remaining(), Some(d) if d.is_zero()) {
            return Err(LearnlogError::deadline_exceeded(operation));
        }

        let deadline = self.deadline;
        let expiry = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(LearnlogError::cancelled(operation)),
            _ = expiry => Err(LearnlogError::deadline_exceeded(operation)),
            result = fut => result,
        }
    }
}

// =============================================================================
// Store Trait
// =============================================================================

/// Append-only statement log.
#[async_trait]
pub trait StatementStore: Send + Sync {
    /// Validate and store one statement. No retry on failure.
    async fn append(&self, statement: &Statement, ctx: &CallContext) -> Result<StatementId>;

    /// Store all statements or none. Ids come back in input order.
    async fn append_batch(
        &self,
        statements: &[Statement],
        ctx: &CallContext,
    ) -> Result<Vec<StatementId>>;

    /// One page of matching statements, in store order.
    async fn query(&self, query: &StatementQuery, ctx: &CallContext) -> Result<StatementPage>;

    /// The page behind a continuation token from a previous page.
    async fn query_more(&self, more: &str, ctx: &CallContext) -> Result<StatementPage>;

    async fn get_by_id(&self, id: &StatementId, ctx: &CallContext) -> Result<Statement>;

    /// Every matching statement, following continuation tokens to the end.
    async fn query_all(&self, query: &StatementQuery, ctx: &CallContext) -> Result<Vec<Statement>> {
        let mut page = self.query(query, ctx).await?;
        let mut statements = std::mem::take(&mut page.statements);

        while let Some(more) = page.more.take() {
            page = self.query_more(&more, ctx).await?;
            statements.append(&mut page.statements);
        }

        Ok(statements)
    }
}

/// Validate every member before any I/O. The first failure fails the batch.
pub(crate) fn validate_batch(statements: &[Statement]) -> Result<()> {
    for (index, statement) in statements.iter().enumerate() {
        statement
            .validate()
            .map_err(|e| e.with_context("batch_index", index))?;
    }
    Ok(())
}
