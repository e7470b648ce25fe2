//! HTTP client for a Learning Record Store's statements resource.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{validate_batch, CallContext, StatementPage, StatementQuery, StatementStore};
use crate::config::StoreConfig;
use crate::error::{ErrorCode, ErrorDetails, LearnlogError, Result};
use crate::statement::{Statement, StatementId};
use crate::telemetry::{SensitiveFieldRedactor, StoreMetrics};

const VERSION_HEADER: &str = "x-experience-api-version";

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Wire shape of a statements query response.
#[derive(Debug, Deserialize)]
struct StatementResultBody {
    #[serde(default)]
    statements: Vec<Statement>,
    #[serde(default)]
    more: Option<String>,
}

/// Statement store backed by an LRS over HTTP.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct LrsClient {
    http: Client,
    /// Endpoint as configured, used to resolve `more` links
    endpoint: Url,
    statements_url: Url,
    config: StoreConfig,
}

impl LrsClient {
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;

        let endpoint = parse_url(config.base_url())?;
        let statements_url = parse_url(&format!("{}/statements", config.base_url()))?;

        let mut authorization = header_value(&config.credential.authorization_header()?)?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(
            HeaderName::from_static(VERSION_HEADER),
            header_value(&config.version)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        debug!(endpoint = %endpoint, version = %config.version, "LRS client created");

        Ok(Self {
            http,
            endpoint,
            statements_url,
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Response handling
    // ─────────────────────────────────────────────────────────────────────────

    /// Pass 2xx responses through; map everything else onto an error.
    async fn check(
        &self,
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        let error = status_error(operation, status, &body, retry_after);
        warn!(
            operation,
            status = status.as_u16(),
            code = %error.code(),
            "LRS request failed"
        );
        Err(error)
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T> {
        let response = self.check(operation, response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_statements(&self, body: &serde_json::Value) -> Result<Vec<String>> {
        let response = self
            .http
            .post(self.statements_url.clone())
            .json(body)
            .send()
            .await?;
        self.read_json("append", response).await
    }

    async fn fetch_page(&self, operation: &'static str, url: Url) -> Result<StatementPage> {
        let response = self.http.get(url).send().await?;
        let body: StatementResultBody = self.read_json(operation, response).await?;
        Ok(StatementPage::new(body.statements, body.more))
    }
}

#[async_trait]
impl StatementStore for LrsClient {
    #[instrument(skip(self, statement, ctx), fields(statement_id = %statement.id))]
    async fn append(&self, statement: &Statement, ctx: &CallContext) -> Result<StatementId> {
        statement.validate()?;

        let timer = StoreMetrics::start("append");
        let result = ctx
            .run("append", async {
                let body = serde_json::to_value(statement)?;
                let ids = self.post_statements(&body).await?;
                ids.into_iter().next().map(StatementId::from).ok_or_else(|| {
                    LearnlogError::transport(
                        ErrorCode::InvalidResponse,
                        "Statement store returned no statement id",
                    )
                })
            })
            .await;
        timer.finish(&result);

        let id = result?;
        debug!(%id, "Statement appended");
        Ok(id)
    }

    #[instrument(skip(self, statements, ctx), fields(batch_size = statements.len()))]
    async fn append_batch(
        &self,
        statements: &[Statement],
        ctx: &CallContext,
    ) -> Result<Vec<StatementId>> {
        validate_batch(statements)?;
        if statements.is_empty() {
            return Ok(Vec::new());
        }

        let timer = StoreMetrics::start("append_batch");
        let result = ctx
            .run("append_batch", async {
                let body = serde_json::to_value(statements)?;
                let ids = self.post_statements(&body).await?;
                if ids.len() != statements.len() {
                    return Err(LearnlogError::with_internal(
                        ErrorCode::InvalidResponse,
                        "Statement store acknowledged a different number of statements",
                        format!("sent {}, got {} ids", statements.len(), ids.len()),
                    ));
                }
                Ok(ids.into_iter().map(StatementId::from).collect::<Vec<_>>())
            })
            .await;
        timer.finish(&result);

        let ids = result?;
        debug!(count = ids.len(), "Statement batch appended");
        Ok(ids)
    }

    #[instrument(skip(self, query, ctx))]
    async fn query(&self, query: &StatementQuery, ctx: &CallContext) -> Result<StatementPage> {
        let mut url = self.statements_url.clone();
        url.query_pairs_mut().extend_pairs(query.to_params()?);

        let timer = StoreMetrics::start("query");
        let result = ctx.run("query", self.fetch_page("query", url)).await;
        timer.finish(&result);

        let page = result?;
        debug!(count = page.count, more = page.more.is_some(), "Statements queried");
        Ok(page)
    }

    #[instrument(skip(self, ctx))]
    async fn query_more(&self, more: &str, ctx: &CallContext) -> Result<StatementPage> {
        let url = self.endpoint.join(more).map_err(|e| {
            LearnlogError::with_internal(
                ErrorCode::InvalidResponse,
                "Statement store returned an unusable continuation link",
                format!("{}: {}", more, e),
            )
        })?;

        let timer = StoreMetrics::start("query_more");
        let result = ctx.run("query_more", self.fetch_page("query_more", url)).await;
        timer.finish(&result);

        result
    }

    #[instrument(skip(self, ctx), fields(statement_id = %id))]
    async fn get_by_id(&self, id: &StatementId, ctx: &CallContext) -> Result<Statement> {
        let timer = StoreMetrics::start("get_by_id");
        let result = ctx
            .run("get_by_id", async {
                let response = self
                    .http
                    .get(self.statements_url.clone())
                    .query(&[("statementId", id.as_str())])
                    .send()
                    .await?;
                if response.status() == StatusCode::NOT_FOUND {
                    return Err(LearnlogError::statement_not_found(id.as_str()));
                }
                self.read_json::<Statement>("get_by_id", response).await
            })
            .await;
        timer.finish(&result);

        result
    }
}

/// Map a non-2xx status onto the error taxonomy.
fn status_error(
    operation: &'static str,
    status: StatusCode,
    body: &str,
    retry_after: Option<u64>,
) -> LearnlogError {
    let body = truncate(&SensitiveFieldRedactor::global().redact_value(body));
    let mut details = ErrorDetails::new()
        .with_status(status.as_u16())
        .with_context("operation", operation);
    if let Some(seconds) = retry_after {
        details = details.with_retry_after(seconds);
    }

    let (code, message) = match status.as_u16() {
        400 => (ErrorCode::StatementRejected, "Statement store rejected the request"),
        409 => (
            ErrorCode::StatementConflict,
            "Statement id already stored with different content",
        ),
        401 | 403 => (
            ErrorCode::Unauthorized,
            "Authentication failed with statement store",
        ),
        429 => (ErrorCode::RateLimited, "Rate limited by statement store"),
        500..=599 => (
            ErrorCode::StoreUnavailable,
            "Statement store is temporarily unavailable",
        ),
        _ => (ErrorCode::NetworkError, "Statement store returned an error"),
    };

    LearnlogError::with_internal(code, message, format!("HTTP {}: {}", status, body))
        .with_details(details)
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| {
        LearnlogError::configuration(
            ErrorCode::InvalidConfiguration,
            format!("Invalid store endpoint {}: {}", raw, e),
        )
    })
}

fn header_value(raw: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw).map_err(|_| {
        LearnlogError::configuration(
            ErrorCode::InvalidConfiguration,
            "Store credential or version contains characters not allowed in a header",
        )
    })
}
