//! Statement data model.
//!
//! A statement records one actor performing one verb on one activity, with an
//! optional result and context. The typed fields are the ones projections
//! depend on. Everything domain-specific rides in [`Extensions`] bags keyed by
//! URI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{LearnlogError, Result};

/// Locale tag → label.
pub type LanguageMap = BTreeMap<String, String>;

// =============================================================================
// Statement IDs
// =============================================================================

/// Identifier of a statement.
///
/// Locally built statements get a UUID v4. Statements read back from a store
/// carry whatever id the store assigned; ids are compared as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatementId(pub String);

impl StatementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StatementId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for StatementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StatementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for StatementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Extensions
// =============================================================================

/// Open URI-keyed bag of JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(BTreeMap<String, serde_json::Value>);

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous one under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Chainable form of [`Extensions::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// String value under `key`. Non-string values read as `None`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(|v| v.as_f64())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, serde_json::Value)> for Extensions {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// Actor
// =============================================================================

/// Account-based actor identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub name: String,
    pub home_page: String,
}

/// Identity key of an actor: (account name, homepage).
///
/// Two statements whose actors share this pair belong to the same learner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorKey {
    pub name: String,
    pub home_page: String,
}

impl ActorKey {
    pub fn new(name: impl Into<String>, home_page: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            home_page: home_page.into(),
        }
    }

    /// Agent descriptor used as the `agent` query filter.
    pub fn to_agent(&self) -> Agent {
        Agent {
            object_type: Some("Agent".to_string()),
            name: None,
            account: Some(Account {
                name: self.name.clone(),
                home_page: self.home_page.clone(),
            }),
        }
    }
}

impl std::fmt::Display for ActorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.home_page)
    }
}

/// The subject of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
}

impl Agent {
    /// Identity key, if the actor is account-identified.
    pub fn key(&self) -> Option<ActorKey> {
        self.account
            .as_ref()
            .filter(|a| !a.name.is_empty() && !a.home_page.is_empty())
            .map(|a| ActorKey::new(&a.name, &a.home_page))
    }
}

// =============================================================================
// Verb & Object
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verb {
    pub id: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub display: LanguageMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityDefinition {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub name: LanguageMap,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub description: LanguageMap,

    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

/// The target of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<ActivityDefinition>,
}

// =============================================================================
// Result & Context
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaled: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Score {
    /// `raw` lies within `[min, max]` when those are given, and `scaled`
    /// within `[-1, 1]`.
    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(LearnlogError::validation(format!(
                    "Score min {} is greater than max {}",
                    min, max
                )));
            }
        }
        if let Some(raw) = self.raw {
            let below = self.min.is_some_and(|min| raw < min);
            let above = self.max.is_some_and(|max| raw > max);
            if below || above {
                return Err(LearnlogError::validation(format!(
                    "Score raw {} is outside its declared range",
                    raw
                )));
            }
        }
        if let Some(scaled) = self.scaled {
            if !(-1.0..=1.0).contains(&scaled) {
                return Err(LearnlogError::validation(format!(
                    "Score scaled {} is outside [-1, 1]",
                    scaled
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,

    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

/// Activities a statement relates to besides its object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextActivities {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent: Vec<Activity>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grouping: Vec<Activity>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<Activity>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<Activity>,
}

impl ContextActivities {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.parent
            .iter()
            .chain(&self.grouping)
            .chain(&self.category)
            .chain(&self.other)
            .map(|a| a.id.as_str())
    }
}

/// Cross-cutting metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_activities: Option<ContextActivities>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

// =============================================================================
// Statement
// =============================================================================

/// An immutable, timestamped record of learner activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: StatementId,
    pub actor: Agent,
    pub verb: Verb,
    pub object: Activity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StatementResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,

    pub timestamp: DateTime<Utc>,

    /// Receipt time reported by the store. Never used for ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored: Option<DateTime<Utc>>,
}

impl Statement {
    /// Check the required fields: actor account, verb id, object id,
    /// object definition type. The timestamp is non-optional by type.
    pub fn validate(&self) -> Result<()> {
        let account = self
            .actor
            .account
            .as_ref()
            .ok_or_else(|| LearnlogError::missing_field("actor.account"))?;
        if account.name.trim().is_empty() {
            return Err(LearnlogError::missing_field("actor.account.name"));
        }
        if account.home_page.trim().is_empty() {
            return Err(LearnlogError::missing_field("actor.account.homePage"));
        }
        if self.verb.id.trim().is_empty() {
            return Err(LearnlogError::missing_field("verb.id"));
        }
        if self.object.id.trim().is_empty() {
            return Err(LearnlogError::missing_field("object.id"));
        }
        match self.definition_type() {
            Some(t) if !t.trim().is_empty() => {}
            _ => return Err(LearnlogError::missing_field("object.definition.type")),
        }
        if self.id.as_str().is_empty() {
            return Err(LearnlogError::missing_field("id"));
        }
        if let Some(score) = self.result.as_ref().and_then(|r| r.score.as_ref()) {
            score.validate()?;
        }
        Ok(())
    }

    pub fn actor_key(&self) -> Option<ActorKey> {
        self.actor.key()
    }

    pub fn definition_type(&self) -> Option<&str> {
        self.object
            .definition
            .as_ref()
            .and_then(|d| d.activity_type.as_deref())
    }

    /// Extension value on the object definition.
    pub fn object_extension(&self, key: &str) -> Option<&serde_json::Value> {
        self.object
            .definition
            .as_ref()
            .and_then(|d| d.extensions.get(key))
    }

    pub fn object_extension_str(&self, key: &str) -> Option<&str> {
        self.object_extension(key).and_then(|v| v.as_str())
    }

    pub fn context_extension_str(&self, key: &str) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|c| c.extensions.get_str(key))
    }

    pub fn result_extension(&self, key: &str) -> Option<&serde_json::Value> {
        self.result.as_ref().and_then(|r| r.extensions.get(key))
    }

    /// Object id plus every context activity id.
    pub fn related_activity_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.object.id.as_str()).chain(
            self.context
                .as_ref()
                .and_then(|c| c.context_activities.as_ref())
                .into_iter()
                .flat_map(|ca| ca.ids()),
        )
    }

    pub fn score_raw(&self) -> Option<f64> {
        self.result
            .as_ref()
            .and_then(|r| r.score.as_ref())
            .and_then(|s| s.raw)
    }

    /// Fold ordering: timestamp first, then the greater id wins ties.
    pub fn is_newer_than(&self, other: &Statement) -> bool {
        (self.timestamp, &self.id) > (other.timestamp, &other.id)
    }
}
