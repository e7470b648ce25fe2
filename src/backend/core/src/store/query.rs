//! Statement query filters and result pages.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::statement::{ActorKey, Statement};

/// Filter for the statements resource. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementQuery {
    pub agent: Option<ActorKey>,
    pub activity: Option<String>,
    pub verb: Option<String>,
    /// Match `activity` against context activities as well as the object
    pub related_activities: bool,
    pub registration: Option<Uuid>,
    /// Statements stored strictly after this instant
    pub since: Option<DateTime<Utc>>,
    /// Statements stored at or before this instant
    pub until: Option<DateTime<Utc>>,
    /// Page size; `None` leaves it to the store
    pub limit: Option<u32>,
    pub ascending: Option<bool>,
}

impl StatementQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything one actor did.
    pub fn for_actor(actor: &ActorKey) -> Self {
        Self {
            agent: Some(actor.clone()),
            ..Default::default()
        }
    }

    /// Statements about an activity, directly or through context.
    pub fn for_activity(activity_id: impl Into<String>) -> Self {
        Self {
            activity: Some(activity_id.into()),
            related_activities: true,
            ..Default::default()
        }
    }

    /// Statements about one project, optionally narrowed to one actor.
    pub fn for_project(project_activity_id: impl Into<String>, actor: Option<&ActorKey>) -> Self {
        Self {
            agent: actor.cloned(),
            ..Self::for_activity(project_activity_id)
        }
    }

    pub fn with_verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = Some(verb.into());
        self
    }

    pub fn with_activity(mut self, activity_id: impl Into<String>) -> Self {
        self.activity = Some(activity_id.into());
        self
    }

    pub fn with_related_activities(mut self, related: bool) -> Self {
        self.related_activities = related;
        self
    }

    pub fn with_registration(mut self, registration: Uuid) -> Self {
        self.registration = Some(registration);
        self
    }

    pub fn since(mut self, instant: DateTime<Utc>) -> Self {
        self.since = Some(instant);
        self
    }

    pub fn until(mut self, instant: DateTime<Utc>) -> Self {
        self.until = Some(instant);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = Some(ascending);
        self
    }

    /// Query-string parameters in the statements resource's vocabulary.
    pub fn to_params(&self) -> Result<Vec<(&'static str, String)>> {
        let mut params = Vec::new();

        if let Some(agent) = &self.agent {
            params.push(("agent", serde_json::to_string(&agent.to_agent())?));
        }
        if let Some(verb) = &self.verb {
            params.push(("verb", verb.clone()));
        }
        if let Some(activity) = &self.activity {
            params.push(("activity", activity.clone()));
            if self.related_activities {
                params.push(("related_activities", "true".to_string()));
            }
        }
        if let Some(registration) = &self.registration {
            params.push(("registration", registration.to_string()));
        }
        if let Some(since) = &self.since {
            params.push(("since", since.to_rfc3339_opts(SecondsFormat::Millis, true)));
        }
        if let Some(until) = &self.until {
            params.push(("until", until.to_rfc3339_opts(SecondsFormat::Millis, true)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(ascending) = self.ascending {
            params.push(("ascending", ascending.to_string()));
        }

        Ok(params)
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementPage {
    pub statements: Vec<Statement>,

    /// Continuation token; `None` on the last page
    pub more: Option<String>,

    /// Number of statements on this page, not the total match count
    pub count: usize,
}

impl StatementPage {
    pub fn new(statements: Vec<Statement>, more: Option<String>) -> Self {
        Self {
            count: statements.len(),
            more: more.filter(|m| !m.is_empty()),
            statements,
        }
    }

    pub fn is_last(&self) -> bool {
        self.more.is_none()
    }
}
