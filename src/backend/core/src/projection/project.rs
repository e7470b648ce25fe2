//! Current state of each language project, folded from its statements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Projection;
use crate::statement::vocabulary::{activity_types, extensions};
use crate::statement::{ActorKey, Statement};

/// Grouping key: one project of one learner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectKey {
    pub actor: ActorKey,
    pub project_id: String,
}

impl ProjectKey {
    /// Key for a language-project statement with an account actor and a
    /// project id.
    pub fn of(statement: &Statement) -> Option<Self> {
        Some(Self {
            actor: statement.actor_key()?,
            project_id: project_id_of(statement)?,
        })
    }
}

/// Project id from the `project-id` extension. Statements without one
/// belong to no project.
fn project_id_of(statement: &Statement) -> Option<String> {
    statement
        .object_extension_str(extensions::PROJECT_ID)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// What a learner sees for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: String,
    pub title: Option<String>,
    pub theme: Option<String>,
    pub stage: Option<String>,
    pub language: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// Latest statement per project, plus the latest values of fields that only
/// some statements carry.
#[derive(Debug, Clone)]
struct ProjectState {
    latest: Statement,
    title: Option<Stamped>,
    theme: Option<Stamped>,
}

#[derive(Debug, Clone)]
struct Stamped {
    at: Statement,
    value: String,
}

impl ProjectState {
    fn new(statement: &Statement) -> Self {
        let mut state = Self {
            latest: statement.clone(),
            title: None,
            theme: None,
        };
        state.offer_optional(statement);
        state
    }

    fn offer(&mut self, statement: &Statement) {
        if statement.is_newer_than(&self.latest) {
            self.latest = statement.clone();
        }
        self.offer_optional(statement);
    }

    fn offer_optional(&mut self, statement: &Statement) {
        offer_field(&mut self.title, statement, extensions::TITLE);
        offer_field(&mut self.theme, statement, extensions::THEME);
    }

    fn view(&self, project_id: &str) -> ProjectView {
        let latest = &self.latest;
        ProjectView {
            id: project_id.to_string(),
            title: self.title.as_ref().map(|s| s.value.clone()),
            theme: self.theme.as_ref().map(|s| s.value.clone()),
            stage: latest.object_extension_str(extensions::STAGE).map(str::to_string),
            language: latest
                .object_extension_str(extensions::LANGUAGE)
                .map(str::to_string),
            last_updated: latest.timestamp,
        }
    }
}

fn offer_field(slot: &mut Option<Stamped>, statement: &Statement, key: &str) {
    let Some(value) = statement.object_extension_str(key) else {
        return;
    };
    let newer = match slot {
        Some(current) => statement.is_newer_than(&current.at),
        None => true,
    };
    if newer {
        *slot = Some(Stamped {
            at: statement.clone(),
            value: value.to_string(),
        });
    }
}

/// Folds language-project statements into one view per [`ProjectKey`].
///
/// Statements of other activity types are ignored, so the fold can consume an
/// actor's whole stream.
#[derive(Debug, Default)]
pub struct ProjectsProjection {
    projects: HashMap<ProjectKey, ProjectState>,
    folded: usize,
}

impl Projection for ProjectsProjection {
    type Output = Vec<ProjectView>;
    const NAME: &'static str = "projects";

    fn apply(&mut self, statement: &Statement) {
        if statement.definition_type() != Some(activity_types::LANGUAGE_PROJECT) {
            return;
        }
        let Some(key) = ProjectKey::of(statement) else {
            return;
        };

        self.folded += 1;
        self.projects
            .entry(key)
            .and_modify(|state| state.offer(statement))
            .or_insert_with(|| ProjectState::new(statement));
    }

    fn folded(&self) -> usize {
        self.folded
    }

    /// Views ordered by last update, newest first, then by project id.
    fn finish(self) -> Vec<ProjectView> {
        let mut views: Vec<ProjectView> = self
            .projects
            .iter()
            .map(|(key, state)| state.view(&key.project_id))
            .collect();
        views.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| a.id.cmp(&b.id))
        });
        views
    }
}

/// Fold `statements` into project views.
pub fn fold_projects(statements: &[Statement]) -> Vec<ProjectView> {
    super::fold::<ProjectsProjection>(statements)
}
