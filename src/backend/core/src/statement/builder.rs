//! Constructors for the statement families the platform emits.
//!
//! Builders never perform I/O and never fail. Every call stamps a fresh id
//! and the current time, so identical arguments still yield distinct
//! statements.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{
    Account, ActorKey, Activity, ActivityDefinition, Agent, Context, ContextActivities,
    Extensions, LanguageMap, Score, Statement, StatementId, StatementResult,
};
use super::vocabulary::{
    activity_types, extensions, LearningOutcome, ProjectStage, VerbKind, DEFAULT_PROMPT_TECHNIQUE,
    PLATFORM_ACTIVITY, PROMPT_PREVIEW_CHARS,
};
use crate::config::VocabularyConfig;

/// The learner a statement is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Learner {
    /// Stable account name
    pub id: String,
    pub name: String,
    pub role: String,
}

impl Learner {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
        }
    }
}

/// Descriptive fields captured when a project is first created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub title: String,
    pub theme: String,
    pub language: String,
    #[serde(default)]
    pub goals: Vec<String>,
}

/// Fresh project id of the form `proj_<unix millis>`.
pub fn new_project_id() -> String {
    format!("proj_{}", Utc::now().timestamp_millis())
}

/// Builds well-formed statements for one platform vocabulary.
#[derive(Debug, Clone, Default)]
pub struct StatementBuilder {
    vocabulary: VocabularyConfig,
}

impl StatementBuilder {
    pub fn new(vocabulary: VocabularyConfig) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &VocabularyConfig {
        &self.vocabulary
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identifiers
    // ─────────────────────────────────────────────────────────────────────────

    pub fn actor(&self, learner: &Learner) -> Agent {
        Agent {
            object_type: Some("Agent".to_string()),
            name: Some(learner.name.clone()),
            account: Some(Account {
                name: learner.id.clone(),
                home_page: self.vocabulary.home_page.clone(),
            }),
        }
    }

    /// Identity key for a learner account name under this vocabulary.
    pub fn actor_key(&self, learner_id: &str) -> ActorKey {
        ActorKey::new(learner_id, &self.vocabulary.home_page)
    }

    pub fn project_activity_id(&self, project_id: &str) -> String {
        format!("{}/project/{}", self.base(), project_id)
    }

    pub fn outcome_activity_id(&self, outcome_id: &str) -> String {
        format!("{}/ilo/{}", self.base(), outcome_id)
    }

    fn base(&self) -> &str {
        self.vocabulary.activity_base.trim_end_matches('/')
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Project lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Project statement for `stage`.
    ///
    /// Always uses the "initialized" verb, whatever the stage. Stage moves
    /// that want "progressed" go through
    /// [`build_stage_progression_event`](Self::build_stage_progression_event).
    pub fn build_project_event(
        &self,
        learner: &Learner,
        project_id: &str,
        stage: &str,
        language: &str,
    ) -> Statement {
        let definition = ActivityDefinition {
            activity_type: Some(activity_types::LANGUAGE_PROJECT.to_string()),
            name: en(format!("Language Project - {}", stage)),
            description: LanguageMap::new(),
            extensions: Extensions::new()
                .with(extensions::STAGE, stage)
                .with(extensions::LANGUAGE, language)
                .with(extensions::PROJECT_ID, project_id),
        };

        self.statement(
            learner,
            VerbKind::Initialized,
            activity(self.project_activity_id(project_id), definition),
            None,
            Some(self.context(&learner.role, Some(stage))),
        )
    }

    /// Define-stage project statement that also records title, theme and goals.
    pub fn build_project_creation_event(
        &self,
        learner: &Learner,
        project_id: &str,
        details: &ProjectDetails,
    ) -> Statement {
        let mut statement = self.build_project_event(
            learner,
            project_id,
            ProjectStage::Define.as_str(),
            &details.language,
        );
        if let Some(definition) = statement.object.definition.as_mut() {
            let goals = serde_json::to_string(&details.goals).unwrap_or_else(|_| "[]".to_string());
            definition.extensions.insert(extensions::TITLE, details.title.as_str());
            definition.extensions.insert(extensions::THEME, details.theme.as_str());
            definition.extensions.insert(extensions::GOALS, goals);
        }
        statement
    }

    /// Project statement for a stage move, tagged "progressed".
    pub fn build_stage_progression_event(
        &self,
        learner: &Learner,
        project_id: &str,
        stage: ProjectStage,
        language: &str,
    ) -> Statement {
        let mut statement = self.build_project_event(learner, project_id, stage.as_str(), language);
        statement.verb = VerbKind::Progressed.to_verb();
        statement
    }

    // ─────────────────────────────────────────────────────────────────────────
    // AI tool usage & prompts
    // ─────────────────────────────────────────────────────────────────────────

    pub fn build_tool_usage_event(
        &self,
        learner: &Learner,
        tool_name: &str,
        purpose: &str,
        project_id: &str,
    ) -> Statement {
        let definition = ActivityDefinition {
            activity_type: Some(activity_types::AI_TOOL.to_string()),
            name: en(tool_name),
            description: en(format!("Used {} for {}", tool_name, purpose)),
            extensions: Extensions::new(),
        };

        let mut context = self.context(&learner.role, None);
        context.extensions.insert(extensions::PURPOSE, purpose);
        context.extensions.insert(extensions::PROJECT_ID, project_id);
        context.context_activities = Some(ContextActivities {
            parent: vec![Activity {
                id: self.project_activity_id(project_id),
                object_type: Some("Activity".to_string()),
                definition: None,
            }],
            ..Default::default()
        });

        self.statement(
            learner,
            VerbKind::UsedAiTool,
            activity(format!("{}/ai-tool/{}", self.base(), tool_name), definition),
            None,
            Some(context),
        )
    }

    /// Prompt-engineering statement. Only a preview of `prompt_text` is kept.
    pub fn build_prompt_event(
        &self,
        learner: &Learner,
        prompt_text: &str,
        refinement_count: u32,
        effectiveness_score: f64,
    ) -> Statement {
        let definition = ActivityDefinition {
            activity_type: Some(activity_types::PROMPT_ENGINEERING.to_string()),
            name: LanguageMap::new(),
            description: en(prompt_preview(prompt_text)),
            extensions: Extensions::new(),
        };

        let result = StatementResult {
            score: Some(Score {
                scaled: None,
                raw: Some(effectiveness_score),
                min: Some(0.0),
                max: Some(10.0),
            }),
            extensions: Extensions::new()
                .with(extensions::REFINEMENTS, refinement_count)
                .with(extensions::TECHNIQUE, DEFAULT_PROMPT_TECHNIQUE),
        };

        self.statement(
            learner,
            VerbKind::EngineeredPrompt,
            activity(format!("{}/prompt/{}", self.base(), Uuid::new_v4()), definition),
            Some(result),
            None,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Outcomes
    // ─────────────────────────────────────────────────────────────────────────

    /// Achievement of `level` (0–100) on a learning outcome.
    pub fn build_achievement_event(
        &self,
        learner: &Learner,
        outcome_id: &str,
        level: f64,
        evidence_text: &str,
    ) -> Statement {
        let title = LearningOutcome::from_slug(outcome_id)
            .map(|o| o.title().to_string())
            .unwrap_or_else(|| outcome_id.to_string());

        let definition = ActivityDefinition {
            activity_type: Some(activity_types::LEARNING_OUTCOME.to_string()),
            name: en(title),
            description: LanguageMap::new(),
            extensions: Extensions::new(),
        };

        let result = StatementResult {
            score: Some(Score {
                scaled: Some(level / 100.0),
                raw: Some(level),
                min: Some(0.0),
                max: Some(100.0),
            }),
            extensions: Extensions::new().with(extensions::EVIDENCE, evidence_text),
        };

        self.statement(
            learner,
            VerbKind::Achieved,
            activity(self.outcome_activity_id(outcome_id), definition),
            Some(result),
            None,
        )
    }

    /// "Initialized the platform" statement used to seed an empty store.
    pub fn build_platform_launch_event(&self, learner: &Learner) -> Statement {
        let definition = ActivityDefinition {
            activity_type: Some(activity_types::APPLICATION.to_string()),
            name: en(self.vocabulary.platform.clone()),
            description: LanguageMap::new(),
            extensions: Extensions::new(),
        };

        self.statement(
            learner,
            VerbKind::Initialized,
            activity(PLATFORM_ACTIVITY.to_string(), definition),
            None,
            None,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn statement(
        &self,
        learner: &Learner,
        verb: VerbKind,
        object: Activity,
        result: Option<StatementResult>,
        context: Option<Context>,
    ) -> Statement {
        Statement {
            id: StatementId::new(),
            actor: self.actor(learner),
            verb: verb.to_verb(),
            object,
            result,
            context,
            timestamp: Utc::now(),
            stored: None,
        }
    }

    fn context(&self, role: &str, stage: Option<&str>) -> Context {
        let mut bag = Extensions::new().with(extensions::USER_ROLE, role);
        if let Some(stage) = stage {
            bag.insert(extensions::PROJECT_STAGE, stage);
        }

        Context {
            registration: Some(Uuid::new_v4()),
            context_activities: None,
            platform: Some(self.vocabulary.platform.clone()),
            language: Some(self.vocabulary.language.clone()),
            extensions: bag,
        }
    }
}

fn activity(id: String, definition: ActivityDefinition) -> Activity {
    Activity {
        id,
        object_type: Some("Activity".to_string()),
        definition: Some(definition),
    }
}

fn en(text: impl Into<String>) -> LanguageMap {
    LanguageMap::from([("en-US".to_string(), text.into())])
}

/// First [`PROMPT_PREVIEW_CHARS`] characters, with "..." when cut.
fn prompt_preview(prompt: &str) -> String {
    match prompt.char_indices().nth(PROMPT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &prompt[..cut]),
        None => prompt.to_string(),
    }
}
