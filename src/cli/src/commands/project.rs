//! Language project commands.
//!
//! Provides list, history, create, and advance operations for projects.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use learnlog_core::projection::ProjectView;
use learnlog_core::statement::{new_project_id, ProjectDetails, ProjectStage, Statement};
use learnlog_core::store::StatementStore;

use crate::context::{AppContext, LearnerArgs};
use crate::output::{self, format_time, or_dash, OutputFormat};

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List a learner's projects, most recently updated first
    List {
        #[command(flatten)]
        learner: LearnerArgs,
    },

    /// Show every statement about one project, oldest first
    History {
        #[command(flatten)]
        learner: LearnerArgs,

        /// Project ID
        #[arg(short, long)]
        project: String,
    },

    /// Create a project in the define stage
    Create {
        #[command(flatten)]
        learner: LearnerArgs,

        /// Project title
        #[arg(short, long)]
        title: String,

        /// Project theme
        #[arg(long, default_value = "")]
        theme: String,

        /// Target language
        #[arg(long)]
        language: String,

        /// Learning goal (repeatable)
        #[arg(short, long = "goal")]
        goals: Vec<String>,

        /// Project ID (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Move a project to another stage
    Advance {
        #[command(flatten)]
        learner: LearnerArgs,

        /// Project ID
        #[arg(short, long)]
        project: String,

        /// Target stage (define, collect, create, present)
        #[arg(short, long)]
        stage: ProjectStage,

        /// Target language
        #[arg(long)]
        language: String,
    },
}

// ── Rows ────────────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Theme")]
    theme: String,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Language")]
    language: String,
    #[tabled(rename = "Updated")]
    last_updated: String,
}

impl From<&ProjectView> for ProjectRow {
    fn from(view: &ProjectView) -> Self {
        Self {
            id: view.id.clone(),
            title: or_dash(view.title.as_deref()),
            theme: or_dash(view.theme.as_deref()),
            stage: or_dash(view.stage.as_deref()),
            language: or_dash(view.language.as_deref()),
            last_updated: format_time(&view.last_updated),
        }
    }
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Verb")]
    verb: String,
    #[tabled(rename = "Activity")]
    activity: String,
    #[tabled(rename = "Statement")]
    id: String,
}

impl From<&Statement> for HistoryRow {
    fn from(s: &Statement) -> Self {
        let verb = s
            .verb
            .display
            .get("en-US")
            .cloned()
            .unwrap_or_else(|| s.verb.id.clone());
        let activity = s
            .object
            .definition
            .as_ref()
            .and_then(|d| d.name.get("en-US").cloned())
            .unwrap_or_else(|| s.object.id.clone());
        Self {
            time: format_time(&s.timestamp),
            verb,
            activity,
            id: s.id.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Recorded<'a> {
    project_id: &'a str,
    statement_id: String,
}

// ── Execution ───────────────────────────────────────────────────────────────

pub async fn execute(cmd: ProjectCommands, ctx: &AppContext, format: OutputFormat) -> Result<()> {
    match cmd {
        ProjectCommands::List { learner } => {
            let actor = learner.actor(&ctx.builder);
            let views = ctx.engine.project_projects_for(&actor, &ctx.call()).await?;
            let rows: Vec<ProjectRow> = views.iter().map(ProjectRow::from).collect();
            output::print_list(&rows, &views, format)?;
        }

        ProjectCommands::History { learner, project } => {
            let actor = learner.actor(&ctx.builder);
            let timeline = ctx
                .engine
                .project_timeline(&actor, &project, &ctx.call())
                .await?;
            if let OutputFormat::Table = format {
                output::print_header(&format!("Project: {}", project));
            }
            let rows: Vec<HistoryRow> = timeline.iter().map(HistoryRow::from).collect();
            output::print_list(&rows, &timeline, format)?;
        }

        ProjectCommands::Create {
            learner,
            title,
            theme,
            language,
            goals,
            id,
        } => {
            let project_id = id.unwrap_or_else(new_project_id);
            let details = ProjectDetails {
                title,
                theme,
                language,
                goals,
            };
            let statement =
                ctx.builder
                    .build_project_creation_event(&learner.learner(), &project_id, &details);
            let statement_id = ctx.store.append(&statement, &ctx.call()).await?;

            match format {
                OutputFormat::Table => {
                    output::print_success("Project created");
                    output::print_detail("Project ID", &project_id);
                    output::print_detail("Title", &details.title);
                    output::print_detail("Statement", statement_id.as_str());
                }
                _ => output::print_item(
                    &Recorded {
                        project_id: &project_id,
                        statement_id: statement_id.to_string(),
                    },
                    format,
                )?,
            }
        }

        ProjectCommands::Advance {
            learner,
            project,
            stage,
            language,
        } => {
            let statement = ctx.builder.build_stage_progression_event(
                &learner.learner(),
                &project,
                stage,
                &language,
            );
            let statement_id = ctx.store.append(&statement, &ctx.call()).await?;

            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("Project {} moved to {}", project, stage));
                    output::print_detail("Statement", statement_id.as_str());
                }
                _ => output::print_item(
                    &Recorded {
                        project_id: &project,
                        statement_id: statement_id.to_string(),
                    },
                    format,
                )?,
            }
        }
    }

    Ok(())
}
