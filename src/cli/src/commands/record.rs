//! Record learner activity: AI tool use, prompt iterations and achievements.

use anyhow::Result;
use clap::Subcommand;
use serde_json::json;

use learnlog_core::statement::{LearningOutcome, Statement};
use learnlog_core::store::StatementStore;

use crate::context::{AppContext, LearnerArgs};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum RecordCommands {
    /// Record use of an AI tool within a project
    Tool {
        #[command(flatten)]
        learner: LearnerArgs,

        /// Tool name (e.g. chatgpt)
        #[arg(short, long)]
        tool: String,

        /// What the tool was used for
        #[arg(short, long)]
        purpose: String,

        /// Project the tool was used in
        #[arg(long)]
        project: String,
    },

    /// Record a prompt and how effective it was
    Prompt {
        #[command(flatten)]
        learner: LearnerArgs,

        /// Prompt text
        #[arg(short, long)]
        text: String,

        /// Number of refinements before the final prompt
        #[arg(short, long, default_value = "0")]
        refinements: u32,

        /// Effectiveness score (0-10)
        #[arg(short, long)]
        score: f64,
    },

    /// Record an achievement on a learning outcome
    Achievement {
        #[command(flatten)]
        learner: LearnerArgs,

        /// Learning outcome slug
        #[arg(short, long)]
        outcome: LearningOutcome,

        /// Achievement level (0-100)
        #[arg(long)]
        level: f64,

        /// Evidence supporting the achievement
        #[arg(short, long, default_value = "")]
        evidence: String,
    },
}

pub async fn execute(cmd: RecordCommands, ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let (label, statement) = match cmd {
        RecordCommands::Tool {
            learner,
            tool,
            purpose,
            project,
        } => (
            "Tool usage",
            ctx.builder
                .build_tool_usage_event(&learner.learner(), &tool, &purpose, &project),
        ),

        RecordCommands::Prompt {
            learner,
            text,
            refinements,
            score,
        } => (
            "Prompt",
            ctx.builder
                .build_prompt_event(&learner.learner(), &text, refinements, score),
        ),

        RecordCommands::Achievement {
            learner,
            outcome,
            level,
            evidence,
        } => (
            "Achievement",
            ctx.builder
                .build_achievement_event(&learner.learner(), outcome.slug(), level, &evidence),
        ),
    };

    // Out-of-range scores fail statement validation inside `append`.
    store_and_report(label, &statement, ctx, format).await
}

async fn store_and_report(
    label: &str,
    statement: &Statement,
    ctx: &AppContext,
    format: OutputFormat,
) -> Result<()> {
    let id = ctx.store.append(statement, &ctx.call()).await?;

    match format {
        OutputFormat::Table => {
            output::print_success(&format!("{} recorded", label));
            output::print_detail("Statement", id.as_str());
            output::print_detail("Activity", &statement.object.id);
        }
        _ => output::print_item(
            &json!({ "statement_id": id, "activity": statement.object.id }),
            format,
        )?,
    }

    Ok(())
}
