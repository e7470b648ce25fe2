//! Learning outcome progress command.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use learnlog_core::projection::OutcomeProgress;
use learnlog_core::statement::{LanguageMap, LearningOutcome};

use crate::context::{AppContext, LearnerArgs};
use crate::output::{self, or_dash, OutputFormat};

#[derive(Args)]
pub struct ProgressArgs {
    #[command(flatten)]
    learner: LearnerArgs,
}

/// One outcome with its catalogue text in the configured language.
#[derive(Serialize)]
struct OutcomeEntry {
    outcome: LearningOutcome,
    name: String,
    description: String,
    score: f64,
    timestamp: Option<DateTime<Utc>>,
    evidence: Option<String>,
}

impl OutcomeEntry {
    fn new(outcome: LearningOutcome, progress: &OutcomeProgress, language: &str) -> Self {
        Self {
            outcome,
            name: localized(&outcome.name(), language)
                .unwrap_or_else(|| outcome.title().to_string()),
            description: localized(&outcome.description(), language).unwrap_or_default(),
            score: progress.score,
            timestamp: progress.timestamp,
            evidence: progress.evidence.clone(),
        }
    }
}

/// Text for `language`, falling back to en-US.
fn localized(map: &LanguageMap, language: &str) -> Option<String> {
    map.get(language).or_else(|| map.get("en-US")).cloned()
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Achieved")]
    achieved: String,
    #[tabled(rename = "Evidence")]
    evidence: String,
}

impl From<&OutcomeEntry> for OutcomeRow {
    fn from(entry: &OutcomeEntry) -> Self {
        Self {
            outcome: entry.outcome.slug().to_string(),
            name: entry.name.clone(),
            score: format!("{:.0}", entry.score),
            achieved: entry
                .timestamp
                .as_ref()
                .map(output::format_time)
                .unwrap_or_else(|| "-".to_string()),
            evidence: or_dash(entry.evidence.as_deref()),
        }
    }
}

pub async fn execute(args: ProgressArgs, ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let actor = args.learner.actor(&ctx.builder);
    let report = ctx.engine.project_progress_for(&actor, &ctx.call()).await?;

    let language = ctx.config.vocabulary.language.as_str();
    let entries: Vec<OutcomeEntry> = report
        .iter()
        .map(|(outcome, progress)| OutcomeEntry::new(outcome, progress, language))
        .collect();

    if let OutputFormat::Table = format {
        output::print_header(&format!("Progress: {}", actor));
    }

    let rows: Vec<OutcomeRow> = entries.iter().map(OutcomeRow::from).collect();
    output::print_list(&rows, &entries, format)?;

    if let OutputFormat::Table = format {
        let achieved = report.iter().filter(|(_, p)| p.is_achieved()).count();
        output::print_info(&format!("{} of {} outcomes achieved", achieved, report.len()));
    }

    Ok(())
}
