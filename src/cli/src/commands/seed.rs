//! Seed the store with platform launch statements for a set of learners.

use anyhow::Result;
use clap::Args;
use tabled::Tabled;

use learnlog_core::statement::{Learner, Statement};
use learnlog_core::store::StatementStore;

use crate::context::AppContext;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct SeedArgs {
    /// Learner account name (repeatable)
    #[arg(short, long = "learner", required = true)]
    learners: Vec<String>,

    /// Role recorded for every seeded learner
    #[arg(long, default_value = "student")]
    role: String,
}

#[derive(Tabled)]
struct SeedRow {
    #[tabled(rename = "Learner")]
    learner: String,
    #[tabled(rename = "Statement")]
    statement_id: String,
}

pub async fn execute(args: SeedArgs, ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let batch: Vec<Statement> = args
        .learners
        .iter()
        .map(|id| ctx.builder.build_platform_launch_event(&Learner::new(id, id, &args.role)))
        .collect();

    // One batch: the store keeps all of them or none.
    let ids = ctx.store.append_batch(&batch, &ctx.call()).await?;

    let rows: Vec<SeedRow> = args
        .learners
        .iter()
        .zip(&ids)
        .map(|(learner, id)| SeedRow {
            learner: learner.clone(),
            statement_id: id.to_string(),
        })
        .collect();

    if let OutputFormat::Table = format {
        output::print_success(&format!("Seeded {} learners", ids.len()));
    }
    output::print_list(&rows, &ids, format)
}
