//! Raw statement lookup.

use anyhow::Result;
use clap::Subcommand;

use learnlog_core::statement::StatementId;
use learnlog_core::store::StatementStore;

use crate::context::AppContext;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum StatementCommands {
    /// Fetch one statement by ID
    Get {
        /// Statement ID
        id: String,
    },
}

pub async fn execute(cmd: StatementCommands, ctx: &AppContext, format: OutputFormat) -> Result<()> {
    match cmd {
        StatementCommands::Get { id } => {
            let statement = ctx
                .store
                .get_by_id(&StatementId::from(id), &ctx.call())
                .await?;
            output::print_item(&statement, format)?;
        }
    }

    Ok(())
}
