//! Learnlog CLI - record learner activity statements and read projections.
//!
//! Provides project, progress, statement, record, and seed commands against a
//! configured Learning Record Store.

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use learnlog_core::LearnlogError;

use commands::{progress, project, record, seed, statement};
use context::AppContext;
use output::OutputFormat;

/// Learnlog - learner activity statements
#[derive(Parser)]
#[command(
    name = "learnlog",
    version,
    about = "Learnlog - learner activity statements",
    long_about = "Record language-project, AI-tool, prompt and achievement statements in a \
                  Learning Record Store, and read project and learning-outcome views back.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Configuration file (TOML); LEARNLOG__* environment variables override it
    #[arg(short, long, global = true, env = "LEARNLOG_CONFIG")]
    config: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Language project operations
    #[command(subcommand)]
    Project(project::ProjectCommands),

    /// Show learning-outcome progress
    Progress(progress::ProgressArgs),

    /// Statement lookup
    #[command(subcommand)]
    Statement(statement::StatementCommands),

    /// Record tool usage, prompts and achievements
    #[command(subcommand)]
    Record(record::RecordCommands),

    /// Record the platform launch statement for learners
    Seed(seed::SeedArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let format = cli.output;
    let result = match AppContext::load(cli.config.as_deref()) {
        Ok(ctx) => match cli.command {
            Commands::Project(cmd) => project::execute(cmd, &ctx, format).await,
            Commands::Progress(args) => progress::execute(args, &ctx, format).await,
            Commands::Statement(cmd) => statement::execute(cmd, &ctx, format).await,
            Commands::Record(cmd) => record::execute(cmd, &ctx, format).await,
            Commands::Seed(args) => seed::execute(args, &ctx, format).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        if let Some(err) = e.downcast_ref::<LearnlogError>() {
            err.log();
        }
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
