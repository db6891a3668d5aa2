//! Petshop CLI - Database migrations and rule inspection.
//!
//! # Usage
//!
//! ```bash
//! # Run admin database migrations
//! petshop-cli migrate
//!
//! # Derived status of scheduled promos
//! petshop-cli rules status promos --status scheduled
//!
//! # Show a discount with its targets and eligibility
//! petshop-cli rules show discount 7
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `rules status` - Rules of one kind with their derived status
//! - `rules show` - One rule as JSON

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use petshop_core::{RuleId, RuleKind, RuleStatus};

mod commands;

#[derive(Parser)]
#[command(name = "petshop-cli")]
#[command(author, version, about = "Petshop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run admin database migrations
    Migrate,
    /// Inspect marketing rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
}

#[derive(Subcommand)]
enum RulesAction {
    /// Derived status of each rule of one kind, newest first
    Status {
        /// Rule kind (`discount`, `free_shipping`, `banner`, `promo`)
        #[arg(value_parser = commands::rules::parse_kind)]
        kind: RuleKind,

        /// Only rules with this status (`scheduled`, `active`, `expired`)
        #[arg(short, long)]
        status: Option<RuleStatus>,

        /// Maximum number of rules to report
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
    /// Show one rule with its targets and eligibility
    Show {
        /// Rule kind (`discount`, `free_shipping`, `banner`, `promo`)
        #[arg(value_parser = commands::rules::parse_kind)]
        kind: RuleKind,

        /// Rule ID
        id: RuleId,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::admin().await?,
        Commands::Rules { action } => match action {
            RulesAction::Status {
                kind,
                status,
                limit,
            } => commands::rules::status(kind, status, limit).await?,
            RulesAction::Show { kind, id } => commands::rules::show(kind, id).await?,
        },
    }
    Ok(())
}
