//! Oven Order CLI - Database migrations and reference data.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! oo-cli migrate
//!
//! # Insert reference data and the item catalog (idempotent)
//! oo-cli seed
//!
//! # Both, in order
//! oo-cli setup
//! ```
//!
//! All commands read `DATABASE_URL` from the environment or `.env`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "oo-cli")]
#[command(author, version, about = "Oven Order CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed delivery methods, payment methods, order statuses and items
    Seed,
    /// Run migrations, then seed
    Setup,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let pool = commands::connect().await?;
    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::Seed => commands::seed::run(&pool).await?,
        Commands::Setup => {
            commands::migrate::run(&pool).await?;
            commands::seed::run(&pool).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_subcommands() {
        assert!(matches!(
            Cli::try_parse_from(["oo-cli", "migrate"]).map(|cli| cli.command),
            Ok(Commands::Migrate)
        ));
        assert!(matches!(
            Cli::try_parse_from(["oo-cli", "seed"]).map(|cli| cli.command),
            Ok(Commands::Seed)
        ));
        assert!(Cli::try_parse_from(["oo-cli", "admin"]).is_err());
    }
}
