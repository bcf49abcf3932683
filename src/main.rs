use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxcmp::core::log::{init_logging, level_for};
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Compare conversion offers from all providers
    Compare {
        /// Source currency code, e.g. USD
        from: String,
        /// Target currency code, e.g. EUR
        to: String,
        /// Amount to convert
        value: Decimal,
    },
    /// Serve the comparison API over HTTP
    Serve {
        /// Address to listen on, overrides the configured one
        #[arg(short, long)]
        bind: Option<String>,
    },
}

impl From<Commands> for fxcmp::AppCommand {
    fn from(cmd: Commands) -> fxcmp::AppCommand {
        match cmd {
            Commands::Compare { from, to, value } => fxcmp::AppCommand::Compare { from, to, value },
            Commands::Serve { bind } => fxcmp::AppCommand::Serve { bind },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let serving = matches!(cli.command, Some(Commands::Serve { .. }));
    init_logging(level_for(cli.verbose, serving));

    let result = match cli.command {
        Some(Commands::Setup) => fxcmp::cli::setup::setup(),
        Some(cmd) => fxcmp::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
