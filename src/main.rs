use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxrate::core::log::init_logging;

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
    /// Display exchange rates from one currency to others
    Rate {
        /// Currency code to convert from, e.g. EUR
        from: String,
        /// One or more currency codes to convert to
        #[arg(required = true)]
        to: Vec<String>,
    },
    /// Convert an amount from one currency to others
    Convert {
        amount: f64,
        /// Currency code to convert from, e.g. EUR
        from: String,
        /// One or more currency codes to convert to
        #[arg(required = true)]
        to: Vec<String>,
    },
}

impl From<Commands> for fxrate::AppCommand {
    fn from(cmd: Commands) -> fxrate::AppCommand {
        match cmd {
            Commands::Rate { from, to } => fxrate::AppCommand::Rate { from, to },
            Commands::Convert { amount, from, to } => {
                fxrate::AppCommand::Convert { amount, from, to }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxrate::cli::setup::setup(),
        Some(cmd) => fxrate::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
