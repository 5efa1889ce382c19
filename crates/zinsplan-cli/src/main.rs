mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use commands::zinsplan::{CalculateArgs, ScheduleArgs};

/// Interest and fee schedules for mezzanine financings
#[derive(Parser)]
#[command(
    name = "zinsplan",
    version,
    about = "Interest and fee schedules for mezzanine financings",
    long_about = "Computes the quarterly payment schedule (Zinsplan) of one or more \
                  mezzanine tranches with decimal precision: crowd interest, the \
                  arranger's residual service fee, brokerage and structuring fees, \
                  and 19% VAT on all fee components."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine diagnostics to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the full Zinsplan for all tranches
    Calculate(CalculateArgs),
    /// Print the combined payment schedule across all tranches
    Schedule(ScheduleArgs),
    /// Print the default input document as a starting point
    Template,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Calculate(args) => commands::zinsplan::run_calculate(args),
        Commands::Schedule(args) => commands::zinsplan::run_schedule(args),
        Commands::Template => commands::zinsplan::run_template(),
        Commands::Version => {
            println!("zinsplan {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
