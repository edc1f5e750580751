//! `bvt`: lower exception-bearing object-oriented programs into verification IR.
//!
//! ```bash
//! # Translate a program, printing Boogie-like text
//! bvt lower program.json
//!
//! # Four workers, JSON output, keep going past unsupported procedures
//! bvt lower program.json -j 4 --format json --skip-failures -o out.json
//!
//! # Show which types override `Shape.Area`
//! bvt hierarchy program.json --method Shape.Area
//! ```

use bv_cli::{
    cli::CliConfig,
    commands::{self, hierarchy::HierarchyArgs, lower::LowerArgs},
    diagnostics::render_cli_error,
    Result,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "bvt",
    version = env!("CARGO_PKG_VERSION"),
    about = "Lower structured programs with exceptions and virtual calls into verification IR"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level (overrides --verbose/--quiet)
    #[arg(long, global = true, value_enum)]
    log: Option<LogLevel>,

    /// Set log output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a program into verification IR
    Lower(LowerArgs),

    /// Print the subtype index or the overrides of a method
    Hierarchy(HierarchyArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet, cli.log, cli.log_format);

    let config = CliConfig::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Lower(args) => commands::lower_command(args, &config),
        Commands::Hierarchy(args) => commands::hierarchy_command(args, &config),
    };

    match result {
        Ok(()) => {
            if cli.verbose > 0 {
                info!("Command completed successfully");
            }
            Ok(())
        }
        Err(e) => {
            use tracing::error;
            if !render_cli_error(&e) {
                error!("{}", e);
            }
            std::process::exit(1);
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool, log_level: Option<LogLevel>, log_format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if let Some(level) = log_level {
        EnvFilter::new(match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    } else if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // logs go to stderr so that stdout carries only the translated program
    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true);

    match log_format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(formatter)
                .with(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(formatter.json())
                .with(filter)
                .init();
        }
    }
}
