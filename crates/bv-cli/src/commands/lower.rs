//! `bvt lower`: translate a whole program into verification IR.

use crate::cli::{CliConfig, OutputFormat};
use crate::diagnostics::report_diagnostics;
use crate::{CliError, Result};
use bv_core::pretty::{pretty, PrettyOptions};
use bv_core::TranslationOptions;
use bv_lower::{FailurePolicy, WholeProgramTranslator};
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Args)]
pub struct LowerArgs {
    /// Program serialized as JSON
    pub input: PathBuf,
    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
    /// 0 assumes no exception ever escapes
    #[arg(long)]
    pub model_exceptions: Option<u8>,
    /// Number marks into every branch of a conditional
    #[arg(long)]
    pub instrument_branches: bool,
    /// Downgrade asserts to assumes
    #[arg(long)]
    pub get_me_here: bool,
    /// Record initialized locals, returned values and exceptions
    #[arg(long)]
    pub record_values: bool,
    #[arg(long)]
    pub capture_state: bool,
    /// Assert source file and line before every statement
    #[arg(long)]
    pub source_context: bool,
    /// Worker threads
    #[arg(short, long)]
    pub jobs: Option<usize>,
    /// Leave failing procedures out instead of aborting
    #[arg(long)]
    pub skip_failures: bool,
}

impl LowerArgs {
    /// Flags only ever switch options on; the configuration supplies the rest.
    pub fn options(&self, config: &CliConfig) -> TranslationOptions {
        let mut options = config.translation.clone();
        if let Some(level) = self.model_exceptions {
            options.model_exceptions = level;
        }
        if let Some(jobs) = self.jobs {
            options.jobs = jobs;
        }
        options.instrument_branches |= self.instrument_branches;
        options.get_me_here |= self.get_me_here;
        options.record_values |= self.record_values;
        options.capture_state |= self.capture_state;
        options.emit_source_context |= self.source_context;
        options
    }
}

pub fn lower_command(args: LowerArgs, config: &CliConfig) -> Result<()> {
    let program = super::read_program(&args.input)?;
    let options = args.options(config);
    let policy = if args.skip_failures || config.output.skip_failures {
        FailurePolicy::Skip
    } else {
        FailurePolicy::Abort
    };

    let translation = WholeProgramTranslator::new(&options)
        .with_policy(policy)
        .translate(&program)?;
    report_diagnostics(&translation.diagnostics);
    if !translation.skipped.is_empty() {
        tracing::warn!(
            "{} procedures skipped: {}",
            translation.skipped.len(),
            translation.skipped.join(", ")
        );
    }

    let text = match args.format.unwrap_or(config.output.format) {
        OutputFormat::Pretty => pretty(&translation.program, PrettyOptions::default()).to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(&translation.program)
            .map_err(|e| CliError::InvalidInput(format!("cannot serialize output: {}", e)))?,
    };
    super::write_output(args.output.as_deref(), &text)
}
