//! `bvt hierarchy`: dump the subtype index, or the overrides of one method.

use crate::cli::CliConfig;
use crate::{CliError, Result};
use bv_core::ast::MethodRef;
use bv_lower::{OverrideResolver, SubtypeIndex, TypeTable};
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Args)]
pub struct HierarchyArgs {
    /// Program serialized as JSON
    pub input: PathBuf,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Resolve the overrides of `Type.Method` (parameterless) instead
    #[arg(long)]
    pub method: Option<String>,
}

pub fn hierarchy_command(args: HierarchyArgs, _config: &CliConfig) -> Result<()> {
    let program = super::read_program(&args.input)?;
    let types = TypeTable::new(&program);
    let index = SubtypeIndex::from_table(&program, &types);

    let json = match &args.method {
        None => serde_json::to_string_pretty(&index),
        Some(method) => {
            let Some((ty, name)) = method.rsplit_once('.') else {
                return Err(CliError::InvalidInput(format!(
                    "expected `Type.Method`, got `{}`",
                    method
                )));
            };
            let overrides = OverrideResolver::new(&index, &types)
                .resolve(&MethodRef::new(ty, name, Vec::new()))?;
            let overrides: Vec<(String, String)> = overrides
                .iter()
                .map(|(ty, method)| (ty.to_string(), method.signature()))
                .collect();
            serde_json::to_string_pretty(&overrides)
        }
    }
    .map_err(|e| CliError::InvalidInput(format!("cannot serialize output: {}", e)))?;
    super::write_output(args.output.as_deref(), &format!("{}\n", json))
}
