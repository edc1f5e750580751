pub mod hierarchy;
pub mod lower;

pub use hierarchy::hierarchy_command;
pub use lower::lower_command;

use crate::{CliError, Result};
use bv_core::ast::Program;
use std::path::Path;

/// Read a program serialized as JSON.
pub fn read_program(path: &Path) -> Result<Program> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        CliError::InvalidInput(format!("{} is not a valid program: {}", path.display(), e))
    })
}

/// Write `text` to `output`, or to stdout when no path is given.
pub fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, text)?;
            tracing::info!("wrote {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
