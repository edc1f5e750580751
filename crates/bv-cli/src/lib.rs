//! Command-line front end for the lowering: reads a program serialized as
//! JSON, translates it and writes the verification IR.

pub mod cli;
pub mod commands;
pub mod diagnostics;

pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum CliError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Translation error: {0}")]
        Translation(#[from] bv_core::Error),

        #[error("Invalid input: {0}")]
        InvalidInput(String),
    }

    pub type Result<T> = std::result::Result<T, CliError>;
}

pub use error::{CliError, Result};
