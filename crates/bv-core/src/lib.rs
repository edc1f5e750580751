#[macro_use]
pub mod macros;

pub mod ast;
pub mod collections;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pretty;
pub mod span;
pub mod vir;

// Re-export commonly used items for convenience
pub use tracing;

pub use config::TranslationOptions;

// Alias for error types
pub type Error = crate::error::Error;
pub type Result<T> = crate::error::Result<T>;
