use bv_core::diagnostics::{render_plain, Diagnostic, DiagnosticLevel};

use crate::CliError;

/// Log every diagnostic of a translation, one line per rendered row.
pub fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        for line in render_plain(diagnostic, "lower") {
            match diagnostic.level {
                DiagnosticLevel::Error => tracing::error!("{}", line),
                DiagnosticLevel::Warning => tracing::warn!("{}", line),
                DiagnosticLevel::Info => tracing::info!("{}", line),
            }
        }
    }
}

/// Render a failed command. Returns false when the error has no richer form
/// than its message.
pub fn render_cli_error(error: &CliError) -> bool {
    match error {
        CliError::Translation(inner) => {
            let diagnostic = Diagnostic::from_error(inner, "lower");
            report_diagnostics(std::slice::from_ref(&diagnostic));
            true
        }
        _ => false,
    }
}
