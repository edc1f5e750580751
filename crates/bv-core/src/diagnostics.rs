use crate::error::Error;
use crate::span::Span;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

#[derive(Clone)]
pub struct Diagnostic<T = String>
where
    T: Clone + Display,
{
    pub level: DiagnosticLevel,
    pub message: T,
    pub span: Option<Span>,
    pub suggestions: Vec<String>,
    pub source_context: Option<String>,
    pub code: Option<String>,
}

impl<T> Diagnostic<T>
where
    T: Clone + Display,
{
    pub fn error(message: T) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            message,
            span: None,
            suggestions: Vec::new(),
            source_context: None,
            code: None,
        }
    }

    pub fn warning(message: T) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message,
            span: None,
            suggestions: Vec::new(),
            source_context: None,
            code: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_source_context(mut self, context: impl Into<String>) -> Self {
        self.source_context = Some(context.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl Diagnostic<String> {
    /// Turn a translation failure into a diagnostic attributed to `context`
    /// (usually the procedure being lowered).
    pub fn from_error(error: &Error, context: impl Into<String>) -> Self {
        let mut diagnostic = Diagnostic::error(error.to_string())
            .with_code(error.code())
            .with_source_context(context);
        if let Some(span) = error.span() {
            diagnostic = diagnostic.with_span(span);
        }
        if let Error::UnsupportedConstruct { .. } = error {
            diagnostic = diagnostic.with_suggestion(
                "rewrite loops and break/continue into labels and gotos before lowering",
            );
        }
        diagnostic
    }
}

impl<T> std::fmt::Debug for Diagnostic<T>
where
    T: Clone + Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostic")
            .field("level", &self.level)
            .field("message", &self.message.to_string())
            .field("span", &self.span)
            .field("suggestions", &self.suggestions)
            .field("source_context", &self.source_context)
            .field("code", &self.code)
            .finish()
    }
}

impl<T> Display for Diagnostic<T>
where
    T: Clone + Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }

        if !self.suggestions.is_empty() {
            let hints = self.suggestions.join("; ");
            write!(f, " (hints: {})", hints)?;
        }

        Ok(())
    }
}

/// Thread-safe sink for diagnostics produced while translating a program.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticManager {
    diagnostics: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_diagnostic(&self, diagnostic: Diagnostic) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(diagnostic);
        }
    }

    pub fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .lock()
            .map(|d| d.iter().any(|diag| diag.level == DiagnosticLevel::Error))
            .unwrap_or(false)
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|mut d| std::mem::take(&mut *d))
            .unwrap_or_default()
    }
}

/// Render a diagnostic as plain text lines, `fallback_context` naming the
/// stage when the diagnostic carries no context of its own.
pub fn render_plain<M>(diagnostic: &Diagnostic<M>, fallback_context: &str) -> Vec<String>
where
    M: Clone + Display,
{
    let context = diagnostic
        .source_context
        .as_deref()
        .unwrap_or(fallback_context);
    let level = match diagnostic.level {
        DiagnosticLevel::Error => "ERROR",
        DiagnosticLevel::Warning => "WARNING",
        DiagnosticLevel::Info => "INFO",
    };

    let header = match diagnostic.code.as_ref() {
        Some(code) => format!("[{}] {}: {} ({})", context, level, diagnostic.message, code),
        None => format!("[{}] {}: {}", context, level, diagnostic.message),
    };

    let mut lines = vec![header];

    if let Some(span) = &diagnostic.span {
        lines.push(format!("   at {}", span));
    }

    for suggestion in &diagnostic.suggestions {
        lines.push(format!("   suggestion: {}", suggestion));
    }

    lines
}
