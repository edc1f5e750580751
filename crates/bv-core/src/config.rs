use serde::{Deserialize, Serialize};

fn env_true(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|val| {
        let trimmed = val.trim();
        !trimmed.is_empty() && !matches!(trimmed, "0" | "false" | "FALSE" | "False")
    })
}

fn env_u8(key: &str) -> Option<u8> {
    std::env::var(key).ok().and_then(|val| val.trim().parse().ok())
}

/// Global switches recognized by the lowering. They are read-only inputs;
/// nothing in the core mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TranslationOptions {
    /// 0 statically assumes no exception escapes (`throw` becomes `assume false`
    /// and no region bookkeeping is emitted); anything else models unwinding.
    pub model_exceptions: u8,
    /// Emit a uniquely numbered breadcrumb into each branch of a conditional.
    pub instrument_branches: bool,
    /// Downgrade asserts to assumes.
    pub get_me_here: bool,
    /// Emit `$Record` calls for initialized locals, returned values and exceptions.
    pub record_values: bool,
    /// Emit a `captureState` assumption before every statement.
    pub capture_state: bool,
    /// Emit `sourceFile`/`sourceLine` assertions for statements with a known position.
    pub emit_source_context: bool,
    /// Number of worker threads used by the whole-program driver.
    pub jobs: usize,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            model_exceptions: 1,
            instrument_branches: false,
            get_me_here: false,
            record_values: false,
            capture_state: false,
            emit_source_context: false,
            jobs: 1,
        }
    }
}

impl TranslationOptions {
    pub fn models_exceptions(&self) -> bool {
        self.model_exceptions != 0
    }

    /// Apply `BV_MODEL_EXCEPTIONS`, `BV_INSTRUMENT_BRANCHES` and `BV_GET_ME_HERE`
    /// on top of the current values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(level) = env_u8("BV_MODEL_EXCEPTIONS") {
            debug!("BV_MODEL_EXCEPTIONS overrides model_exceptions to {}", level);
            self.model_exceptions = level;
        }
        if let Some(flag) = env_true("BV_INSTRUMENT_BRANCHES") {
            self.instrument_branches = flag;
        }
        if let Some(flag) = env_true("BV_GET_ME_HERE") {
            self.get_me_here = flag;
        }
        self
    }
}
