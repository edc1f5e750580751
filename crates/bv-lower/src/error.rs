use bv_core::error::Error;
use bv_core::span::Span;

/// Construct kind rejected by the lowering, reported with its position.
pub fn unsupported_construct(kind: &'static str, span: Span, message: impl Into<String>) -> Error {
    Error::unsupported(kind, span, message)
}

/// Internal invariant violated by the input.
pub fn inconsistent_state(message: impl Into<String>) -> Error {
    Error::inconsistent(message)
}

/// Return early with a lowering error
#[macro_export]
macro_rules! lower_bail {
    ($message:expr) => {
        return Err($crate::error::inconsistent_state($message))
    };
    ($kind:expr, $span:expr, $message:expr) => {
        return Err($crate::error::unsupported_construct($kind, $span, $message))
    };
}

/// Ensure a condition holds, or return a lowering error
#[macro_export]
macro_rules! lower_ensure {
    ($cond:expr, $message:expr) => {
        if !($cond) {
            $crate::lower_bail!($message);
        }
    };
    ($cond:expr, $kind:expr, $span:expr, $message:expr) => {
        if !($cond) {
            $crate::lower_bail!($kind, $span, $message);
        }
    };
}
