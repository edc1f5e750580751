/// Return early with an `UnsupportedConstruct` error for the given kind and span
#[macro_export]
macro_rules! unsupported {
    ($kind:expr, $span:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::unsupported($kind, $span, format!($($arg)*)))
    };
}

/// Log a debug message
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::tracing::debug!($($arg)*)
    };
}
