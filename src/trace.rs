//! Feature-gated logging macros for the search pipeline.
//!
//! With the `tracing` feature each stage opens an info span and reports its
//! counts as events; recovered stage failures are reported at warn level.
//! Without the feature every macro expands to nothing observable, so the
//! engine never installs or requires a global logger.

/// Opens an info-level span around one pipeline stage.
///
/// Use as `let _span = trace_span!("stage", key = value).entered();`.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

/// Reports stage counts as an info-level event.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
    ($name:expr) => {
        tracing::info!(name: $name)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
    ($name:expr) => {};
}

/// Reports a recovered stage failure at warn level.
///
/// Takes a format string; without the `tracing` feature the message is
/// never formatted.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)+) => {
        tracing::warn!($($arg)+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)+) => {
        let _ = || format!($($arg)+);
    };
}

pub(crate) use trace_event;
pub(crate) use trace_span;
pub(crate) use trace_warn;

/// Stand-in span guard used when the `tracing` feature is disabled.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Mirrors `tracing::Span::entered`.
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
