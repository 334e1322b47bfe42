//! Observability infrastructure for wharf.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors for consistent
//! observability across all wharf components.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `wharf_assets=debug`)
///
/// # Example
///
/// ```rust
/// use wharf_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for reconcile operations with standard fields.
///
/// # Example
///
/// ```rust
/// use wharf_core::observability::reconcile_span;
///
/// let span = reconcile_span("on_pending", "default", "docs-bundle");
/// let _guard = span.enter();
/// // ... run the reconcile branch
/// ```
#[must_use]
pub fn reconcile_span(operation: &str, namespace: &str, name: &str) -> Span {
    tracing::info_span!(
        "reconcile",
        op = operation,
        namespace = namespace,
        name = name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Json);
    }

    #[test]
    fn reconcile_span_can_be_entered() {
        let span = reconcile_span("on_ready", "default", "a1");
        let _guard = span.enter();
    }
}
