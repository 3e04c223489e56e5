//! Telemetry helpers for applications embedding `chart-binding`.
//!
//! Bindings emit `tracing` events for handle creation/removal, subscription
//! churn and deferred task execution. Hosts either call one of the init
//! helpers below or wire their own subscriber.

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "chart_binding=info";

/// Installs a compact subscriber honoring `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`].
///
/// Returns `false` when the `telemetry` feature is off or a global subscriber
/// is already installed.
#[must_use]
pub fn init_default_tracing() -> bool {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_owned());
    init_tracing_with_filter(&directives)
}

/// Installs a compact subscriber for the given filter directives, e.g.
/// `"chart_binding::api::tooltip=trace"` to follow tooltip restyles.
#[must_use]
pub fn init_tracing_with_filter(directives: &str) -> bool {
    #[cfg(feature = "telemetry")]
    {
        let Ok(filter) = tracing_subscriber::EnvFilter::try_new(directives) else {
            return false;
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok()
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = directives;
        false
    }
}
