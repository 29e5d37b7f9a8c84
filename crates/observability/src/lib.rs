use tracing_subscriber::{EnvFilter, fmt};

/// Installs the process-wide subscriber. `default_filter` applies when
/// `RUST_LOG` is unset or unparsable. Later calls are no-ops.
pub fn init_tracing(service_name: &str, default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_target(false)
        .with_env_filter(env_filter)
        .compact()
        .try_init();

    tracing::info!(service = service_name, "tracing initialized");
}
