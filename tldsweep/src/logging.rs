use tracing_subscriber::{fmt, EnvFilter};

/// Diagnostics go to stderr so stdout only carries results. `RUST_LOG`
/// overrides the default level.
pub fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
