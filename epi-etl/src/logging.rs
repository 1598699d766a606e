use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console logging.
pub fn init_logging() {
    // Respect RUST_LOG if set; otherwise default to info for our crates
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("epi_etl=info,epi_core=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}
