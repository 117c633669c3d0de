use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "carfinder=info,warn";

/// Installs the stderr log subscriber. `debug` overrides `RUST_LOG`.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("carfinder=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
