use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,ledgerlens=info";
const VERBOSE_FILTER: &str = "info,ledgerlens=debug";

/// Log to stderr; stdout is reserved for exported data.
///
/// `RUST_LOG` wins unless `verbose` is set.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
