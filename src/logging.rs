use tracing_subscriber::EnvFilter;

/// Installs the process logger.
///
/// Standard output is reserved for the single JSON document the host parses, so
/// every log line goes to stderr. Without `verbose` only warnings and errors are
/// shown.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::new(format!("{level},ort=warn"));
    // A second init (tests spawning pipelines in-process) is not an error worth reporting.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .try_init();
}
