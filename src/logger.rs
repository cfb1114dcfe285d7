use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug` with `verbose`, else `info`.
/// Logs go to stderr so they never mix with CLI output on stdout.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();
}
