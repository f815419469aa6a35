use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global tracing subscriber for the command-line tool.
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at `info`, or at
/// `debug` when `verbose` is set. Output goes to stderr so stdout stays
/// reserved for command results.
pub fn init_cli_logger(verbose: bool) {
    let default_directive = if verbose { "taxo=debug" } else { "taxo=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    // A subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
