use atty::Stream;
use std::io;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Build the stderr subscriber for one run
///
/// `RUST_LOG` wins over `level` unless `level` is ERROR (--silent).
///
/// # Arguments
/// * `level` - Minimum level selected on the command line
///
/// # Returns
/// * `impl tracing::Subscriber` - Subscriber to install with `with_default`
pub fn subscriber(level: Level) -> impl tracing::Subscriber + Send + Sync {
    let filter = if level == Level::ERROR {
        EnvFilter::new(level.as_str().to_lowercase())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(atty::is(Stream::Stderr))
        .with_writer(io::stderr)
        .finish()
}
