use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sends diagnostics to stderr so stdout only carries results. `RUST_LOG`
/// overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("tracing subscriber already installed");
    }
}
