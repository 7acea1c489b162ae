use tracing_subscriber::EnvFilter;

/// Logging goes to stderr; stdout is reserved for command output.
///
/// `RUST_LOG` takes precedence; otherwise `-v` raises the default level from
/// warn to info to debug.
pub fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();
}
