use tracing_subscriber::EnvFilter;

/// Log to stderr so stdout stays clean for `--format json`.
/// `RUST_LOG` wins over the default `info` filter.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let res = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = res {
        eprintln!("warning: logging already initialised: {e}");
    }
}
