//! Tracing subscriber setup

use pointfinder_core::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level; `--verbose` raises the
/// configured level to `debug`.
pub fn init(config: &LoggingConfig, verbose: bool) -> anyhow::Result<()> {
    let mut config = config.clone();
    if verbose {
        config.level = "debug".to_string();
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directive()))?;

    let (writer, ansi) = match (&config.log_file, config.log_to_file) {
        (Some(path), true) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        _ if config.log_to_console => (BoxMakeWriter::new(std::io::stderr), true),
        _ => (BoxMakeWriter::new(std::io::sink), false),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false);

    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().try_init(),
        _ => builder.pretty().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}
