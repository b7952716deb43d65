//! Logging setup: stderr always, plus an optional daily rolling file.

use clicktally_core::log_dir;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "clicktally=info,clicktally_core=info,clicktally_platform=info";
const VERBOSE_FILTER: &str = "clicktally=debug,clicktally_core=debug,clicktally_platform=debug";

/// Initialize logging.
///
/// `RUST_LOG` wins over `verbose`. Stdout is left to the console front-end,
/// so the console layer writes to stderr. When `log_to_file` is set, logs
/// also go to `<config dir>/logs/clicktally.log.<date>`.
pub fn setup(verbose: u8, log_to_file: bool) {
    let default = if verbose > 0 { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    let file_layer = if log_to_file {
        let dir = log_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("Warning: Failed to create log directory {:?}: {}", dir, e);
            None
        } else {
            let file_appender = RollingFileAppender::new(Rotation::DAILY, &dir, "clicktally.log");
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(file_appender)
                    .with_filter(EnvFilter::new(DEFAULT_FILTER)),
            )
        }
    } else {
        None
    };

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if log_to_file {
        tracing::info!("File logging enabled: {:?}", log_dir());
    }
}
