use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::errors::CliError;

pub const LOG_ENV: &str = "GLOWGUIDE_LOG";
pub const LOG_FILE: &str = "glowguide.log";

fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }))
}

/// The TUI owns the terminal, so its logs go to a file in the data dir.
pub fn init_file(data_dir: &Path, debug: bool) -> Result<(), CliError> {
    fs::create_dir_all(data_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join(LOG_FILE))?;
    let _ = tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();
    Ok(())
}

/// Headless commands stay silent unless asked to be chatty.
pub fn init_stderr(verbose: bool, debug: bool) {
    if !verbose && !debug {
        return;
    }
    let _ = tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
