use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "SLASHDOT_LOG";

/// Installs a file logger when `SLASHDOT_LOG` holds a filter such as
/// `slashdot_tui=debug`. The terminal is in raw mode while the UI runs, so
/// events never go to stderr. Returns the log file path when enabled.
pub fn init() -> Result<Option<PathBuf>> {
    let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) else {
        return Ok(None);
    };

    let path = log_path().context("logging: resolve log directory")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("logging: create directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("logging: open {}", path.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("logging: install subscriber")?;

    Ok(Some(path))
}

fn log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("slashdot-tui").join("slashdot-tui.log"))
}
