//! Utilities: logging bootstrap (stderr, level from -v/-q).
//!
//! Key items:
//!   derive_level / init_logging
//!
//! Stdout carries replies (`--json`, `serve`), so log records go to stderr.

/// Logging helpers.
pub mod logging {
    use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};
    use log::LevelFilter;
    use once_cell::sync::OnceCell;

    /// Full `flexi_logger` spec (e.g. `ansible_kernel=debug`); wins over -v/-q.
    pub const ENV_LOG: &str = "ANSIBLE_KERNEL_LOG";

    static LOGGER: OnceCell<LoggerHandle> = OnceCell::new();

    pub fn derive_level(verbose: u8, quiet: bool) -> LevelFilter {
        if quiet {
            return LevelFilter::Error;
        }
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Start the stderr logger. Repeated calls are no-ops.
    pub fn init_logging(level: LevelFilter) -> Result<(), FlexiLoggerError> {
        if LOGGER.get().is_some() {
            return Ok(());
        }
        let spec = std::env::var(ENV_LOG)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| level.as_str().to_ascii_lowercase());
        let handle = Logger::try_with_str(spec)?
            .log_to_stderr()
            .format(flexi_logger::default_format)
            .start()?;
        let _ = LOGGER.set(handle);
        Ok(())
    }

}

pub use logging::{derive_level, init_logging};
