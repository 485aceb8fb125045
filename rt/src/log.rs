//! Console logging.
//!
//! Messages go to stdout, which is the kernel console for the first process.
//! The filter sits behind a reload layer so the level can be changed after the
//! kernel command line has been read.

use tracing::warn;
use tracing_subscriber::{
    filter::ParseError, fmt, prelude::*, reload, EnvFilter, Registry,
};

/// Handle to the installed filter.
pub struct Verbosity {
    handle: reload::Handle<EnvFilter, Registry>,
}

/// Installs the console subscriber with `default` as the initial filter.
pub fn init(default: &str) -> Verbosity {
    let filter = EnvFilter::try_new(default).unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_timer(fmt::time::uptime()),
        )
        .init();

    Verbosity { handle }
}

impl Verbosity {
    /// Replaces the active filter with `directives` (`EnvFilter` syntax).
    pub fn set(&self, directives: &str) -> Result<(), ParseError> {
        let filter = EnvFilter::try_new(directives)?;

        if let Err(err) = self.handle.reload(filter) {
            warn!("Unable to apply log filter {directives}: {err}");
        }

        Ok(())
    }
}
