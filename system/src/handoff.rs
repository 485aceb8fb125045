use tracing::info;

use crate::{cmdline::BootParameters, config::Layout, host::Host, BootError};

/// Replaces the process with the next init. Only returns when that failed.
pub fn handoff<H: Host>(host: &mut H, layout: &Layout, params: &BootParameters) -> BootError {
    let (program, arg0) = match params.init() {
        Some(init) => (init, init.as_str()),
        None => (layout.default_init.as_path(), "init"),
    };

    info!("Starting {program}");
    let errno = host.exec(program, &[arg0]);

    BootError::handoff(program.as_str(), errno)
}
