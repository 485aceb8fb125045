use std::{convert::Infallible, fmt::Display};

use tracing::{info, warn};

use crate::{
    bringup::basic_system_init, cmdline::BootParameters, config::Layout, engine::prepare_root,
    handoff::handoff, host::Host, locate::wait_for_device, switch::switch_root, BootError,
};

/// The whole boot, from bringup to handing over to the next init.
///
/// `set_log_filter` receives the `init_log=` value, if there is one.
/// On success this never returns, so the only value it can produce is the
/// reason the machine has to restart.
pub fn run<H, F, E>(
    host: &mut H,
    layout: &Layout,
    set_log_filter: F,
) -> Result<Infallible, BootError>
where
    H: Host,
    F: FnOnce(&str) -> Result<(), E>,
    E: Display,
{
    if host.is_init() {
        basic_system_init(host)?;
    }

    let params = BootParameters::read(host, layout)?;

    if let Some(directives) = &params.init_log {
        if let Err(err) = set_log_filter(directives.as_str()) {
            warn!("Ignoring init_log={directives}: {err}");
        }
    }

    let device = params.root_device();
    wait_for_device(host, device, &layout.dev, &layout.discovery)?;

    let plan = prepare_root(host, layout, device)?;
    info!("Boot mode {:?}, new root {}", plan.mode, plan.root);

    switch_root(host, layout, plan)?;

    Err(handoff(host, layout, &params))
}
