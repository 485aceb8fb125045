use camino::Utf8Path;
use tracing::{debug, warn};

use crate::{config::Discovery, host::Host, BootError};

/// Polls until `device` exists, then waits for it to settle.
///
/// When the attempts run out the content of `dev` is logged and
/// [`BootError::DeviceTimeout`] is returned.
pub fn wait_for_device<H: Host>(
    host: &mut H,
    device: &Utf8Path,
    dev: &Utf8Path,
    policy: &Discovery,
) -> Result<(), BootError> {
    for attempt in 0..policy.attempts {
        if host.exists(device) {
            debug!("Device {device} present after {attempt} attempts");
            host.sleep(policy.settle);

            return Ok(());
        }

        host.sleep(policy.interval);
    }

    warn!("Timeout. Device {device} not found");
    warn!("Devices found:");

    match host.list_dir(dev) {
        Ok(names) => {
            for name in names {
                warn!("    {name}");
            }
        }
        Err(err) => warn!("Unable to list {dev}: {err}"),
    }

    Err(BootError::DeviceTimeout {
        device: device.to_string(),
        attempts: policy.attempts,
    })
}
