//! First steps of PID 1: a sane process environment plus `/proc` and `/sys`,
//! without them the root device cannot be found.

use camino::Utf8Path;
use tracing::{debug, warn};

use crate::{
    error::OrFatal,
    host::{Host, PROC, SYSFS},
    BootError,
};

const ENVIRONMENT: &[(&str, &str)] = &[
    ("HOME", "/"),
    ("TERM", "linux"),
    ("SHELL", "/bin/sh"),
    ("USER", "root"),
];

const SYSRQ: &str = "/proc/sys/kernel/sysrq";

pub fn basic_system_init<H: Host>(host: &mut H) -> Result<(), BootError> {
    if let Err(err) = host.chdir(Utf8Path::new("/")) {
        warn!("chdir / failed: {err}");
    }

    if let Err(err) = host.setsid() {
        debug!("setsid failed: {err}");
    }

    for (key, value) in ENVIRONMENT {
        host.set_env(key, value);
    }

    for fs in [PROC, SYSFS] {
        host.mount(&fs.mount())
            .or_fatal(format!("mount {} on {}", fs.fstype, fs.target))?;
    }

    // Nice to have only
    if let Err(err) = host.write_file(Utf8Path::new(SYSRQ), b"1\n") {
        debug!("Unable to enable sysrq: {err}");
    }

    Ok(())
}
