use camino::Utf8Path;
use rustix::fs::Mode;
use tracing::{debug, info, warn};

use crate::{
    config::Layout,
    engine::MountPlan,
    error::OrFatal,
    host::{Host, PseudoFs, PROC, SYSFS},
    BootError,
};

/// Mounted inside the new root once it is in place, in this order.
pub const POST_SWITCH_MOUNTS: &[PseudoFs] = &[
    PROC,
    SYSFS,
    PseudoFs {
        source: "ramfs",
        target: "/tmp",
        fstype: "ramfs",
        data: "size=8388608,mode=1777",
        create: false,
    },
    PseudoFs {
        source: "devpts",
        target: "/dev/pts",
        fstype: "devpts",
        data: "",
        create: true,
    },
    PseudoFs {
        source: "shm",
        target: "/dev/shm",
        fstype: "ramfs",
        data: "",
        create: true,
    },
];

/// Makes `plan.root` the root of the process tree and gives it the pseudo
/// filesystems the next init expects. There is no way back from here.
pub fn switch_root<H: Host>(
    host: &mut H,
    layout: &Layout,
    plan: MountPlan,
) -> Result<(), BootError> {
    let put_old = plan.root.join(&layout.old_root);

    info!("Setup new root mount");
    host.pivot_root(&plan.root, &put_old)
        .or_fatal(format!("pivot_root {} {put_old}", plan.root))?;

    if let Err(err) = host.chdir(Utf8Path::new("/")) {
        warn!("chdir / failed after pivot: {err}");
    }

    // Device nodes created so far stay valid, the whole mount moves along
    let old_dev = layout
        .old_root_after_pivot()
        .join(layout.dev.as_str().trim_start_matches('/'));
    host.move_mount(&old_dev, &layout.dev)
        .or_fatal(format!("Mount move {old_dev} to {}", layout.dev))?;

    for fs in POST_SWITCH_MOUNTS {
        if fs.create {
            if let Err(err) = host.mkdir(Utf8Path::new(fs.target), Mode::from_raw_mode(0o755)) {
                debug!("mkdir {} failed: {err}", fs.target);
            }
        }

        host.mount(&fs.mount())
            .or_fatal(format!("mount {} on {}", fs.fstype, fs.target))?;
    }

    Ok(())
}
