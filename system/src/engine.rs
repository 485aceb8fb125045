//! Boot mode decision.
//!
//! The candidate device is mounted on the staging point and inspected for the
//! verified boot artifacts. With both present the image is opened through
//! dm-verity and mounted read only, with neither present it is attached to a
//! loop device and mounted as is. Anything in between is refused. The two
//! paths never mix: a verified image that fails to mount does not fall back.

use camino::{Utf8Path, Utf8PathBuf};
use rustix::mount::MountFlags;
use tracing::{debug, info, trace};

use crate::{
    config::{Layout, HASH_FILE, IMAGE_FILE, ROOT_HASH_FILE},
    error::OrFatal,
    host::{Host, Mount},
    BootError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    Verified,
    NonSecure,
}

/// The loop device backing the root in non-secure mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopDeviceBinding {
    pub device: Utf8PathBuf,
    pub backing: Utf8PathBuf,
}

/// A mounted, ready to use root filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPlan {
    pub mode: BootMode,
    pub root: Utf8PathBuf,
    pub binding: Option<LoopDeviceBinding>,
}

pub fn prepare_root<H: Host>(
    host: &mut H,
    layout: &Layout,
    device: &Utf8Path,
) -> Result<MountPlan, BootError> {
    info!("Do initial mount of device {device}");
    host.mount(&Mount::new(device.as_str(), &layout.staging, layout.fstype))
        .or_fatal(format!("mount {device} on {}", layout.staging))?;

    match root_hash(host, layout)? {
        Some(root_hash) => verified(host, layout, &root_hash),
        None => non_secure(host, layout),
    }
}

/// Looks at the artifacts on the staged device. `Some` asks for a verified boot.
fn root_hash<H: Host>(host: &mut H, layout: &Layout) -> Result<Option<String>, BootError> {
    let hash = layout.staged(HASH_FILE);
    let root_hash = layout.staged(ROOT_HASH_FILE);

    match (host.exists(&hash), host.exists(&root_hash)) {
        (false, false) => Ok(None),
        (true, false) => Err(BootError::abort(format!(
            "{hash} present, but {root_hash} is missing"
        ))),
        (false, true) => Err(BootError::abort(format!(
            "{root_hash} present, but {hash} is missing"
        ))),
        (true, true) => {
            let raw = host
                .read_file(&root_hash, layout.root_hash_limit + 1)
                .or_fatal(format!("read {root_hash}"))?;

            if raw.len() > layout.root_hash_limit {
                return Err(BootError::abort(format!(
                    "Root hash file is larger than {} bytes",
                    layout.root_hash_limit
                )));
            }

            let value = String::from_utf8_lossy(&raw).trim().to_owned();
            if value.is_empty() {
                return Err(BootError::abort("Root hash file present, but it's empty"));
            }

            info!(
                "Root hash file present ({} bytes). Execute veritysetup to read image",
                raw.len()
            );

            Ok(Some(value))
        }
    }
}

fn verified<H: Host>(
    host: &mut H,
    layout: &Layout,
    root_hash: &str,
) -> Result<MountPlan, BootError> {
    let image = layout.staged(IMAGE_FILE);
    let hash = layout.staged(HASH_FILE);
    let tool = &layout.verity.tool;

    let args = [
        "open",
        image.as_str(),
        layout.verity.name,
        hash.as_str(),
        root_hash,
    ];

    let result = host
        .run(tool, &args)
        .map_err(|source| BootError::spawn(tool.as_str(), source))?;

    trace!(
        "{tool} output: {}",
        String::from_utf8_lossy(&result.stdout)
    );

    if !result.outcome.success() {
        return Err(BootError::abort(format!(
            "Failed during execute of veritysetup 'open': {}",
            result.outcome
        )));
    }

    let mapped = layout.mapped_device();
    info!("Read image ok. Device {mapped} created");

    info!("Attempt mount of device {mapped}");
    let mount = Mount::new(mapped.as_str(), &layout.staging, layout.fstype)
        .flags(MountFlags::RDONLY);

    host.mount(&mount)
        .map_err(|errno| BootError::SignatureRejected {
            device: mapped.to_string(),
            errno,
        })?;

    Ok(MountPlan {
        mode: BootMode::Verified,
        root: layout.staging.clone(),
        binding: None,
    })
}

fn non_secure<H: Host>(host: &mut H, layout: &Layout) -> Result<MountPlan, BootError> {
    info!("Non-secure boot provided");

    let backing = layout.staged(IMAGE_FILE);
    let image = host
        .open_image(&backing)
        .or_fatal(format!("Unable to open application {backing}"))?;

    let binding = attach_first_free(host, layout, &image, &backing)?;

    host.mount(&Mount::new(
        binding.device.as_str(),
        &layout.loop_staging,
        layout.fstype,
    ))
    .or_fatal(format!(
        "Could not mount {} on {}",
        binding.device, layout.loop_staging
    ))?;

    Ok(MountPlan {
        mode: BootMode::NonSecure,
        root: layout.loop_staging.clone(),
        binding: Some(binding),
    })
}

fn attach_first_free<H: Host>(
    host: &mut H,
    layout: &Layout,
    image: &H::Image,
    backing: &Utf8Path,
) -> Result<LoopDeviceBinding, BootError> {
    for id in layout.loop_devices.clone() {
        let device = layout.loop_device(id);

        match host.attach_loop(&device, image) {
            Ok(()) => {
                info!("Loop device {id} used for {backing}");

                return Ok(LoopDeviceBinding {
                    device,
                    backing: backing.to_owned(),
                });
            }
            Err(err) => debug!("{device} unavailable: {err}"),
        }
    }

    Err(BootError::loop_exhausted(
        backing.as_str(),
        *layout.loop_devices.start(),
        *layout.loop_devices.end(),
    ))
}
