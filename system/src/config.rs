//! Paths and limits used during a boot.

use std::{ops::RangeInclusive, time::Duration};

use camino::{Utf8Path, Utf8PathBuf};

/// Hash tree of the application image. Its presence requests a verified boot.
pub const HASH_FILE: &str = "app.hash";
/// Root hash of the hash tree, as text.
pub const ROOT_HASH_FILE: &str = "app.roothash";
/// The application filesystem image.
pub const IMAGE_FILE: &str = "app.ext4";

#[derive(Debug, Clone)]
pub struct Layout {
    pub cmdline: Utf8PathBuf,
    pub cmdline_limit: usize,
    pub dev: Utf8PathBuf,
    pub fstype: &'static str,
    /// First mount point of the root candidate.
    pub staging: Utf8PathBuf,
    /// Mount point of the loop attached image in non-secure mode.
    pub loop_staging: Utf8PathBuf,
    /// Directory, relative to the new root, receiving the old root on pivot.
    pub old_root: Utf8PathBuf,
    pub root_hash_limit: usize,
    pub verity: Verity,
    pub loop_devices: RangeInclusive<u32>,
    pub discovery: Discovery,
    pub default_init: Utf8PathBuf,
}

#[derive(Debug, Clone)]
pub struct Verity {
    pub tool: Utf8PathBuf,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Discovery {
    pub attempts: u32,
    pub interval: Duration,
    /// Extra wait once the node exists, some controllers announce it before
    /// they can serve reads.
    pub settle: Duration,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            cmdline: "/proc/cmdline".into(),
            cmdline_limit: 8 * 1024 - 1,
            dev: "/dev".into(),
            fstype: "ext4",
            staging: "/mnt".into(),
            loop_staging: "/mnt2".into(),
            old_root: "mnt".into(),
            root_hash_limit: 100,
            verity: Verity::default(),
            loop_devices: 0..=7,
            discovery: Discovery::default(),
            default_init: "/sbin/init".into(),
        }
    }
}

impl Default for Verity {
    fn default() -> Self {
        Self {
            tool: "/usr/sbin/veritysetup".into(),
            name: "dmv_app",
        }
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            attempts: 100_000,
            interval: Duration::from_micros(100),
            settle: Duration::from_micros(500),
        }
    }
}

impl Layout {
    pub fn staged(&self, file: &str) -> Utf8PathBuf {
        self.staging.join(file)
    }

    pub fn mapped_device(&self) -> Utf8PathBuf {
        self.dev.join("mapper").join(self.verity.name)
    }

    pub fn loop_device(&self, id: u32) -> Utf8PathBuf {
        self.dev.join(format!("loop{id}"))
    }

    /// Where the old root is reachable once `root` has been pivoted into.
    pub fn old_root_after_pivot(&self) -> Utf8PathBuf {
        Utf8Path::new("/").join(&self.old_root)
    }
}
