//! Every side effect the boot sequence has on the machine.
//!
//! [`LinuxHost`](crate::linux::LinuxHost) is the real thing, tests provide a
//! recording implementation.

use std::{io, time::Duration};

use camino::Utf8Path;
use rustix::{fs::Mode, io::Errno, mount::MountFlags};

use crate::subprocess::SubprocessResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mount<'a> {
    pub source: &'a str,
    pub target: &'a Utf8Path,
    pub fstype: &'a str,
    pub flags: MountFlags,
    pub data: &'a str,
}

impl<'a> Mount<'a> {
    pub fn new(source: &'a str, target: &'a Utf8Path, fstype: &'a str) -> Self {
        Self {
            source,
            target,
            fstype,
            flags: MountFlags::empty(),
            data: "",
        }
    }

    pub fn flags(self, flags: MountFlags) -> Self {
        Self { flags, ..self }
    }

    pub fn data(self, data: &'a str) -> Self {
        Self { data, ..self }
    }
}

/// A pseudo filesystem mounted at a fixed place.
#[derive(Debug, Clone, Copy)]
pub struct PseudoFs {
    pub source: &'static str,
    pub target: &'static str,
    pub fstype: &'static str,
    pub data: &'static str,
    /// Create the mount point first, ignoring failures.
    pub create: bool,
}

impl PseudoFs {
    pub fn mount(&self) -> Mount<'static> {
        Mount::new(self.source, Utf8Path::new(self.target), self.fstype).data(self.data)
    }
}

pub const PROC: PseudoFs = PseudoFs {
    source: "proc",
    target: "/proc",
    fstype: "proc",
    data: "",
    create: false,
};

pub const SYSFS: PseudoFs = PseudoFs {
    source: "sysfs",
    target: "/sys",
    fstype: "sysfs",
    data: "",
    create: false,
};

pub trait Host {
    /// An opened filesystem image, ready to back a loop device.
    type Image;

    fn is_init(&self) -> bool;

    fn exists(&mut self, path: &Utf8Path) -> bool;

    /// Names in `path`, without `.` and `..`.
    fn list_dir(&mut self, path: &Utf8Path) -> Result<Vec<String>, Errno>;

    /// Reads at most `limit` bytes.
    fn read_file(&mut self, path: &Utf8Path, limit: usize) -> Result<Vec<u8>, Errno>;

    fn write_file(&mut self, path: &Utf8Path, contents: &[u8]) -> Result<(), Errno>;

    fn mkdir(&mut self, path: &Utf8Path, mode: Mode) -> Result<(), Errno>;

    fn chdir(&mut self, path: &Utf8Path) -> Result<(), Errno>;

    fn setsid(&mut self) -> Result<(), Errno>;

    fn set_env(&mut self, key: &str, value: &str);

    fn mount(&mut self, mount: &Mount<'_>) -> Result<(), Errno>;

    fn move_mount(&mut self, from: &Utf8Path, to: &Utf8Path) -> Result<(), Errno>;

    fn pivot_root(&mut self, new_root: &Utf8Path, put_old: &Utf8Path) -> Result<(), Errno>;

    fn open_image(&mut self, path: &Utf8Path) -> Result<Self::Image, Errno>;

    /// Binds `image` to the loop device node `device`. Fails if the device is
    /// missing or already bound.
    fn attach_loop(&mut self, device: &Utf8Path, image: &Self::Image) -> Result<(), Errno>;

    fn run(&mut self, program: &Utf8Path, args: &[&str]) -> io::Result<SubprocessResult>;

    /// Replaces the process image. Only returns on failure.
    fn exec(&mut self, program: &Utf8Path, argv: &[&str]) -> Errno;

    fn sleep(&mut self, duration: Duration);
}
