//! Kernel command line parameters.
//!
//! Values are looked up by key, the last occurrence wins so that parameters
//! appended by the bootloader override the built-in defaults.

use arrayvec::ArrayString;
use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{config::Layout, error::OrFatal, host::Host, BootError};

pub const ROOT_NEXT: &str = "root_next=";
pub const INIT_NEXT: &str = "init_next=";
pub const INIT_LOG: &str = "init_log=";

/// Capacity of a stored value. One byte stays reserved for the terminator
/// the value needs once it is handed to the kernel.
pub const VALUE_CAPACITY: usize = 64;

pub type Value = ArrayString<VALUE_CAPACITY>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CmdlineError {
    #[error("value of {key} is {len} bytes, does not fit in {capacity}")]
    Overrun {
        key: &'static str,
        len: usize,
        capacity: usize,
    },

    #[error("value of {key} is not valid UTF-8")]
    NotUtf8 { key: &'static str },
}

/// Values taken from the kernel command line, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootParameters {
    pub root_next: Value,
    pub init_next: Option<Value>,
    pub init_log: Option<Value>,
}

impl BootParameters {
    pub fn read<H: Host>(host: &mut H, layout: &Layout) -> Result<Self, BootError> {
        let cmdline = host
            .read_file(&layout.cmdline, layout.cmdline_limit)
            .or_fatal(format!("read {}", layout.cmdline))?;

        debug!("Kernel command line: {}", String::from_utf8_lossy(&cmdline).trim_end());

        Self::parse(&cmdline)
    }

    pub fn parse(cmdline: &[u8]) -> Result<Self, BootError> {
        let Some(root_next) = value::<VALUE_CAPACITY>(cmdline, ROOT_NEXT)? else {
            return Err(BootError::abort("No root_next found!"));
        };

        let init_next = value(cmdline, INIT_NEXT)?;

        // Verbosity only, a bad value must not hold up the boot
        let init_log = value(cmdline, INIT_LOG).unwrap_or_else(|err| {
            warn!("Ignoring {err}");
            None
        });

        Ok(Self {
            root_next,
            init_next,
            init_log,
        })
    }

    pub fn root_device(&self) -> &Utf8Path {
        Utf8Path::new(self.root_next.as_str())
    }

    pub fn init(&self) -> Option<&Utf8Path> {
        self.init_next.as_ref().map(|init| Utf8Path::new(init.as_str()))
    }
}

/// Returns the value of the last `key` token, `key` including its `=`.
///
/// A key with an empty value counts as absent. A value of `N` bytes or more is
/// reported as an overrun, nothing is truncated.
pub fn value<const N: usize>(
    cmdline: &[u8],
    key: &'static str,
) -> Result<Option<ArrayString<N>>, CmdlineError> {
    let found = cmdline
        .split(|c| c.is_ascii_whitespace())
        .filter_map(|token| token.strip_prefix(key.as_bytes()))
        .last();

    let Some(raw) = found.filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };

    let overrun = CmdlineError::Overrun {
        key,
        len: raw.len(),
        capacity: N,
    };

    if raw.len() >= N {
        return Err(overrun);
    }

    let value = std::str::from_utf8(raw).map_err(|_| CmdlineError::NotUtf8 { key })?;

    ArrayString::from(value).map(Some).map_err(|_| overrun)
}
