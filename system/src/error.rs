use std::{io, panic::Location, time::Duration};

use rustix::io::Errno;
use thiserror::Error;
use tracing::error;

use crate::cmdline::CmdlineError;

/// Why a boot cannot go on. Every variant ends in a restart.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("{op} failed: {errno}")]
    Os {
        op: String,
        #[source]
        errno: Errno,
        location: &'static Location<'static>,
    },

    #[error("{reason}")]
    Abort {
        reason: String,
        location: &'static Location<'static>,
    },

    #[error("{source}")]
    Cmdline {
        #[source]
        source: CmdlineError,
        location: &'static Location<'static>,
    },

    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
        location: &'static Location<'static>,
    },

    #[error("timeout, device {device} not found after {attempts} attempts")]
    DeviceTimeout { device: String, attempts: u32 },

    #[error("unable to mount device {device}, incorrect signature? ({errno})")]
    SignatureRejected {
        device: String,
        #[source]
        errno: Errno,
    },

    #[error("can't find available loop device {first}..={last} for {image}")]
    LoopExhausted {
        image: String,
        first: u32,
        last: u32,
        location: &'static Location<'static>,
    },

    #[error("failed to execute {program}: {errno}")]
    Handoff {
        program: String,
        #[source]
        errno: Errno,
        location: &'static Location<'static>,
    },
}

impl BootError {
    #[track_caller]
    pub fn abort(reason: impl Into<String>) -> Self {
        Self::Abort {
            reason: reason.into(),
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn spawn(program: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn loop_exhausted(image: impl Into<String>, first: u32, last: u32) -> Self {
        Self::LoopExhausted {
            image: image.into(),
            first,
            last,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn handoff(program: impl Into<String>, errno: Errno) -> Self {
        Self::Handoff {
            program: program.into(),
            errno,
            location: Location::caller(),
        }
    }

    /// Where the failure was detected. Only restarts without a banner have none.
    pub fn location(&self) -> Option<&'static Location<'static>> {
        match self {
            Self::Os { location, .. }
            | Self::Abort { location, .. }
            | Self::Cmdline { location, .. }
            | Self::Spawn { location, .. }
            | Self::LoopExhausted { location, .. }
            | Self::Handoff { location, .. } => Some(location),
            Self::DeviceTimeout { .. } | Self::SignatureRejected { .. } => None,
        }
    }
}

impl From<CmdlineError> for BootError {
    #[track_caller]
    fn from(source: CmdlineError) -> Self {
        Self::Cmdline {
            source,
            location: Location::caller(),
        }
    }
}

/// Attaches the failing operation and the caller's location to an OS error.
pub trait OrFatal<T> {
    fn or_fatal(self, op: impl Into<String>) -> Result<T, BootError>;
}

impl<T> OrFatal<T> for Result<T, Errno> {
    #[track_caller]
    fn or_fatal(self, op: impl Into<String>) -> Result<T, BootError> {
        match self {
            Ok(value) => Ok(value),
            Err(errno) => Err(BootError::Os {
                op: op.into(),
                errno,
                location: Location::caller(),
            }),
        }
    }
}

impl rt::Termination for BootError {
    fn terminate(self) -> ! {
        match self {
            Self::DeviceTimeout { .. } => {
                error!("{self}");
                rt::restart(Duration::ZERO)
            }
            Self::SignatureRejected { .. } => {
                error!("!!! warning: {self} !!!");
                rt::restart(Duration::from_secs(1))
            }
            Self::Os {
                ref op,
                errno,
                location,
            } => rt::fatal(
                location,
                format_args!(
                    "{op} (errno: {} error: {errno})",
                    errno.raw_os_error()
                ),
            ),
            Self::Abort { location, .. }
            | Self::Cmdline { location, .. }
            | Self::Spawn { location, .. }
            | Self::LoopExhausted { location, .. }
            | Self::Handoff { location, .. } => rt::fatal(location, format_args!("{self}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_fatal_records_caller() {
        let line = line!() + 1;
        let err = Err::<(), _>(Errno::NOENT).or_fatal("mount /proc").unwrap_err();

        let location = err.location().unwrap();
        assert_eq!(location.line(), line);
        assert!(location.file().ends_with("error.rs"));
        assert!(err.to_string().starts_with("mount /proc failed"));
    }

    #[test]
    fn constructors_record_caller() {
        let first = line!() + 2;
        let errors = [
            BootError::spawn("/usr/sbin/veritysetup", io::ErrorKind::NotFound.into()),
            BootError::loop_exhausted("/mnt/app.ext4", 0, 7),
            BootError::handoff("/sbin/init", Errno::NOENT),
            BootError::from(CmdlineError::NotUtf8 { key: "root_next=" }),
        ];

        for (line, err) in (first..).zip(errors) {
            let location = err.location().unwrap();
            assert_eq!(location.line(), line, "{err}");
            assert!(location.file().ends_with("error.rs"), "{err}");
        }
    }

    #[test]
    fn restarts_without_banner_have_no_location() {
        let err = BootError::DeviceTimeout {
            device: "/dev/sda1".into(),
            attempts: 3,
        };
        assert!(err.location().is_none());
    }

    #[test]
    fn ok_passes_through() {
        assert_eq!(Ok::<_, Errno>(3).or_fatal("unused").unwrap(), 3);
    }
}
