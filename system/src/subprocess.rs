//! Runs helper programs to completion and captures the start of their output.

use std::{
    fmt,
    io::{self, Read},
    process::{ChildStdout, Command, Stdio},
};

use arrayvec::ArrayVec;
use camino::Utf8Path;
use rustix::{
    io::Errno,
    process::{waitpid, Pid, WaitOptions, WaitStatus},
};
use tracing::{debug, trace};

/// Bytes of standard output kept from a helper.
pub const OUTPUT_CAPACITY: usize = 20;

/// State change reported by `waitpid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Exited(u32),
    Signaled(u32),
    Stopped(u32),
    Continued,
}

impl Outcome {
    /// Exited and signaled children are gone, anything else can still run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exited(_) | Self::Signaled(_))
    }

    pub fn success(self) -> bool {
        self == Self::Exited(0)
    }
}

impl From<WaitStatus> for Outcome {
    fn from(status: WaitStatus) -> Self {
        if let Some(code) = status.exit_status() {
            Self::Exited(code)
        } else if let Some(signal) = status.terminating_signal() {
            Self::Signaled(signal)
        } else if let Some(signal) = status.stopping_signal() {
            Self::Stopped(signal)
        } else {
            Self::Continued
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited, status={code}"),
            Self::Signaled(signal) => write!(f, "killed by signal {signal}"),
            Self::Stopped(signal) => write!(f, "stopped by signal {signal}"),
            Self::Continued => f.write_str("continued"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubprocessResult {
    /// Always terminal.
    pub outcome: Outcome,
    pub stdout: ArrayVec<u8, OUTPUT_CAPACITY>,
}

/// Spawns `program` with its standard output on a pipe and blocks until it
/// exits or is killed.
///
/// Only a failure to start the program is an error. What the exit status
/// means is left to the caller.
pub fn run(program: &Utf8Path, args: &[&str]) -> io::Result<SubprocessResult> {
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .spawn()?;

    let pid = Pid::from_child(&child);

    let outcome = loop {
        match waitpid(Some(pid), WaitOptions::UNTRACED | WaitOptions::CONTINUED) {
            Ok(Some(status)) => {
                let outcome = Outcome::from(status);
                trace!("child status: {outcome}");

                if outcome.is_terminal() {
                    break outcome;
                }
            }
            Ok(None) | Err(Errno::INTR) => {}
            Err(err) => return Err(err.into()),
        }
    };

    let stdout = drain(child.stdout.take());

    trace!(
        "Appl {program} executed ok. Output is {} bytes: {}",
        stdout.len(),
        String::from_utf8_lossy(&stdout)
    );

    Ok(SubprocessResult { outcome, stdout })
}

fn drain(pipe: Option<ChildStdout>) -> ArrayVec<u8, OUTPUT_CAPACITY> {
    let mut captured = ArrayVec::new();

    if let Some(pipe) = pipe {
        let mut pipe = pipe.take(OUTPUT_CAPACITY as u64);

        if let Err(err) = io::copy(&mut pipe, &mut captured) {
            debug!("Unable to read helper output: {err}");
        }
    }

    captured
}
