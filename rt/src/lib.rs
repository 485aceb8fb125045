use std::{convert::Infallible, fmt, panic::Location, process, time::Duration};

use rustix::{
    system::{reboot, RebootCommand},
    thread::{nanosleep, Timespec},
};
use tracing::error;

pub use rt_macros::entry;

pub mod io;
pub mod log;

const BANNER: &[u8] =
    b"!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!\n";

/// How a value returned from `#[entry]` ends the process.
///
/// Nothing implementing this returns: the process either has been replaced
/// already, or the machine is restarted.
pub trait Termination {
    fn terminate(self) -> !;
}

impl Termination for Infallible {
    fn terminate(self) -> ! {
        match self {}
    }
}

impl<T: Termination, E: Termination> Termination for Result<T, E> {
    fn terminate(self) -> ! {
        match self {
            Ok(value) => value.terminate(),
            Err(err) => err.terminate(),
        }
    }
}

/// Prints the fatal error banner on the console, gives it a second to drain
/// and restarts the machine.
pub fn fatal(location: &Location<'_>, message: fmt::Arguments<'_>) -> ! {
    let report = format!(
        "!!!! FATAL-ERROR at {}:{}\n!!!! MSG: {message}\n",
        location.file(),
        location.line()
    );

    // The console is all we have left, nothing to do if it fails too
    let stdout = std::io::stdout();
    let _ = io::write_all(&stdout, BANNER);
    let _ = io::write_all(&stdout, report.as_bytes());
    let _ = io::write_all(&stdout, BANNER);

    restart(Duration::from_secs(1))
}

/// Restarts the machine after `delay`.
pub fn restart(delay: Duration) -> ! {
    if !delay.is_zero() {
        sleep(delay);
    }

    if let Err(err) = reboot(RebootCommand::Restart) {
        error!("Reboot request refused: {err}");
    }

    process::exit(1)
}

pub fn sleep(duration: Duration) {
    let timespec = Timespec {
        tv_sec: duration.as_secs() as _,
        tv_nsec: duration.subsec_nanos() as _,
    };

    let _ = nanosleep(&timespec);
}
