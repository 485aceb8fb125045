use std::convert::Infallible;

use rootswitch::{boot, config::Layout, linux::LinuxHost, BootError};
use rt::entry;

#[entry]
fn main() -> Result<Infallible, BootError> {
    let verbosity = rt::log::init("info");

    boot::run(&mut LinuxHost::new(), &Layout::default(), |directives| {
        verbosity.set(directives)
    })
}
