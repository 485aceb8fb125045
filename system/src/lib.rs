//! Early userspace init.
//!
//! Finds the root device named on the kernel command line, mounts it either
//! through dm-verity or through a loop device, pivots into it and executes the
//! next init. Every failure ends in a restart of the machine.

pub mod boot;
pub mod bringup;
pub mod cmdline;
pub mod config;
pub mod engine;
pub mod error;
pub mod handoff;
pub mod host;
pub mod linux;
pub mod locate;
mod loop_configure;
pub mod subprocess;
pub mod switch;

pub use error::BootError;
