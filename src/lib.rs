//! Firmware update packager and applier for embedded Linux devices.
//!
//! This crate is the reusable core behind the `fwup-rs` binary: a coalescing
//! aligned-write buffer for raw block devices, a streaming archive creator,
//! and a table-dispatched requirement evaluator that gates task application
//! on the state of the target device.

pub mod aligned_writer;
pub mod apply;
pub mod archive;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod mbr;
pub mod progress;
pub mod requirement;
pub mod uboot_env;

pub use error::{Error, Result};
