//! CLI commands for dualstream-release-builder
//!
//! - **build**: assemble a dualstream release from a base release and RHEL 10 OS images
//! - **info**: summarize a release payload (architecture, version, OS tags)

pub mod build;
pub mod info;

pub use build::{BuildArgs, run_build};
pub use info::run_info;
