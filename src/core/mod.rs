//! Core building blocks shared by every command
//!
//! - **config**: Build settings (dualstream.toml + flags) and their validation
//! - **error**: Error types with exit codes and contextual help messages

pub mod config;
pub mod error;
