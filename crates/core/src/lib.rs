//! avd-runner core - inputs and shared plumbing
//!
//! This crate provides what every avd-runner stage needs: the input record
//! and its validation, release channels, error types, and the abstraction
//! used to run external SDK tools.

pub mod channel;
pub mod config;
pub mod error;
pub mod process;
pub mod validator;

pub use channel::{channel_id, Channel};
pub use config::{ActionInputs, Arch, ConfigWriteMode, EmulatorConfig, RunnerEnvironment};
pub use error::{ConfigError, Result, ValidationError};
pub use process::{locate_sdk_tool, CommandRunner, ProcessError, SystemRunner, ToolCommand, ToolOutput};

/// avd-runner version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "avd-runner";
