//! avd-runner - Android emulator setup for CI pipelines
//!
//! Reads declarative inputs, installs the Android SDK packages they call
//! for, and creates (or reuses) an Android Virtual Device with the
//! requested hardware profile. Booting the emulator is left to the caller.
//!
//! ## Architecture
//!
//! - `avd-runner-core`: inputs, validation, channels, process execution
//! - `avd-runner-android-toolchain`: sdkmanager wrapper and downloads
//! - `avd-runner-emulator-bridge`: AVD creation and `config.ini` overrides

#![warn(clippy::all)]

pub mod orchestrator;

pub use avd_runner_android_toolchain as toolchain;
pub use avd_runner_core as core;
pub use avd_runner_emulator_bridge as emulator;

pub use orchestrator::Orchestrator;
