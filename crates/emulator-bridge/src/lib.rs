//! Android Emulator Bridge
//!
//! Creates Android Virtual Devices (AVDs) and applies hardware settings to
//! them. Booting the emulator is left to the pipeline.

pub mod avd;
pub mod config_ini;

pub use avd::{AvdConfig, AvdError, AvdManager, HardwareOverrides};
pub use config_ini::{append_entries, merge_entries};

/// File holding an AVD's hardware configuration
pub const AVD_CONFIG_FILE: &str = "config.ini";
