//! Input validation
//!
//! Each check takes the raw input string and either returns the parsed
//! value or a [`ValidationError`] naming the input and the accepted values.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::channel::{Channel, CHANNELS};
use crate::config::{Arch, ConfigWriteMode, ARCHS};
use crate::error::ValidationError;

static DISK_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+[KMG]?$").expect("valid disk size pattern"));

static EMULATOR_BUILD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid emulator build pattern"));

/// Target alias accepted in place of the full play store target
pub const PLAYSTORE_ALIAS: &str = "playstore";

/// System image target the alias stands for
pub const PLAYSTORE_TARGET: &str = "google_apis_playstore";

fn one_of(values: impl IntoIterator<Item = &'static str>) -> String {
    let values: Vec<&str> = values.into_iter().collect();
    format!("one of: {}", values.join(", "))
}

/// Fail on an empty required input
pub fn check_required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, value, "a non-empty value"));
    }
    Ok(())
}

pub fn check_arch(arch: &str) -> Result<Arch, ValidationError> {
    Arch::from_name(arch)
        .ok_or_else(|| ValidationError::new("arch", arch, one_of(ARCHS.iter().map(|a| a.as_str()))))
}

/// Disk size is optional; when present it is a byte count with an optional
/// `K`, `M` or `G` multiplier.
pub fn check_disk_size(disk_size: &str) -> Result<(), ValidationError> {
    if disk_size.is_empty() || DISK_SIZE_RE.is_match(disk_size) {
        return Ok(());
    }
    Err(ValidationError::new(
        "disk-size",
        disk_size,
        "a number of bytes optionally followed by K, M or G",
    ))
}

fn check_boolean(field: &'static str, value: &str) -> Result<bool, ValidationError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ValidationError::new(field, value, "either 'true' or 'false'")),
    }
}

pub fn check_force_avd_creation(value: &str) -> Result<bool, ValidationError> {
    check_boolean("force-avd-creation", value)
}

pub fn check_enable_hardware_keyboard(value: &str) -> Result<bool, ValidationError> {
    check_boolean("enable-hw-keyboard", value)
}

/// Emulator builds are numeric build ids from the Android CI server
pub fn check_emulator_build(build: &str) -> Result<(), ValidationError> {
    if EMULATOR_BUILD_RE.is_match(build) {
        Ok(())
    } else {
        Err(ValidationError::new("emulator-build", build, "a numeric build id"))
    }
}

pub fn check_channel(channel: &str) -> Result<Channel, ValidationError> {
    Channel::from_name(channel)
        .ok_or_else(|| ValidationError::new("channel", channel, one_of(CHANNELS.iter().map(|c| c.as_str()))))
}

pub fn check_config_write_mode(mode: &str) -> Result<ConfigWriteMode, ValidationError> {
    ConfigWriteMode::from_name(mode)
        .ok_or_else(|| ValidationError::new("config-write-mode", mode, one_of(["merge", "append"])))
}

/// Replace the `playstore` shorthand with the real target name
pub fn playstore_target_substitution(target: &str) -> String {
    if target == PLAYSTORE_ALIAS {
        PLAYSTORE_TARGET.to_string()
    } else {
        target.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_allow_list() {
        for arch in ["x86", "x86_64", "arm64-v8a"] {
            assert_eq!(check_arch(arch).map(|a| a.as_str()), Ok(arch));
        }
        for arch in ["mips", "armeabi-v7a", "X86", "x86 ", "", "arm64"] {
            let err = check_arch(arch).unwrap_err();
            assert_eq!(err.field, "arch");
        }
    }

    #[test]
    fn test_disk_size() {
        for ok in ["", "0", "512", "2048M", "1G", "800K", "12345678"] {
            assert!(check_disk_size(ok).is_ok(), "{ok} should be accepted");
        }
        for bad in ["M", "1.5G", "512m", "1T", "-1", " 512", "1GB", "abc", "G1"] {
            let err = check_disk_size(bad).unwrap_err();
            assert_eq!(err.field, "disk-size", "{bad} should be rejected");
        }
    }

    #[test]
    fn test_boolean_flags() {
        assert_eq!(check_force_avd_creation("true"), Ok(true));
        assert_eq!(check_force_avd_creation("false"), Ok(false));
        assert_eq!(check_enable_hardware_keyboard("true"), Ok(true));
        assert_eq!(check_enable_hardware_keyboard("false"), Ok(false));

        for bad in ["True", "FALSE", "1", "0", "", "yes", "true "] {
            assert_eq!(check_force_avd_creation(bad).unwrap_err().field, "force-avd-creation");
            assert_eq!(check_enable_hardware_keyboard(bad).unwrap_err().field, "enable-hw-keyboard");
        }
    }

    #[test]
    fn test_emulator_build() {
        assert!(check_emulator_build("7425822").is_ok());
        assert!(check_emulator_build("0").is_ok());
        for bad in ["", "abc", "7425822.1", "30.0.5", "-1", "12 "] {
            assert!(check_emulator_build(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_channel() {
        assert_eq!(check_channel("stable"), Ok(Channel::Stable));
        assert_eq!(check_channel("canary"), Ok(Channel::Canary));
        let err = check_channel("nightly").unwrap_err();
        assert_eq!(err.field, "channel");
        assert!(err.expected.contains("stable, beta, dev, canary"));
    }

    #[test]
    fn test_required() {
        assert!(check_required("api-level", "30").is_ok());
        assert!(check_required("api-level", "").is_err());
        assert!(check_required("avd-name", "  ").is_err());
    }

    #[test]
    fn test_config_write_mode() {
        assert_eq!(check_config_write_mode("merge"), Ok(ConfigWriteMode::Merge));
        assert_eq!(check_config_write_mode("append"), Ok(ConfigWriteMode::Append));
        assert!(check_config_write_mode("replace").is_err());
    }

    #[test]
    fn test_playstore_substitution() {
        assert_eq!(playstore_target_substitution("playstore"), "google_apis_playstore");
        for other in ["default", "google_apis", "google_apis_playstore", "Playstore", ""] {
            assert_eq!(playstore_target_substitution(other), other);
        }
    }
}
