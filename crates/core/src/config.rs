//! Runner configuration
//!
//! Inputs arrive as a flat set of named strings, from a TOML file and/or
//! the `INPUT_<NAME>` environment variables a pipeline runner exports.
//! [`ActionInputs::resolve`] validates them into an [`EmulatorConfig`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::channel::Channel;
use crate::error::{ConfigError, Result, ValidationError};
use crate::validator;

/// Names of every recognised input, in declaration order
pub const INPUT_NAMES: &[&str] = &[
    "api-level",
    "system-image-api-level",
    "target",
    "arch",
    "profile",
    "cores",
    "ram-size",
    "heap-size",
    "disk-size",
    "sdcard-path-or-size",
    "avd-name",
    "force-avd-creation",
    "enable-hw-keyboard",
    "emulator-build",
    "ndk",
    "cmake",
    "channel",
    "config-write-mode",
];

/// CPU architecture of the system image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X86_64,
    Arm64V8a,
}

/// Supported architectures
pub const ARCHS: [Arch; 3] = [Arch::X86, Arch::X86_64, Arch::Arm64V8a];

impl Arch {
    pub fn as_str(self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Arm64V8a => "arm64-v8a",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ARCHS.into_iter().find(|a| a.as_str() == name)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How hardware overrides are written into an AVD's `config.ini`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigWriteMode {
    /// Replace existing keys in place and append the rest
    #[default]
    Merge,
    /// Append every entry, keeping any earlier values in the file
    Append,
}

impl ConfigWriteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigWriteMode::Merge => "merge",
            ConfigWriteMode::Append => "append",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "merge" => Some(ConfigWriteMode::Merge),
            "append" => Some(ConfigWriteMode::Append),
            _ => None,
        }
    }
}

/// Raw inputs, exactly as supplied by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ActionInputs {
    pub api_level: String,
    pub system_image_api_level: String,
    pub target: String,
    pub arch: String,
    pub profile: String,
    pub cores: String,
    pub ram_size: String,
    pub heap_size: String,
    pub disk_size: String,
    pub sdcard_path_or_size: String,
    pub avd_name: String,
    pub force_avd_creation: String,
    pub enable_hw_keyboard: String,
    pub emulator_build: String,
    pub ndk: String,
    pub cmake: String,
    pub channel: String,
    pub config_write_mode: String,
}

impl Default for ActionInputs {
    fn default() -> Self {
        Self {
            api_level: String::new(),
            system_image_api_level: String::new(),
            target: "default".to_string(),
            arch: "x86".to_string(),
            profile: String::new(),
            cores: "2".to_string(),
            ram_size: String::new(),
            heap_size: String::new(),
            disk_size: String::new(),
            sdcard_path_or_size: String::new(),
            avd_name: "test".to_string(),
            force_avd_creation: "true".to_string(),
            enable_hw_keyboard: "false".to_string(),
            emulator_build: String::new(),
            ndk: String::new(),
            cmake: String::new(),
            channel: "stable".to_string(),
            config_write_mode: "merge".to_string(),
        }
    }
}

impl ActionInputs {
    /// Parse inputs from TOML; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load inputs from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading inputs from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Environment variable carrying an input, e.g. `INPUT_API-LEVEL`
    pub fn env_key(name: &str) -> String {
        format!("INPUT_{}", name.to_uppercase())
    }

    /// Override inputs with every value `lookup` finds, keyed by
    /// [`ActionInputs::env_key`]. A variable set to the empty string clears
    /// the input; only an absent variable keeps the current value.
    pub fn overlay<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in INPUT_NAMES {
            let Some(value) = lookup(&Self::env_key(name)) else {
                continue;
            };
            if let Some(slot) = self.field_mut(name) {
                debug!("Input {} set from environment", name);
                *slot = value;
            }
        }
    }

    /// Override inputs from the process environment
    pub fn overlay_env(&mut self) {
        self.overlay(|key| std::env::var(key).ok());
    }

    /// Mutable access to an input by its kebab-case name
    pub fn field_mut(&mut self, name: &str) -> Option<&mut String> {
        let slot = match name {
            "api-level" => &mut self.api_level,
            "system-image-api-level" => &mut self.system_image_api_level,
            "target" => &mut self.target,
            "arch" => &mut self.arch,
            "profile" => &mut self.profile,
            "cores" => &mut self.cores,
            "ram-size" => &mut self.ram_size,
            "heap-size" => &mut self.heap_size,
            "disk-size" => &mut self.disk_size,
            "sdcard-path-or-size" => &mut self.sdcard_path_or_size,
            "avd-name" => &mut self.avd_name,
            "force-avd-creation" => &mut self.force_avd_creation,
            "enable-hw-keyboard" => &mut self.enable_hw_keyboard,
            "emulator-build" => &mut self.emulator_build,
            "ndk" => &mut self.ndk,
            "cmake" => &mut self.cmake,
            "channel" => &mut self.channel,
            "config-write-mode" => &mut self.config_write_mode,
            _ => return None,
        };
        Some(slot)
    }

    /// Validate every input in a fixed order, stopping at the first failure.
    pub fn resolve(&self) -> std::result::Result<EmulatorConfig, ValidationError> {
        validator::check_required("api-level", &self.api_level)?;
        info!("API level: {}", self.api_level);

        let system_image_api_level = if self.system_image_api_level.is_empty() {
            self.api_level.clone()
        } else {
            self.system_image_api_level.clone()
        };
        info!("System image API level: {}", system_image_api_level);

        let target = validator::playstore_target_substitution(&self.target);
        info!("Target: {}", target);

        let arch = validator::check_arch(&self.arch)?;
        info!("CPU architecture: {}", arch);

        info!("Hardware profile: {}", self.profile);
        info!("Cores: {}", self.cores);
        info!("RAM size: {}", self.ram_size);
        info!("Heap size: {}", self.heap_size);
        info!("SD card path or size: {}", self.sdcard_path_or_size);

        validator::check_disk_size(&self.disk_size)?;
        info!("Disk size: {}", self.disk_size);

        validator::check_required("avd-name", &self.avd_name)?;
        info!("AVD name: {}", self.avd_name);

        let force_avd_creation = validator::check_force_avd_creation(&self.force_avd_creation)?;
        info!("Force AVD creation: {}", force_avd_creation);

        let enable_hw_keyboard = validator::check_enable_hardware_keyboard(&self.enable_hw_keyboard)?;
        info!("Enable hardware keyboard: {}", enable_hw_keyboard);

        let emulator_build = non_empty(&self.emulator_build);
        if let Some(build) = &emulator_build {
            validator::check_emulator_build(build)?;
            info!("Using emulator build: {}", build);
        }

        let ndk_version = non_empty(&self.ndk);
        if let Some(ndk) = &ndk_version {
            info!("Version of NDK to install: {}", ndk);
        }

        let cmake_version = non_empty(&self.cmake);
        if let Some(cmake) = &cmake_version {
            info!("Version of CMake to install: {}", cmake);
        }

        let channel = validator::check_channel(&self.channel)?;
        info!("Channel: {} ({})", channel.id(), channel);

        let config_write_mode = validator::check_config_write_mode(&self.config_write_mode)?;
        debug!("Config write mode: {}", config_write_mode.as_str());

        Ok(EmulatorConfig {
            api_level: self.api_level.clone(),
            system_image_api_level,
            target,
            arch,
            profile: non_blank(&self.profile),
            cores: non_empty(&self.cores),
            ram_size: non_empty(&self.ram_size),
            heap_size: non_empty(&self.heap_size),
            disk_size: non_empty(&self.disk_size),
            sdcard_path_or_size: non_blank(&self.sdcard_path_or_size),
            avd_name: self.avd_name.clone(),
            force_avd_creation,
            enable_hw_keyboard,
            emulator_build,
            ndk_version,
            cmake_version,
            channel,
            config_write_mode,
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Whitespace-only counts as unset, anything else is passed through as given
fn non_blank(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Validated configuration for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorConfig {
    pub api_level: String,
    pub system_image_api_level: String,
    /// System image target after alias substitution
    pub target: String,
    pub arch: Arch,
    pub profile: Option<String>,
    pub cores: Option<String>,
    pub ram_size: Option<String>,
    pub heap_size: Option<String>,
    pub disk_size: Option<String>,
    pub sdcard_path_or_size: Option<String>,
    pub avd_name: String,
    pub force_avd_creation: bool,
    pub enable_hw_keyboard: bool,
    pub emulator_build: Option<String>,
    pub ndk_version: Option<String>,
    pub cmake_version: Option<String>,
    pub channel: Channel,
    pub config_write_mode: ConfigWriteMode,
}

impl EmulatorConfig {
    /// Upper bound passed to sdkmanager's `--channel`
    pub fn channel_id(&self) -> u32 {
        self.channel.id()
    }
}

/// Locations the runner operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerEnvironment {
    /// Android SDK root (`ANDROID_HOME`)
    pub sdk_root: PathBuf,
    /// Directory holding `<name>.avd` folders (`ANDROID_AVD_HOME`)
    pub avd_home: PathBuf,
}

impl RunnerEnvironment {
    /// Resolve locations from explicit values, falling back to `lookup`
    /// for `ANDROID_HOME`, `ANDROID_SDK_ROOT` and `ANDROID_AVD_HOME`.
    pub fn resolve<F>(
        sdk_root: Option<PathBuf>,
        avd_home: Option<PathBuf>,
        home_dir: Option<PathBuf>,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        let sdk_root = sdk_root
            .or_else(|| from_env("ANDROID_HOME"))
            .or_else(|| from_env("ANDROID_SDK_ROOT"))
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "Android SDK root not set; pass --sdk-root or set ANDROID_HOME".to_string(),
                )
            })?;

        let avd_home = avd_home
            .or_else(|| from_env("ANDROID_AVD_HOME"))
            .or_else(|| home_dir.map(|h| h.join(".android").join("avd")))
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "AVD home not set; pass --avd-home or set ANDROID_AVD_HOME".to_string(),
                )
            })?;

        Ok(Self { sdk_root, avd_home })
    }
}
