//! AVD (Android Virtual Device) Manager
//!
//! Creates AVDs through avdmanager and applies hardware overrides to their
//! `config.ini`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use avd_runner_core::{
    locate_sdk_tool, Arch, CommandRunner, ConfigWriteMode, EmulatorConfig, ProcessError,
    RunnerEnvironment, ToolCommand,
};
use tracing::{debug, info, info_span, Instrument};

use crate::config_ini;

/// Answer to avdmanager's "create a custom hardware profile?" prompt
const HARDWARE_PROFILE_ANSWER: &str = "no\n";

/// AVD Manager errors
#[derive(Debug, thiserror::Error)]
pub enum AvdError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("File system error at {path}: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// AVD configuration for creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvdConfig {
    pub name: String,
    pub system_image_api_level: String,
    pub target: String,
    pub arch: Arch,
    pub device: Option<String>, // hardware profile, e.g. "pixel_6"
    pub sdcard: Option<String>, // path or size, e.g. "512M"
    pub force: bool,
}

impl AvdConfig {
    /// ABI string, `<target>/<arch>`
    pub fn abi(&self) -> String {
        format!("{}/{}", self.target, self.arch)
    }

    /// System image package specifier
    pub fn package(&self) -> String {
        format!(
            "system-images;android-{};{};{}",
            self.system_image_api_level, self.target, self.arch
        )
    }
}

impl From<&EmulatorConfig> for AvdConfig {
    fn from(config: &EmulatorConfig) -> Self {
        Self {
            name: config.avd_name.clone(),
            system_image_api_level: config.system_image_api_level.clone(),
            target: config.target.clone(),
            arch: config.arch,
            device: config.profile.clone(),
            sdcard: config.sdcard_path_or_size.clone(),
            force: config.force_avd_creation,
        }
    }
}

/// Hardware settings written into `config.ini` after creation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardwareOverrides {
    pub cores: Option<String>,
    pub ram_size: Option<String>,
    pub heap_size: Option<String>,
    pub enable_hw_keyboard: bool,
    pub disk_size: Option<String>,
}

impl HardwareOverrides {
    /// `config.ini` entries, in the order they are written
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries = Vec::new();
        if let Some(cores) = &self.cores {
            entries.push(("hw.cpu.ncore".to_string(), cores.clone()));
        }
        if let Some(ram) = &self.ram_size {
            entries.push(("hw.ramSize".to_string(), ram.clone()));
        }
        if let Some(heap) = &self.heap_size {
            entries.push(("hw.heapSize".to_string(), heap.clone()));
        }
        if self.enable_hw_keyboard {
            entries.push(("hw.keyboard".to_string(), "yes".to_string()));
        }
        if let Some(disk) = &self.disk_size {
            entries.push(("disk.dataPartition.size".to_string(), disk.clone()));
        }
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl From<&EmulatorConfig> for HardwareOverrides {
    fn from(config: &EmulatorConfig) -> Self {
        Self {
            cores: config.cores.clone(),
            ram_size: config.ram_size.clone(),
            heap_size: config.heap_size.clone(),
            enable_hw_keyboard: config.enable_hw_keyboard,
            disk_size: config.disk_size.clone(),
        }
    }
}

/// AVD Manager
pub struct AvdManager<R> {
    sdk_root: PathBuf,
    avd_home: PathBuf,
    runner: Arc<R>,
    write_mode: ConfigWriteMode,
}

impl<R: CommandRunner> AvdManager<R> {
    /// Create a new AVD manager
    pub fn new(env: &RunnerEnvironment, runner: Arc<R>) -> Self {
        Self {
            sdk_root: env.sdk_root.clone(),
            avd_home: env.avd_home.clone(),
            runner,
            write_mode: ConfigWriteMode::default(),
        }
    }

    pub fn with_write_mode(mut self, write_mode: ConfigWriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// `<avd_home>/<name>.avd`
    pub fn avd_dir(&self, name: &str) -> PathBuf {
        self.avd_home.join(format!("{}.avd", name))
    }

    pub fn config_path(&self, name: &str) -> PathBuf {
        self.avd_dir(name).join(crate::AVD_CONFIG_FILE)
    }

    /// Whether an AVD directory already exists for `name`
    pub async fn exists(&self, name: &str) -> Result<bool, AvdError> {
        let dir = self.avd_dir(name);
        match tokio::fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(AvdError::FileSystem { path: dir, source }),
        }
    }

    /// The `avdmanager create avd` invocation for `config`
    pub fn create_command(&self, config: &AvdConfig) -> ToolCommand {
        let mut cmd = ToolCommand::new(locate_sdk_tool(&self.sdk_root, "avdmanager"))
            .args(["create", "avd", "--force"])
            .arg("-n")
            .arg(&config.name)
            .arg("--abi")
            .arg(config.abi())
            .arg("--package")
            .arg(config.package());

        if let Some(device) = &config.device {
            cmd = cmd.arg("--device").arg(device);
        }
        if let Some(sdcard) = &config.sdcard {
            cmd = cmd.arg("--sdcard").arg(sdcard);
        }

        cmd.stdin(HARDWARE_PROFILE_ANSWER)
    }

    /// Create the AVD unless it already exists (or `force` is set), then
    /// apply hardware overrides.
    pub async fn ensure_avd(
        &self,
        config: &AvdConfig,
        overrides: &HardwareOverrides,
    ) -> Result<(), AvdError> {
        self.create_and_configure(config, overrides)
            .instrument(info_span!("create_avd", avd = %config.name))
            .await
    }

    async fn create_and_configure(
        &self,
        config: &AvdConfig,
        overrides: &HardwareOverrides,
    ) -> Result<(), AvdError> {
        if config.force || !self.exists(&config.name).await? {
            info!("Creating AVD.");
            let cmd = self.create_command(config);
            self.runner.run(&cmd).await?;
        } else {
            info!("AVD {} already exists, reusing it.", config.name);
        }

        self.apply_overrides(&config.name, overrides).await
    }

    /// Write hardware overrides into the AVD's `config.ini`
    pub async fn apply_overrides(
        &self,
        name: &str,
        overrides: &HardwareOverrides,
    ) -> Result<(), AvdError> {
        let entries = overrides.entries();
        if entries.is_empty() {
            debug!("No hardware overrides to apply");
            return Ok(());
        }

        let path = self.config_path(name);
        for (key, value) in &entries {
            info!("Setting {}={}", key, value);
        }

        write_entries(&path, &entries, self.write_mode)
            .await
            .map_err(|source| AvdError::FileSystem { path, source })
    }
}

async fn write_entries(
    path: &Path,
    entries: &[(String, String)],
    mode: ConfigWriteMode,
) -> std::io::Result<()> {
    match mode {
        ConfigWriteMode::Merge => config_ini::merge_entries(path, entries).await,
        ConfigWriteMode::Append => config_ini::append_entries(path, entries).await,
    }
}
