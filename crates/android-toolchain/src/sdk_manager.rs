//! SDK Manager
//!
//! Wraps the Android SDK manager to install everything an emulator run
//! needs: platform, system image, emulator, and optional NDK/CMake.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use avd_runner_core::{locate_sdk_tool, Arch, CommandRunner, EmulatorConfig, ProcessError, RunnerEnvironment, ToolCommand};
use tempfile::TempDir;
use tracing::{debug, info, info_span, Instrument};

use crate::downloader::{extract_zip, DownloadError, HostPlatform, ToolchainDownloader};

/// Build tools release installed alongside the platform
pub const BUILD_TOOLS_VERSION: &str = "35.0.0";

/// Answers fed to `sdkmanager --licenses`, one per license prompt
const LICENSE_ANSWERS: usize = 64;

/// File name downloaded archives are saved under
const ARCHIVE_NAME: &str = "download.zip";

/// SDK component types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkComponent {
    Platform(String),       // platforms;android-XX
    BuildTools(String),     // build-tools;XX.X.X
    PlatformTools,          // platform-tools
    SystemImage { api_level: String, target: String, arch: Arch },
    Emulator,               // emulator
    Ndk(String),            // ndk;XX.X.XXXXX
    Cmake(String),          // cmake;X.XX.X
}

impl SdkComponent {
    /// Get the SDK manager package name
    pub fn package_name(&self) -> String {
        match self {
            SdkComponent::Platform(api) => format!("platforms;android-{}", api),
            SdkComponent::BuildTools(version) => format!("build-tools;{}", version),
            SdkComponent::PlatformTools => "platform-tools".to_string(),
            SdkComponent::SystemImage { api_level, target, arch } => {
                format!("system-images;android-{};{};{}", api_level, target, arch)
            }
            SdkComponent::Emulator => "emulator".to_string(),
            SdkComponent::Ndk(version) => format!("ndk;{}", version),
            SdkComponent::Cmake(version) => format!("cmake;{}", version),
        }
    }
}

/// SDK installation errors
#[derive(Debug, thiserror::Error)]
pub enum SdkInstallError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("Failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What to install for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkInstallRequest {
    pub api_level: String,
    pub system_image_api_level: String,
    pub target: String,
    pub arch: Arch,
    /// Highest channel id packages may come from
    pub channel_id: u32,
    pub emulator_build: Option<String>,
    pub ndk_version: Option<String>,
    pub cmake_version: Option<String>,
}

impl From<&EmulatorConfig> for SdkInstallRequest {
    fn from(config: &EmulatorConfig) -> Self {
        Self {
            api_level: config.api_level.clone(),
            system_image_api_level: config.system_image_api_level.clone(),
            target: config.target.clone(),
            arch: config.arch,
            channel_id: config.channel_id(),
            emulator_build: config.emulator_build.clone(),
            ndk_version: config.ndk_version.clone(),
            cmake_version: config.cmake_version.clone(),
        }
    }
}

impl SdkInstallRequest {
    /// Components installed without a channel filter
    pub fn base_components(&self) -> Vec<SdkComponent> {
        vec![
            SdkComponent::BuildTools(BUILD_TOOLS_VERSION.to_string()),
            SdkComponent::PlatformTools,
            SdkComponent::Platform(self.api_level.clone()),
        ]
    }

    pub fn system_image(&self) -> SdkComponent {
        SdkComponent::SystemImage {
            api_level: self.system_image_api_level.clone(),
            target: self.target.clone(),
            arch: self.arch,
        }
    }
}

/// Installs SDK packages through `sdkmanager`
pub struct SdkInstaller<R> {
    sdk_root: PathBuf,
    avd_home: PathBuf,
    runner: Arc<R>,
    host: HostPlatform,
}

impl<R: CommandRunner> SdkInstaller<R> {
    pub fn new(env: &RunnerEnvironment, runner: Arc<R>) -> Self {
        Self {
            sdk_root: env.sdk_root.clone(),
            avd_home: env.avd_home.clone(),
            runner,
            host: HostPlatform::current(),
        }
    }

    /// Override host detection, used when picking archive URLs
    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    /// Get the SDK root path
    pub fn sdk_root(&self) -> &Path {
        &self.sdk_root
    }

    /// Base sdkmanager command with the SDK location in its environment
    fn command(&self) -> ToolCommand {
        let sdk_root = self.sdk_root.to_string_lossy().into_owned();
        ToolCommand::new(locate_sdk_tool(&self.sdk_root, "sdkmanager"))
            .env("ANDROID_HOME", sdk_root.clone())
            .env("ANDROID_SDK_ROOT", sdk_root)
    }

    /// Install everything `request` asks for, stopping at the first failure
    pub async fn install(&self, request: &SdkInstallRequest) -> Result<(), SdkInstallError> {
        self.install_all(request)
            .instrument(info_span!("install_sdk"))
            .await
    }

    async fn install_all(&self, request: &SdkInstallRequest) -> Result<(), SdkInstallError> {
        self.ensure_cmdline_tools().await?;
        self.ensure_avd_home().await?;
        self.accept_licenses().await?;

        info!("Installing latest build tools, platform tools, and platform.");
        self.install_packages(&request.base_components(), None).await?;

        info!("Installing latest emulator.");
        self.install_packages(&[SdkComponent::Emulator], Some(request.channel_id))
            .await?;

        if let Some(build) = &request.emulator_build {
            self.install_emulator_build(build).await?;
        }

        info!("Installing system images.");
        self.install_packages(&[request.system_image()], Some(request.channel_id))
            .await?;

        if let Some(ndk) = &request.ndk_version {
            info!("Installing NDK {}.", ndk);
            self.install_packages(&[SdkComponent::Ndk(ndk.clone())], Some(request.channel_id))
                .await?;
        }

        if let Some(cmake) = &request.cmake_version {
            info!("Installing CMake {}.", cmake);
            self.install_packages(&[SdkComponent::Cmake(cmake.clone())], Some(request.channel_id))
                .await?;
        }

        Ok(())
    }

    /// Bootstrap the command-line tools when the SDK has none
    async fn ensure_cmdline_tools(&self) -> Result<(), SdkInstallError> {
        let cmdline_tools = self.sdk_root.join("cmdline-tools");
        if cmdline_tools.exists() {
            debug!("Command-line tools present at {:?}", cmdline_tools);
            return Ok(());
        }

        info!("Installing command-line tools.");
        let download = self.fetch_archive(&self.host.cmdline_tools_url()).await?;
        self.install_cmdline_tools_from(&download.path().join(ARCHIVE_NAME))
            .await
    }

    /// Unpack a command-line tools archive to `<sdk_root>/cmdline-tools/latest`
    pub async fn install_cmdline_tools_from(&self, archive: &Path) -> Result<(), SdkInstallError> {
        let staging = self.scratch_dir().await?;
        extract_zip(archive, staging.path()).await?;

        // the archive unpacks to cmdline-tools/, sdkmanager expects cmdline-tools/latest/
        let cmdline_tools = self.sdk_root.join("cmdline-tools");
        tokio::fs::create_dir_all(&cmdline_tools)
            .await
            .map_err(|source| SdkInstallError::Io {
                path: cmdline_tools.clone(),
                source,
            })?;
        let latest = cmdline_tools.join("latest");
        tokio::fs::rename(staging.path().join("cmdline-tools"), &latest)
            .await
            .map_err(|source| SdkInstallError::Io { path: latest, source })?;

        Ok(())
    }

    /// Download `url` into a scratch directory under the SDK root
    async fn fetch_archive(&self, url: &str) -> Result<TempDir, SdkInstallError> {
        let scratch = self.scratch_dir().await?;
        ToolchainDownloader::new()?
            .download_file(url, &scratch.path().join(ARCHIVE_NAME))
            .await?;
        Ok(scratch)
    }

    /// Temporary directory inside the SDK root, removed on drop
    async fn scratch_dir(&self) -> Result<TempDir, SdkInstallError> {
        let io_err = |source| SdkInstallError::Io {
            path: self.sdk_root.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.sdk_root).await.map_err(io_err)?;
        tempfile::tempdir_in(&self.sdk_root).map_err(io_err)
    }

    async fn ensure_avd_home(&self) -> Result<(), SdkInstallError> {
        tokio::fs::create_dir_all(&self.avd_home)
            .await
            .map_err(|source| SdkInstallError::Io {
                path: self.avd_home.clone(),
                source,
            })
    }

    /// Accept all licenses
    pub async fn accept_licenses(&self) -> Result<(), SdkInstallError> {
        info!("Accepting Android SDK licenses...");
        let cmd = self.command().arg("--licenses").stdin("y\n".repeat(LICENSE_ANSWERS));
        self.runner.run(&cmd).await?;
        Ok(())
    }

    /// Install SDK components, optionally capped at a release channel
    pub async fn install_packages(
        &self,
        components: &[SdkComponent],
        channel_id: Option<u32>,
    ) -> Result<(), SdkInstallError> {
        let packages: Vec<String> = components.iter().map(SdkComponent::package_name).collect();
        debug!("Installing SDK packages: {:?}", packages);

        let mut cmd = self.command().arg("--install").args(packages);
        if let Some(id) = channel_id {
            cmd = cmd.arg(format!("--channel={}", id));
        }

        self.runner.run(&cmd).await?;
        Ok(())
    }

    /// Replace the emulator with a specific build from the Android CI server
    async fn install_emulator_build(&self, build: &str) -> Result<(), SdkInstallError> {
        info!("Installing emulator build {}.", build);
        let url = self.host.emulator_build_url(build)?;
        let download = self.fetch_archive(&url).await?;
        self.install_emulator_build_from(&download.path().join(ARCHIVE_NAME))
            .await
    }

    /// Unpack an emulator build archive over the SDK root
    pub async fn install_emulator_build_from(&self, archive: &Path) -> Result<(), SdkInstallError> {
        extract_zip(archive, &self.sdk_root).await?;
        Ok(())
    }
}
