//! Android Toolchain Management
//!
//! Handles installation of the SDK components an emulator run needs:
//! - Command-line tools (bootstrapped when missing)
//! - Platform, build tools and platform tools
//! - Emulator, including pinned emulator builds
//! - System images, NDK and CMake

pub mod downloader;
pub mod sdk_manager;

pub use downloader::{DownloadError, HostOs, HostPlatform, ToolchainDownloader, CMDLINE_TOOLS_VERSION};
pub use sdk_manager::{SdkComponent, SdkInstallError, SdkInstallRequest, SdkInstaller, BUILD_TOOLS_VERSION};
