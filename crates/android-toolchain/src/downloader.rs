//! Toolchain Downloader
//!
//! Fetches archives that sdkmanager can't provide: the command-line tools
//! themselves, and emulator builds pinned by build id.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Pinned command-line tools release
pub const CMDLINE_TOOLS_VERSION: &str = "11076708";

const REPOSITORY_URL: &str = "https://dl.google.com/android/repository";

const EMULATOR_REPOSITORY_URL: &str = "https://redirector.gvt1.com/edgedl/android/repository";

/// Download error types
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Extraction failed: {0}")]
    Extraction(String),
    #[error("Invalid response from {url}: HTTP {status}")]
    InvalidResponse { url: String, status: u16 },
    #[error("Unexpected emulator build: '{0}'")]
    InvalidBuild(String),
}

/// Host operating system, as named in repository archive names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
}

/// The machine the runner executes on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: HostOs,
    pub arm64: bool,
}

impl HostPlatform {
    pub fn current() -> Self {
        let os = if cfg!(target_os = "macos") {
            HostOs::MacOs
        } else if cfg!(windows) {
            HostOs::Windows
        } else {
            HostOs::Linux
        };
        Self {
            os,
            arm64: cfg!(target_arch = "aarch64"),
        }
    }

    /// Command-line tools archive URL for this host
    pub fn cmdline_tools_url(&self) -> String {
        let os = match self.os {
            HostOs::Linux => "linux",
            HostOs::MacOs => "mac",
            HostOs::Windows => "win",
        };
        format!(
            "{}/commandlinetools-{}-{}_latest.zip",
            REPOSITORY_URL, os, CMDLINE_TOOLS_VERSION
        )
    }

    /// Archive URL of a specific emulator build.
    ///
    /// Archive naming changed over time: builds from 8000000 on ship per-CPU
    /// archives, 7000000 onwards are x64 only, older ones carry no CPU suffix.
    pub fn emulator_build_url(&self, build: &str) -> Result<String, DownloadError> {
        let build_number: u64 = build
            .parse()
            .map_err(|_| DownloadError::InvalidBuild(build.to_string()))?;

        let suffix = if build_number >= 8_000_000 {
            if self.arm64 {
                format!("_aarch64-{}", build)
            } else {
                format!("_x64-{}", build)
            }
        } else if build_number >= 7_000_000 {
            format!("_x64-{}", build)
        } else {
            format!("-{}", build)
        };

        let os = match self.os {
            HostOs::Linux => "linux",
            HostOs::MacOs => "darwin",
            HostOs::Windows => "windows",
        };

        Ok(format!("{}/emulator-{}{}.zip", EMULATOR_REPOSITORY_URL, os, suffix))
    }
}

/// Toolchain downloader
pub struct ToolchainDownloader {
    client: Client,
}

impl ToolchainDownloader {
    /// Create a new downloader
    pub fn new() -> Result<Self, DownloadError> {
        let client = Client::builder()
            .user_agent(concat!("avd-runner/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Download `url` to `target`
    pub async fn download_file(&self, url: &str, target: &Path) -> Result<(), DownloadError> {
        info!("Downloading {} to {:?}", url, target);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(DownloadError::InvalidResponse {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut downloaded: u64 = 0;
        let mut file = tokio::fs::File::create(target).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await?;

        debug!("Downloaded {} bytes", downloaded);
        Ok(())
    }
}

/// Extract a ZIP file, keeping Unix permissions so tool binaries stay executable
pub async fn extract_zip(archive: &Path, target_dir: &Path) -> Result<(), DownloadError> {
    info!("Extracting {:?} to {:?}", archive, target_dir);

    let archive: PathBuf = archive.to_path_buf();
    let target_dir: PathBuf = target_dir.to_path_buf();

    // zip is synchronous
    tokio::task::spawn_blocking(move || -> Result<(), DownloadError> {
        let file = std::fs::File::open(&archive)?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| DownloadError::Extraction(e.to_string()))?;

        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .map_err(|e| DownloadError::Extraction(e.to_string()))?;

            let relative = entry.enclosed_name().map(Path::to_path_buf).ok_or_else(|| {
                DownloadError::Extraction(format!("unsafe path in archive: {}", entry.name()))
            })?;
            let outpath = target_dir.join(relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath)?;
            } else {
                if let Some(parent) = outpath.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut outfile = std::fs::File::create(&outpath)?;
                std::io::copy(&mut entry, &mut outfile)?;
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
                }
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| DownloadError::Extraction(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LINUX_X64: HostPlatform = HostPlatform { os: HostOs::Linux, arm64: false };
    const MAC_ARM: HostPlatform = HostPlatform { os: HostOs::MacOs, arm64: true };

    #[test]
    fn test_cmdline_tools_url() {
        assert_eq!(
            LINUX_X64.cmdline_tools_url(),
            "https://dl.google.com/android/repository/commandlinetools-linux-11076708_latest.zip"
        );
        assert!(MAC_ARM.cmdline_tools_url().contains("commandlinetools-mac-"));
    }

    #[test]
    fn test_emulator_build_url_suffixes() {
        assert_eq!(
            LINUX_X64.emulator_build_url("11237101").unwrap(),
            "https://redirector.gvt1.com/edgedl/android/repository/emulator-linux_x64-11237101.zip"
        );
        assert_eq!(
            MAC_ARM.emulator_build_url("11237101").unwrap(),
            "https://redirector.gvt1.com/edgedl/android/repository/emulator-darwin_aarch64-11237101.zip"
        );
        assert!(MAC_ARM
            .emulator_build_url("7425822")
            .unwrap()
            .ends_with("emulator-darwin_x64-7425822.zip"));
        assert!(LINUX_X64
            .emulator_build_url("6885378")
            .unwrap()
            .ends_with("emulator-linux-6885378.zip"));
    }

    #[test]
    fn test_emulator_build_url_rejects_non_numeric() {
        assert!(matches!(
            LINUX_X64.emulator_build_url("canary"),
            Err(DownloadError::InvalidBuild(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("emulator.zip");
        {
            let file = std::fs::File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::FileOptions::default().unix_permissions(0o755);
            zip.add_directory("emulator/", options).unwrap();
            zip.start_file("emulator/emulator", options).unwrap();
            zip.write_all(b"#!/bin/sh\n").unwrap();
            zip.finish().unwrap();
        }

        let target = dir.path().join("sdk");
        extract_zip(&archive, &target).await.unwrap();

        let binary = target.join("emulator").join("emulator");
        assert_eq!(std::fs::read_to_string(&binary).unwrap(), "#!/bin/sh\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&binary).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[tokio::test]
    async fn test_extract_rejects_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"not a zip").unwrap();

        let err = extract_zip(&archive, &dir.path().join("out")).await.unwrap_err();
        assert!(matches!(err, DownloadError::Extraction(_)));
    }
}
