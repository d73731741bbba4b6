//! AVD `config.ini` editing
//!
//! `config.ini` is a flat `key=value` file written by avdmanager, read here
//! through the sectionless `default` section of `configparser`.

use std::path::Path;

use configparser::ini::Ini;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Section holding keys that appear before any `[section]` header
const DEFAULT_SECTION: &str = "default";

fn render_entries(entries: &[(String, String)]) -> String {
    entries
        .iter()
        .map(|(key, value)| format!("{}={}\n", key, value))
        .collect()
}

/// Append `entries` as `key=value` lines, creating the file if needed
pub async fn append_entries(path: &Path, entries: &[(String, String)]) -> std::io::Result<()> {
    let mut content = render_entries(entries);

    // keep the first appended entry off an unterminated last line
    if let Ok(existing) = tokio::fs::read(path).await {
        if existing.last().is_some_and(|b| *b != b'\n') {
            content.insert(0, '\n');
        }
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;

    debug!("Appended {} entries to {:?}", entries.len(), path);
    Ok(())
}

/// Write `entries` into the file. Existing keys keep their position and take
/// the new value, new keys go to the end.
pub async fn merge_entries(path: &Path, entries: &[(String, String)]) -> std::io::Result<()> {
    let existing = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    // hw.ramSize and friends are case-sensitive
    let mut config = Ini::new_cs();
    config
        .read(existing)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    for (key, value) in entries {
        config.set(DEFAULT_SECTION, key, Some(value.clone()));
    }

    tokio::fs::write(path, config.writes()).await?;

    debug!("Merged {} entries into {:?}", entries.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const AVD_CONFIG: &str = "\
AvdId=test
abi.type=x86_64
hw.cpu.ncore=4
hw.ramSize=1536
image.sysdir.1=system-images/android-30/google_apis_playstore/x86_64/
";

    fn entries(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn read_ini(path: &Path) -> Ini {
        let mut ini = Ini::new_cs();
        ini.read(std::fs::read_to_string(path).unwrap()).unwrap();
        ini
    }

    fn keys(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter_map(|l| l.split_once('=').map(|(k, _)| k.trim().to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_append_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "AvdId=test").unwrap();

        let overrides = entries(&[("hw.cpu.ncore", "2"), ("hw.ramSize", "2048")]);
        append_entries(&path, &overrides).await.unwrap();
        append_entries(&path, &overrides).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "AvdId=test\nhw.cpu.ncore=2\nhw.ramSize=2048\nhw.cpu.ncore=2\nhw.ramSize=2048\n"
        );
    }

    #[tokio::test]
    async fn test_merge_replaces_in_place_and_appends_new_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, AVD_CONFIG).unwrap();

        let overrides = entries(&[("hw.cpu.ncore", "2"), ("hw.keyboard", "yes")]);
        merge_entries(&path, &overrides).await.unwrap();

        assert_eq!(
            keys(&path),
            [
                "AvdId",
                "abi.type",
                "hw.cpu.ncore",
                "hw.ramSize",
                "image.sysdir.1",
                "hw.keyboard"
            ]
        );
        let ini = read_ini(&path);
        assert_eq!(ini.get(DEFAULT_SECTION, "hw.cpu.ncore").as_deref(), Some("2"));
        assert_eq!(ini.get(DEFAULT_SECTION, "hw.ramSize").as_deref(), Some("1536"));
        assert_eq!(
            ini.get(DEFAULT_SECTION, "image.sysdir.1").as_deref(),
            Some("system-images/android-30/google_apis_playstore/x86_64/")
        );
    }

    #[tokio::test]
    async fn test_merge_keeps_key_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "hw.ramSize=1024\n").unwrap();

        merge_entries(&path, &entries(&[("hw.ramSize", "4096")])).await.unwrap();

        assert_eq!(keys(&path), ["hw.ramSize"]);
        assert_eq!(read_ini(&path).get(DEFAULT_SECTION, "hw.ramSize").as_deref(), Some("4096"));
    }

    #[tokio::test]
    async fn test_merge_collapses_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "hw.ramSize=1024\nAvdId=a\nhw.ramSize=2048\n").unwrap();

        merge_entries(&path, &entries(&[("hw.ramSize", "4096")])).await.unwrap();

        assert_eq!(keys(&path), ["hw.ramSize", "AvdId"]);
        assert_eq!(read_ini(&path).get(DEFAULT_SECTION, "hw.ramSize").as_deref(), Some("4096"));
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, AVD_CONFIG).unwrap();

        let overrides = entries(&[("hw.cpu.ncore", "2"), ("disk.dataPartition.size", "4G")]);
        merge_entries(&path, &overrides).await.unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        merge_entries(&path, &overrides).await.unwrap();
        let second = std::fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(keys(&path).len(), 6);
        assert_eq!(
            read_ini(&path).get(DEFAULT_SECTION, "disk.dataPartition.size").as_deref(),
            Some("4G")
        );
    }

    #[tokio::test]
    async fn test_merge_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        merge_entries(&path, &entries(&[("hw.keyboard", "yes")])).await.unwrap();
        assert_eq!(keys(&path), ["hw.keyboard"]);
        assert_eq!(read_ini(&path).get(DEFAULT_SECTION, "hw.keyboard").as_deref(), Some("yes"));
    }
}
