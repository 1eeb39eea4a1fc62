// ABOUTME: Snapshot of the server's hand-edited settings files.
// ABOUTME: Keeps exactly one timestamped copy set, replacing the previous one.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

pub const SETTINGS_FILES: [&str; 3] = ["server.properties", "allowlist.json", "permissions.json"];

/// Replace the contents of `dest_dir` with `<timestamp>_<name>` copies of the settings files
/// present in `install_dir`. Returns the copies written.
pub fn snapshot_server_settings(
    install_dir: &Path,
    dest_dir: &Path,
    now: NaiveDateTime,
) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dest_dir)?;
    for entry in std::fs::read_dir(dest_dir)? {
        let path = entry?.path();
        if path.is_file() {
            std::fs::remove_file(&path)?;
        }
    }

    let stamp = now.format("%Y%m%d_%H%M%S");
    let mut written = Vec::new();
    for name in SETTINGS_FILES {
        let source = install_dir.join(name);
        if !source.is_file() {
            continue;
        }
        let dest = dest_dir.join(format!("{stamp}_{name}"));
        std::fs::copy(&source, &dest)?;
        written.push(dest);
    }

    tracing::debug!("saved {} settings file(s) to {}", written.len(), dest_dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_latest_snapshot() {
        let temp = tempfile::tempdir().unwrap();
        let install = temp.path().join("server_files");
        let dest = temp.path().join("server_settings");
        std::fs::create_dir_all(&install).unwrap();
        std::fs::write(install.join("server.properties"), "max-players=10\n").unwrap();
        std::fs::write(install.join("allowlist.json"), "[]").unwrap();

        let first = NaiveDateTime::parse_from_str("2025-01-01 00:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let second = NaiveDateTime::parse_from_str("2025-01-02 00:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        snapshot_server_settings(&install, &dest, first).unwrap();
        let written = snapshot_server_settings(&install, &dest, second).unwrap();

        assert_eq!(written.len(), 2);
        let mut names: Vec<String> = std::fs::read_dir(&dest)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "20250102_000000_allowlist.json",
                "20250102_000000_server.properties"
            ]
        );
    }
}
