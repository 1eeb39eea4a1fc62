// ABOUTME: Read-only view of the server's server.properties file.
// ABOUTME: Parses key=value lines, skipping comments and blanks.

use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerProperties {
    values: BTreeMap<String, String>,
}

impl ServerProperties {
    pub fn parse(content: &str) -> Self {
        let values = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();
        Self { values }
    }

    /// Load from disk; a missing file yields an empty set.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn max_players(&self) -> Option<u32> {
        self.get("max-players").and_then(|v| v.parse().ok())
    }

    pub fn difficulty(&self) -> Option<&str> {
        self.get("difficulty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_values_and_skips_comments() {
        let props = ServerProperties::parse(
            "# Minecraft Bedrock Server Properties\nserver-name=Dedicated Server\n\nmax-players=10\ndifficulty=easy\nlevel-seed=\n",
        );
        assert_eq!(props.get("server-name"), Some("Dedicated Server"));
        assert_eq!(props.max_players(), Some(10));
        assert_eq!(props.difficulty(), Some("easy"));
        assert_eq!(props.get("level-seed"), Some(""));
        assert_eq!(props.get("missing"), None);
    }

    #[test]
    fn missing_file_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let props = ServerProperties::load(&temp.path().join("server.properties")).unwrap();
        assert_eq!(props, ServerProperties::default());
    }
}
