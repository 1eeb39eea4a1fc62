// ABOUTME: Config scaffolding for a new server directory.
// ABOUTME: Writes a commented keeper.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(&Config::default());
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"server:
  binary: {binary}
  stop_timeout: 30s
  restart_grace: 10s
  restart_notice_seconds: {restart_notice}

backup:
  enabled: false
  # every: hours | daily | weekly | monthly
  cadence:
    every: hours
    hours: 6
  notify_seconds: {backup_notify}
  max_size_gb: {max_size}

update:
  enabled: false
  cadence:
    every: daily
    at: "04:00"
  notify_minutes: {update_notify}
  platform: {platform}
"#,
        binary = config.server.binary,
        restart_notice = config.server.restart_notice_seconds,
        backup_notify = config.backup.notify_seconds,
        max_size = config.backup.max_size_gb,
        update_notify = config.update.notify_minutes,
        platform = config.update.platform,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_round_trips_through_parser() {
        let yaml = generate_template_yaml(&Config::default());
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.server.binary, Config::default().server.binary);
        assert!(!parsed.backup.enabled);
    }
}
