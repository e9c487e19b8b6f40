use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::headline::{is_valid_time_format, DEFAULT_TIME_FORMAT};

const DEFAULT_ENV_PREFIX: &str = "SLASHDOT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default)]
    pub format: FormatConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub ui: UIConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            format: FormatConfig::default(),
            browser: BrowserConfig::default(),
            ui: UIConfig::default(),
        }
    }
}

fn default_database() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slashdot")
        .join("headlines.json")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatConfig {
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            time_format: default_time_format(),
        }
    }
}

fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

/// An empty command means the desktop's default browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BrowserConfig {
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_message_timeout", with = "humantime_serde")]
    pub message_timeout: Duration,
    #[serde(default)]
    pub copy_to_clipboard: bool,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            message_timeout: default_message_timeout(),
            copy_to_clipboard: false,
        }
    }
}

fn default_message_timeout() -> Duration {
    Duration::from_secs(4)
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            cfg = read_config_file(path)?;
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            cfg = read_config_file(&default_path)?;
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    anyhow::ensure!(
        is_valid_time_format(&cfg.format.time_format),
        "config: format.time_format {:?} is not a valid strftime pattern",
        cfg.format.time_format
    );

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "database" => cfg.database = PathBuf::from(value),
        "format.time_format" => cfg.format.time_format = value,
        "browser.command" => {
            cfg.browser.command = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "ui.message_timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.message_timeout = duration;
            }
        }
        "ui.copy_to_clipboard" => {
            cfg.ui.copy_to_clipboard = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("slashdot-tui").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated(prefix: &str) -> LoadOptions {
        let missing = std::env::temp_dir().join("slashdot-tui-no-such-config.yaml");
        LoadOptions {
            config_file: Some(missing),
            env_prefix: Some(prefix.to_string()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(isolated("SLASHDOT_TEST_DEFAULTS")).unwrap();
        assert_eq!(cfg.format.time_format, DEFAULT_TIME_FORMAT);
        assert!(cfg.browser.command.is_empty());
        assert_eq!(cfg.ui.message_timeout, Duration::from_secs(4));
        assert!(cfg.database.ends_with("slashdot/headlines.json"));
    }

    #[test]
    fn reads_yaml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "database: /tmp/headlines.json\n\
             browser:\n  command: [firefox, --new-tab, \"%URL%\"]\n\
             ui:\n  message_timeout: 10s\n  copy_to_clipboard: true\n",
        )
        .unwrap();

        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("SLASHDOT_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.database, PathBuf::from("/tmp/headlines.json"));
        assert_eq!(cfg.browser.command, ["firefox", "--new-tab", "%URL%"]);
        assert_eq!(cfg.ui.message_timeout, Duration::from_secs(10));
        assert!(cfg.ui.copy_to_clipboard);
        assert_eq!(cfg.format.time_format, DEFAULT_TIME_FORMAT);
    }

    #[test]
    fn env_overrides() {
        env::set_var("SLASHDOT_TEST_ENV_DATABASE", "/srv/news.json");
        env::set_var("SLASHDOT_TEST_ENV_BROWSER__COMMAND", "lynx, -accept_all_cookies");
        let cfg = load(isolated("SLASHDOT_TEST_ENV")).unwrap();
        assert_eq!(cfg.database, PathBuf::from("/srv/news.json"));
        assert_eq!(cfg.browser.command, ["lynx", "-accept_all_cookies"]);
        env::remove_var("SLASHDOT_TEST_ENV_DATABASE");
        env::remove_var("SLASHDOT_TEST_ENV_BROWSER__COMMAND");
    }

    #[test]
    fn invalid_time_format_is_rejected() {
        env::set_var("SLASHDOT_TEST_BADFMT_FORMAT__TIME_FORMAT", "%Q");
        let err = load(isolated("SLASHDOT_TEST_BADFMT")).unwrap_err();
        env::remove_var("SLASHDOT_TEST_BADFMT_FORMAT__TIME_FORMAT");
        assert!(err.to_string().contains("format.time_format"), "error was {err}");
    }
}
