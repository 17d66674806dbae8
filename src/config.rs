//! Configuration resolution
//!
//! Settings come from `~/.timetrack/rc`, one `key=value` per line:
//!
//! ```text
//! # where the ledger lives (relative paths resolve against ~/.timetrack)
//! data.location=./ledger.db
//! # append logs here instead of stderr
//! log.location=/tmp/timetrack.log
//! ```
//!
//! `TIMETRACK_DATA_PATH` and `TIMETRACK_LOG_PATH` override the file.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const DATA_PATH_ENV: &str = "TIMETRACK_DATA_PATH";
pub const LOG_PATH_ENV: &str = "TIMETRACK_LOG_PATH";

const CONFIG_DIR: &str = ".timetrack";
const CONFIG_FILE: &str = "rc";
const DEFAULT_DB_FILE: &str = "ledger.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_location: PathBuf,
    pub log_location: Option<PathBuf>,
}

impl Config {
    /// Load configuration for the current user
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Failed to determine home directory")?;
        Self::resolve(&home, |key| std::env::var_os(key))
    }

    /// Resolve configuration rooted at `home`, reading overrides through `env`
    pub fn resolve<F>(home: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let config_dir = home.join(CONFIG_DIR);
        let config_path = config_dir.join(CONFIG_FILE);

        let mut config = Config {
            data_location: config_dir.join(DEFAULT_DB_FILE),
            log_location: None,
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
            config.apply_rc(&content, &config_dir);
        }

        if let Some(path) = env(DATA_PATH_ENV).filter(|v| !v.is_empty()) {
            config.data_location = PathBuf::from(path);
        }
        if let Some(path) = env(LOG_PATH_ENV).filter(|v| !v.is_empty()) {
            config.log_location = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    fn apply_rc(&mut self, content: &str, config_dir: &Path) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let path = resolve_relative(config_dir, value);
            match key.trim() {
                "data.location" => self.data_location = path,
                "log.location" => self.log_location = Some(path),
                _ => {}
            }
        }
    }
}

fn resolve_relative(base: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}
