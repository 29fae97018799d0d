//! `load_config`: reads the optional YAML file and maps it onto run settings.
//!
//! The file holds non-secret settings only. Credentials come from flags or the
//! environment; a `user` or `password` key in the file is rejected as unknown.
//!
//! ```yaml
//! base_url: https://acme-admin.3scale.net
//! output_dir: ./cms
//! skip: [Archive]
//! browser:
//!   headless: true
//!   implicit_wait_secs: 15
//!   tab_wait_secs: 3
//! ```
use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::browser::BrowserOptions;
use cms_export_core::config::DEFAULT_TAB_WAIT;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub skip: Vec<String>,
    #[serde(default)]
    pub browser: BrowserSection,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserSection {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub implicit_wait_secs: u64,
    pub tab_wait_secs: u64,
}

impl Default for BrowserSection {
    fn default() -> Self {
        let defaults = BrowserOptions::default();
        Self {
            headless: defaults.headless,
            chrome_path: defaults.chrome_path,
            implicit_wait_secs: defaults.implicit_wait.as_secs(),
            tab_wait_secs: DEFAULT_TAB_WAIT.as_secs(),
        }
    }
}

impl BrowserSection {
    pub fn options(&self) -> BrowserOptions {
        BrowserOptions {
            headless: self.headless,
            chrome_path: self.chrome_path.clone(),
            implicit_wait: Duration::from_secs(self.implicit_wait_secs),
        }
    }

    pub fn tab_wait(&self) -> Duration {
        Duration::from_secs(self.tab_wait_secs)
    }
}

/// Loads a static YAML config file (no secrets).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid, all-defaults config.
    if config_content.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}
