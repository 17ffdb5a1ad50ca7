use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default)]
    pub addon_paths: Vec<String>,
    /// Extra globs skipped while walking module directories.
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_index_path")]
    pub path: String,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            path: default_index_path(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_index_path() -> String {
    ".index".to_string()
}

impl AppConfig {
    pub fn addon_roots(&self) -> Vec<PathBuf> {
        self.paths.addon_paths.iter().map(PathBuf::from).collect()
    }

    pub fn index_path(&self) -> PathBuf {
        PathBuf::from(&self.indexing.path)
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}

/// Like [`load`], but an unreadable or malformed file degrades to the defaults.
pub fn load_or_default(path: Option<&str>) -> AppConfig {
    match load(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Could not load configuration ({}), using defaults", e);
            AppConfig::default()
        }
    }
}
