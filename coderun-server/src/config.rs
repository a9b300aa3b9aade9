use coderun_judger::config::Executor;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct Config {
    #[validate]
    pub server: Server,

    #[validate]
    #[serde(default)]
    pub executor: Executor,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct Server {
    #[validate(length(min = 1))]
    pub host: String,

    pub port: u16,

    #[validate(range(min = 1, max = 256))]
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    8
}

static GLOBAL_CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: path = {}", path.display()))?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn init_from_file(path: impl AsRef<Path>) -> Result<&'static Config> {
        let config = Self::from_file(path)?;
        Ok(GLOBAL_CONFIG.get_or_init(|| config))
    }

    pub fn global() -> &'static Config {
        GLOBAL_CONFIG
            .get()
            .expect("config is not initialized")
    }
}
