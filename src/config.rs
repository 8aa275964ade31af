// 🔧 Configuration
//
// Resolution order (later wins):
//   1. defaults under a base directory ($DOCGEN_HOME or the cwd)
//        database/app.db, templates/, clients/
//   2. <base>/docgen.json, if present (relative paths are taken from <base>)
//   3. env: DOCGEN_DB, DOCGEN_TEMPLATES, DOCGEN_OUTPUT,
//           DOCGEN_LOOKUP_TIMEOUT_SECS, DOCGEN_ADDR

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "docgen.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub templates_dir: PathBuf,
    pub clients_dir: PathBuf,

    /// Upper bound for store lookups and document writes (server only)
    pub lookup_timeout_secs: u64,

    pub server_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("database").join("app.db"),
            templates_dir: PathBuf::from("templates"),
            clients_dir: PathBuf::from("clients"),
            lookup_timeout_secs: 10,
            server_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults rooted at `base`
    pub fn with_base_dir(base: &Path) -> Self {
        AppConfig::default().rooted_at(base)
    }

    /// Read a JSON config file; relative paths are resolved against `base`
    pub fn from_file(path: &Path, base: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config.rooted_at(base))
    }

    /// Full resolution: defaults → config file → environment
    pub fn load() -> Result<Self> {
        let base = match env::var_os("DOCGEN_HOME") {
            Some(home) => PathBuf::from(home),
            None => env::current_dir().context("Failed to determine current directory")?,
        };

        let file = base.join(CONFIG_FILE_NAME);
        let mut config = if file.exists() {
            AppConfig::from_file(&file, &base)?
        } else {
            AppConfig::with_base_dir(&base)
        };

        if let Some(db) = env::var_os("DOCGEN_DB") {
            config.database_path = PathBuf::from(db);
        }
        if let Some(dir) = env::var_os("DOCGEN_TEMPLATES") {
            config.templates_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env::var_os("DOCGEN_OUTPUT") {
            config.clients_dir = PathBuf::from(dir);
        }
        if let Ok(secs) = env::var("DOCGEN_LOOKUP_TIMEOUT_SECS") {
            config.lookup_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("DOCGEN_LOOKUP_TIMEOUT_SECS is not a number: {}", secs))?;
        }
        if let Ok(addr) = env::var("DOCGEN_ADDR") {
            config.server_addr = addr;
        }

        Ok(config)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    fn rooted_at(mut self, base: &Path) -> Self {
        let root = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.database_path = root(self.database_path);
        self.templates_dir = root(self.templates_dir);
        self.clients_dir = root(self.clients_dir);
        self
    }
}
