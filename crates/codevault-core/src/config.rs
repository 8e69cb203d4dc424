//! Server configuration
//!
//! Loaded from TOML when a file is given, falls back to defaults otherwise.
//! Environment variables override the file; CLI flags override both.

use crate::error::{Error, Result};
use crate::policy::ScoringPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: BindMode,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
    pub admin: AdminConfig,
    pub policy: ScoringPolicy,
    pub data: DataConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            bind: BindMode::default(),
            cors_origins: Vec::new(),
            admin: AdminConfig::default(),
            policy: ScoringPolicy::default(),
            data: DataConfig::default(),
        }
    }
}

/// Bind mode for the HTTP server
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    Loopback,
    #[default]
    Lan,
}

impl BindMode {
    pub fn to_addr(&self) -> &str {
        match self {
            BindMode::Loopback => "127.0.0.1",
            BindMode::Lan => "0.0.0.0",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "loopback" | "localhost" | "127.0.0.1" => BindMode::Loopback,
            _ => BindMode::Lan,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdminConfig {
    /// Admin identifier, compared case-insensitively.
    pub id: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self { id: "admin".into() }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DataConfig {
    /// JSON team file. Teams live in memory only when unset.
    pub teams_path: Option<PathBuf>,
    /// JSON level catalog. The built-in levels are used when unset.
    pub catalog_path: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load `path` if given, then apply environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = var("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid PORT: {port}")))?;
        }
        if let Some(bind) = var("CODEVAULT_BIND") {
            self.bind = BindMode::parse(bind.trim());
        }
        if let Some(origins) = var("CORS_ORIGIN") {
            self.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(admin) = var("ADMIN_ID") {
            self.admin.id = admin.trim().to_string();
        }
        if let Some(score) = var("DEFAULT_START_SCORE") {
            // Unparseable values keep the configured score.
            if let Ok(score) = score.trim().parse() {
                self.policy.start_score = score;
            }
        }
        if let Some(path) = var("CODEVAULT_TEAMS") {
            self.data.teams_path = Some(PathBuf::from(path));
        }
        if let Some(path) = var("CODEVAULT_CATALOG") {
            self.data.catalog_path = Some(PathBuf::from(path));
        }
        Ok(())
    }
}
