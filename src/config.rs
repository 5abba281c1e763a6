//! Configuration Management
//!
//! Provider configuration is layered: config file, then environment
//! variables, then command line flags. Secrets are never written back.

use crate::selectel::auth::Credentials;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Environment variables read by [`Config::apply_env`]
pub const ENV_TOKEN: &str = "SEL_TOKEN";
pub const ENV_ENDPOINT: &str = "SEL_ENDPOINT";
pub const ENV_PROJECT_ID: &str = "SEL_PROJECT_ID";
pub const ENV_REGION: &str = "SEL_REGION";
pub const ENV_USERNAME: &str = "OS_USERNAME";
pub const ENV_PASSWORD: &str = "OS_PASSWORD";
pub const ENV_DOMAIN_NAME: &str = "OS_DOMAIN_NAME";
pub const ENV_AUTH_URL: &str = "OS_AUTH_URL";
pub const ENV_AUTH_REGION: &str = "OS_REGION_NAME";

/// Provider configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub auth_region: Option<String>,
    /// Default project for project-scoped commands
    #[serde(default)]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("domain_name", &self.domain_name)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("auth_url", &self.auth_url)
            .field("auth_region", &self.auth_region)
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("selvpc").join("config.json"))
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if config.token.is_some() || config.password.is_some() {
            tracing::warn!(
                "Secrets found in {}; prefer {} / {} environment variables",
                path.display(),
                ENV_TOKEN,
                ENV_PASSWORD
            );
        }
        Ok(config)
    }

    /// Persist `project_id` as the default project in the config file at `path`.
    ///
    /// Only that key is changed; everything else in the file is kept as
    /// written and no environment or flag overlays are persisted.
    pub fn save_project(path: &Path, project_id: &str) -> Result<()> {
        let mut document = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str::<Value>(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Value::Object(Map::new())
        };

        let Some(fields) = document.as_object_mut() else {
            anyhow::bail!("Config file {} is not a JSON object", path.display());
        };
        fields.insert("project_id".to_string(), Value::String(project_id.to_string()));

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&document)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        tracing::info!("Default project saved to {}", path.display());
        Ok(())
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`; empty values are ignored
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut Option<String>); 9] = [
            (ENV_TOKEN, &mut self.token),
            (ENV_ENDPOINT, &mut self.endpoint),
            (ENV_PROJECT_ID, &mut self.project_id),
            (ENV_REGION, &mut self.region),
            (ENV_USERNAME, &mut self.user),
            (ENV_PASSWORD, &mut self.password),
            (ENV_DOMAIN_NAME, &mut self.domain_name),
            (ENV_AUTH_URL, &mut self.auth_url),
            (ENV_AUTH_REGION, &mut self.auth_region),
        ];

        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *field = Some(value);
            }
        }
    }

    /// Build provider credentials (not yet validated)
    pub fn credentials(&self) -> Credentials {
        let value = |field: &Option<String>| field.clone().unwrap_or_default();
        Credentials {
            token: value(&self.token),
            username: value(&self.user),
            password: value(&self.password),
            domain_name: value(&self.domain_name),
            region: value(&self.region),
            endpoint: value(&self.endpoint),
            auth_url: value(&self.auth_url),
            auth_region: value(&self.auth_region),
        }
    }

    /// Get effective project (CLI > env > config)
    pub fn effective_project(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.project_id.clone())
    }
}
