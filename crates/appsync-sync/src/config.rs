use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use appsync_catalogs::{inventory, workspace};
use appsync_http::HttpClientConfig;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub workspace_api_url: String,
    pub workspace_api_version: String,
    pub workspace_api_key: Option<String>,
    pub workspace_database_id: Option<String>,
    pub inventory_api_url: String,
    pub inventory_api_key: Option<String>,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub push_to_inventory: bool,
    pub push_to_workspace: bool,
    pub sync_cron: String,
    pub reports_dir: Option<PathBuf>,
}

/// Non-secret settings that may be kept in a YAML file. Api keys are not
/// accepted here; a file carrying them fails to parse.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub workspace_api_url: Option<String>,
    pub workspace_api_version: Option<String>,
    pub workspace_database_id: Option<String>,
    pub inventory_api_url: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub push_to_inventory: Option<bool>,
    pub push_to_workspace: Option<bool>,
    pub sync_cron: Option<String>,
    pub reports_dir: Option<PathBuf>,
}

/// Parses a set variable, warning when the value is unusable so the default
/// it falls back to is not silent.
fn parse_var<T>(key: &str, value: Option<String>, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let value = value?;
    let parsed = parse(&value);
    if parsed.is_none() {
        warn!(variable = key, %value, "ignoring unparsable value; using default");
    }
    parsed
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "True" | "yes" => Some(true),
        "0" | "false" | "FALSE" | "False" | "no" => Some(false),
        _ => None,
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset or blank variables
    /// fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            workspace_api_url: var("WORKSPACE_API_URL")
                .unwrap_or_else(|| workspace::DEFAULT_API_URL.to_string()),
            workspace_api_version: var("WORKSPACE_API_VERSION")
                .unwrap_or_else(|| workspace::DEFAULT_API_VERSION.to_string()),
            workspace_api_key: var("WORKSPACE_API_KEY"),
            workspace_database_id: var("WORKSPACE_DATABASE_ID"),
            inventory_api_url: var("INVENTORY_API_URL")
                .unwrap_or_else(|| inventory::DEFAULT_API_URL.to_string()),
            inventory_api_key: var("INVENTORY_API_KEY"),
            http_timeout_secs: parse_var(
                "APPSYNC_HTTP_TIMEOUT_SECS",
                var("APPSYNC_HTTP_TIMEOUT_SECS"),
                |v| v.trim().parse().ok(),
            )
            .unwrap_or(20),
            user_agent: var("APPSYNC_USER_AGENT").unwrap_or_else(|| "appsync/0.1".to_string()),
            push_to_inventory: parse_var(
                "APPSYNC_PUSH_TO_INVENTORY",
                var("APPSYNC_PUSH_TO_INVENTORY"),
                parse_flag,
            )
            .unwrap_or(true),
            push_to_workspace: parse_var(
                "APPSYNC_PUSH_TO_WORKSPACE",
                var("APPSYNC_PUSH_TO_WORKSPACE"),
                parse_flag,
            )
            .unwrap_or(true),
            sync_cron: var("APPSYNC_SYNC_CRON").unwrap_or_else(|| "0 0 * * * *".to_string()),
            reports_dir: var("APPSYNC_REPORTS_DIR").map(PathBuf::from),
        }
    }

    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let file: ConfigFile =
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        self.apply(file);
        Ok(self)
    }

    /// Values set in the file win over the environment.
    pub fn apply(&mut self, file: ConfigFile) {
        if let Some(v) = file.workspace_api_url {
            self.workspace_api_url = v;
        }
        if let Some(v) = file.workspace_api_version {
            self.workspace_api_version = v;
        }
        if let Some(v) = file.workspace_database_id {
            self.workspace_database_id = Some(v);
        }
        if let Some(v) = file.inventory_api_url {
            self.inventory_api_url = v;
        }
        if let Some(v) = file.http_timeout_secs {
            self.http_timeout_secs = v;
        }
        if let Some(v) = file.user_agent {
            self.user_agent = v;
        }
        if let Some(v) = file.push_to_inventory {
            self.push_to_inventory = v;
        }
        if let Some(v) = file.push_to_workspace {
            self.push_to_workspace = v;
        }
        if let Some(v) = file.sync_cron {
            self.sync_cron = v;
        }
        if file.reports_dir.is_some() {
            self.reports_dir = file.reports_dir;
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: Some(self.user_agent.clone()),
        }
    }

    pub fn database_id(&self) -> Result<&str> {
        require(&self.workspace_database_id, "WORKSPACE_DATABASE_ID")
    }

    pub fn workspace_api_key(&self) -> Result<&str> {
        require(&self.workspace_api_key, "WORKSPACE_API_KEY")
    }

    pub fn inventory_api_key(&self) -> Result<&str> {
        require(&self.inventory_api_key, "INVENTORY_API_KEY")
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .with_context(|| format!("{name} must be set"))
}
