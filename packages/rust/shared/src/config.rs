//! Application configuration for the org hierarchy tools.
//!
//! User config lives at `~/.orgchart/orgchart.toml`.
//! CLI flags override config file values, which override defaults.
//! Credentials are never stored in the file: the `[graph]` section names the
//! environment variables that hold them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OrgChartError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "orgchart.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".orgchart";

// ---------------------------------------------------------------------------
// Config structs (matching orgchart.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory API connection settings.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Tree construction settings.
    #[serde(default)]
    pub hierarchy: HierarchyConfig,

    /// Record eligibility settings.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Output locations.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[graph]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Name of the env var holding the tenant id.
    #[serde(default = "default_tenant_id_env")]
    pub tenant_id_env: String,

    /// Name of the env var holding the application (client) id.
    #[serde(default = "default_client_id_env")]
    pub client_id_env: String,

    /// Name of the env var holding the client secret.
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,

    /// Graph API base URL (no trailing slash).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// OAuth2 authority (no trailing slash).
    #[serde(default = "default_authority_url")]
    pub authority_url: String,

    /// `$top` page size.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for throttled or transiently failing requests.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retries when the server sends no `Retry-After`.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            tenant_id_env: default_tenant_id_env(),
            client_id_env: default_client_id_env(),
            client_secret_env: default_client_secret_env(),
            base_url: default_base_url(),
            authority_url: default_authority_url(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_tenant_id_env() -> String {
    "TENANT_ID".into()
}
fn default_client_id_env() -> String {
    "CLIENT_ID".into()
}
fn default_client_secret_env() -> String {
    "CLIENT_SECRET".into()
}
fn default_base_url() -> String {
    "https://graph.microsoft.com/beta".into()
}
fn default_authority_url() -> String {
    "https://login.microsoftonline.com".into()
}
fn default_page_size() -> u32 {
    999
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    2000
}

/// `[hierarchy]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Maximum manager-chain hops before a walk is declared cyclic.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
        }
    }
}

fn default_max_hops() -> usize {
    100
}

/// `[filter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Exclusion patterns mapped to a human-readable reason.
    ///
    /// Patterns containing `*`, `?` or `[` are globs matched against the whole
    /// value; anything else is a substring match. Matching ignores case.
    #[serde(default = "default_exclusions")]
    pub exclusions: BTreeMap<String, String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclusions: default_exclusions(),
        }
    }
}

fn default_exclusions() -> BTreeMap<String, String> {
    [
        ("#EXT#", "external guest"),
        ("svc_*", "service account"),
        ("service*", "service account"),
        ("admin*", "administrative account"),
        ("*.onmicrosoft.com", "unmanaged tenant default domain"),
    ]
    .into_iter()
    .map(|(p, r)| (p.to_string(), r.to_string()))
    .collect()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving `org_hierarchy_*.json` files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Append-only execution log. Relative paths resolve against `output_dir`.
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            log_file: default_log_file(),
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_log_file() -> String {
    "org_hierarchy.log".into()
}

impl OutputConfig {
    /// Resolved log file path.
    pub fn log_path(&self) -> PathBuf {
        let log = PathBuf::from(&self.log_file);
        if log.is_absolute() {
            log
        } else {
            PathBuf::from(&self.output_dir).join(log)
        }
    }
}

// ---------------------------------------------------------------------------
// Build config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime hierarchy build configuration, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Hop bound for manager-chain walks.
    pub max_hops: usize,
    /// Exclusion pattern → reason.
    pub exclusions: BTreeMap<String, String>,
    /// Scoped mode: root the output at this manager.
    pub start_manager_email: Option<String>,
}

impl From<&AppConfig> for BuildConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_hops: config.hierarchy.max_hops,
            exclusions: config.filter.exclusions.clone(),
            start_manager_email: None,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Client-credentials secrets resolved from the environment.
#[derive(Clone)]
pub struct GraphCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for GraphCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Read tenant id, client id and secret from the env vars named in `[graph]`.
pub fn resolve_credentials(config: &GraphConfig) -> Result<GraphCredentials> {
    Ok(GraphCredentials {
        tenant_id: require_env(&config.tenant_id_env)?,
        client_id: require_env(&config.client_id_env)?,
        client_secret: require_env(&config.client_secret_env)?,
    })
}

fn require_env(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(OrgChartError::config(format!(
            "credential not found. Set the {var_name} environment variable (or add it to .env)."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.orgchart/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| OrgChartError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.orgchart/orgchart.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OrgChartError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        OrgChartError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OrgChartError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OrgChartError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OrgChartError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
