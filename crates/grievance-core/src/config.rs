use anyhow::{Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::{Profile, RoleTable};
use crate::store::StorageKeys;

pub const CONFIG_FILE: &str = "config.toml";
pub const HOME_ENV: &str = "GRIEVANCE_HOME";
const PLACEHOLDER_SCRIPT_URL: &str = "https://script.google.com/macros/s/YOUR_DEPLOYMENT_ID/exec";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub organization: OrganizationConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageKeys,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationConfig {
    #[serde(default = "default_org_name")]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            name: default_org_name(),
            address: String::new(),
            city: String::new(),
            phone: String::new(),
            email: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetsConfig {
    #[serde(default = "default_script_url")]
    pub script_url: String,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            script_url: default_script_url(),
            sheet_name: default_sheet_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SheetsConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the identity service, e.g. `https://<project>.supabase.co`.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub users: BTreeMap<String, Profile>,
}

impl AuthConfig {
    #[must_use]
    pub fn role_table(&self) -> RoleTable {
        RoleTable::new(&self.users)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,
    #[serde(default = "default_week_start")]
    pub week_start: String,
    #[serde(default)]
    pub output: Option<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            items_per_page: default_items_per_page(),
            week_start: default_week_start(),
            output: None,
        }
    }
}

impl UiConfig {
    /// Parsed `week_start`; accepts full or abbreviated English day names.
    pub fn first_weekday(&self) -> Result<Weekday> {
        self.week_start
            .trim()
            .parse::<Weekday>()
            .map_err(|_| anyhow::anyhow!("invalid ui.week_start '{}'", self.week_start))
    }
}

/// Pick the data directory: explicit flag, then `GRIEVANCE_HOME`, then the
/// platform data directory.
pub fn resolve_data_dir(cli_dir: Option<&Path>) -> Result<PathBuf> {
    choose_data_dir(
        cli_dir,
        env::var_os(HOME_ENV).map(PathBuf::from),
        dirs::data_dir(),
    )
}

fn choose_data_dir(
    cli_dir: Option<&Path>,
    env_dir: Option<PathBuf>,
    platform_dir: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(dir) = cli_dir {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = env_dir.filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir);
    }
    platform_dir
        .map(|d| d.join("grievance"))
        .context("no data directory available; pass --data-dir or set GRIEVANCE_HOME")
}

/// Load `<data_dir>/config.toml`, or defaults when it does not exist.
pub fn load_config(data_dir: &Path) -> Result<Config> {
    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config.ui.first_weekday()?;
    Ok(config)
}

const CONFIG_FOOTER: &str = r#"
# Role table. Only emails listed here may sign in.
#
# [auth.users."admin@example.org"]
# role = "admin"
# name = "Administrator"
# department = "Secretariat"
#
# [auth.users."pic@example.org"]
# role = "pic"
# name = "Maintenance lead"
# department = "Facilities"
"#;

/// Write a default `config.toml`. Refuses to overwrite unless `force`.
pub fn write_default_config(data_dir: &Path, force: bool) -> Result<PathBuf> {
    let path = data_dir.join(CONFIG_FILE);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let mut content =
        toml::to_string_pretty(&Config::default()).context("Failed to render default config")?;
    content.push_str(CONFIG_FOOTER);
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn default_org_name() -> String {
    "Masjid Al-Fajar".to_string()
}

fn default_script_url() -> String {
    PLACEHOLDER_SCRIPT_URL.to_string()
}

fn default_sheet_name() -> String {
    "Keluhan".to_string()
}

const fn default_timeout_secs() -> u64 {
    15
}

const fn default_items_per_page() -> usize {
    10
}

fn default_week_start() -> String {
    "sunday".to_string()
}
