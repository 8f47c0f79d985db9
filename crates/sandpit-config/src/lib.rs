use std::fs;
use std::path::{Path, PathBuf};

use sandpit_core::PhpVersion;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SANDPIT_DIR_NAME: &str = ".sandpit";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_SHARE_BASE_URL: &str = "https://sandpit.local/";
pub const MIN_DEBOUNCE_MS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineProviderKind {
    #[default]
    Mock,
    Process,
}

impl EngineProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Process => "process",
        }
    }
}

impl std::str::FromStr for EngineProviderKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "mock" => Ok(Self::Mock),
            "process" => Ok(Self::Process),
            other => Err(format!(
                "invalid engine provider '{other}', expected one of: mock, process"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SandpitConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub share: ShareConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub php_version: PhpVersion,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            php_version: PhpVersion::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareConfig {
    #[serde(default = "default_share_base_url")]
    pub base_url: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: default_share_base_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub provider: EngineProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn sandpit_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(SANDPIT_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    sandpit_dir(workspace_root).join(CONFIG_FILE_NAME)
}

pub fn load_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<SandpitConfig, ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(SandpitConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: SandpitConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<SandpitConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(sandpit_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = SandpitConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_share_base_url() -> String {
    DEFAULT_SHARE_BASE_URL.to_owned()
}

fn normalize_optional(input: Option<String>) -> Option<String> {
    input
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn normalize_config(mut config: SandpitConfig) -> SandpitConfig {
    config.session.debounce_ms = config.session.debounce_ms.max(MIN_DEBOUNCE_MS);
    config.engine.command = normalize_optional(config.engine.command.take());

    let base_url = config.share.base_url.trim();
    if base_url.is_empty() {
        config.share.base_url = default_share_base_url();
    } else {
        config.share.base_url = base_url.to_owned();
    }

    config
}
