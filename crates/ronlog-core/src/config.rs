use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::crdt::RGA;
use crate::error::ErrorCode;
use crate::hash::{DigestEncoding, HashAlgorithm};
use crate::op::{Builder, Uuid};

/// Errors from loading or interpreting config files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::Internal,
            Self::Parse { .. } | Self::Invalid { .. } => ErrorCode::ConfigParse,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub hash: HashConfig,
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub merge: MergeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashConfig {
    #[serde(default)]
    pub encoding: DigestEncoding,
    #[serde(default)]
    pub algorithm: HashAlgorithm,
    /// Identifier whose digest seeds every chain root.
    #[serde(default = "default_seed")]
    pub seed: String,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            encoding: DigestEncoding::default(),
            algorithm: HashAlgorithm::default(),
            seed: default_seed(),
        }
    }
}

impl HashConfig {
    /// The configured seed as an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `seed` is not a valid identifier.
    pub fn seed_uuid(&self) -> Result<Uuid, ConfigError> {
        Uuid::parse(&self.seed).map_err(|e| ConfigError::Invalid {
            key: "hash.seed",
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Elide sequential `@id` / `:ref` specs when writing frames.
    #[serde(default = "default_true")]
    pub compact: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            compact: default_true(),
        }
    }
}

impl FrameConfig {
    /// A builder honoring the compaction setting.
    #[must_use]
    pub const fn builder(&self) -> Builder {
        Builder::with_compaction(self.compact)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Type assumed for frames without a header.
    #[serde(default = "default_rdt")]
    pub rdt: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self { rdt: default_rdt() }
    }
}

impl MergeConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `rdt` is not a valid name.
    pub fn rdt_uuid(&self) -> Result<Uuid, ConfigError> {
        Uuid::parse(&self.rdt).map_err(|e| ConfigError::Invalid {
            key: "merge.rdt",
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Load `.ronlog/config.toml` under `project_root`. A missing file yields
/// defaults.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig, ConfigError> {
    let path = project_root.join(".ronlog/config.toml");
    load_toml(&path)
}

/// Load `ronlog/config.toml` from the platform config directory.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig, ConfigError> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    load_toml(&config_dir.join("ronlog/config.toml"))
}

fn load_toml<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<T>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Combine project and user config and settle the output mode.
///
/// # Errors
///
/// Returns [`ConfigError`] if either file is unreadable or malformed.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig, ConfigError> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn resolve_output(cli_json: bool, user_output: Option<&str>, env_format: Option<&str>) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "plain" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }
    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }
    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }
    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_true() -> bool {
    true
}

fn default_seed() -> String {
    "0".to_string()
}

fn default_rdt() -> String {
    RGA.to_string()
}
