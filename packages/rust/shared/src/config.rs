//! Build configuration for routegen.
//!
//! Project config lives at `./routegen.toml` next to the site sources.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutegenError};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "routegen.toml";

// ---------------------------------------------------------------------------
// Config structs (matching routegen.toml schema)
// ---------------------------------------------------------------------------

/// Top-level build config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where catalog source files live and how they are recognized.
    #[serde(default)]
    pub source: SourceConfig,

    /// Route paths and artifact output.
    #[serde(default)]
    pub routes: RoutesConfig,

    /// Related-items selection.
    #[serde(default)]
    pub similarity: SimilarityConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory containing catalog source files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// File extensions treated as catalog sources (without the dot).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Field names that mark a single-object file as one aggregate record.
    #[serde(default = "default_aggregate_markers")]
    pub aggregate_markers: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            extensions: default_extensions(),
            aggregate_markers: default_aggregate_markers(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/catalog")
}
fn default_extensions() -> Vec<String> {
    vec!["json".into()]
}
fn default_aggregate_markers() -> Vec<String> {
    vec!["tool_count".into(), "toolCount".into()]
}

/// `[routes]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// URL prefix every catalog route hangs off.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Directory the route manifest and data artifacts are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_base_path() -> String {
    "/catalog".into()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".routegen")
}

/// `[similarity]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Maximum number of related records per item.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Fixed RNG seed; unset means a fresh selection every build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            seed: None,
        }
    }
}

/// Upper bound on related records per item page.
pub const MAX_SIMILAR: usize = 3;

fn default_limit() -> usize {
    MAX_SIMILAR
}

impl AppConfig {
    /// Reject values no build can succeed with.
    pub fn validate(&self) -> Result<()> {
        if !self.routes.base_path.starts_with('/') {
            return Err(RoutegenError::config(format!(
                "routes.base_path must start with '/', got {:?}",
                self.routes.base_path
            )));
        }
        if self.source.extensions.is_empty() {
            return Err(RoutegenError::config(
                "source.extensions must list at least one extension",
            ));
        }
        if self.similarity.limit > MAX_SIMILAR {
            return Err(RoutegenError::config(format!(
                "similarity.limit must be at most {MAX_SIMILAR}, got {}",
                self.similarity.limit
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load `routegen.toml` from the working directory. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = PathBuf::from(CONFIG_FILE_NAME);

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the build config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RoutegenError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        RoutegenError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Write a default config file into `dir`. Refuses to overwrite an existing one.
/// Returns the path to the created file.
pub fn init_config(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(RoutegenError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| RoutegenError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RoutegenError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
