//! Configuration loading and root folder resolution
//!
//! The root folder holds everything a PollWatch deployment writes: the
//! SQLite database and the media directory. Resolution never fails; when no
//! override is present the platform default is used and created on demand.
//!
//! Priority order:
//! 1. `POLLWATCH_ROOT_FOLDER` environment variable
//! 2. `POLLWATCH_ROOT` environment variable
//! 3. `root_folder` key in the TOML config file
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Compiled per-platform defaults used when no configuration is present
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/pollwatch (or /var/lib/pollwatch for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("pollwatch"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/pollwatch"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/pollwatch
        dirs::data_dir()
            .map(|d| d.join("pollwatch"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/pollwatch"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\pollwatch
        dirs::data_local_dir()
            .map(|d| d.join("pollwatch"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\pollwatch"))
    } else {
        PathBuf::from("./pollwatch_data")
    }
}

/// Logging section of the TOML config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// TOML config file schema
///
/// All fields are optional so older config files keep loading as the schema
/// grows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Classifier backend selection: "mock", "openrouter", or "gemini"
    #[serde(default)]
    pub classifier_backend: Option<String>,

    #[serde(default)]
    pub openrouter_api_key: Option<String>,

    #[serde(default)]
    pub gemini_api_key: Option<String>,

    // Table section last so serialized TOML stays valid
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a config file. Errors only on unreadable or malformed TOML;
    /// a missing file is handled by the callers (defaults apply).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// Resolves the root folder for a named module following the priority order
/// documented at the top of this file
pub struct RootFolderResolver {
    module_name: String,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }

    /// Resolve the root folder. Never fails: a missing or malformed config
    /// file degrades to the next priority level with a warning.
    pub fn resolve(&self) -> PathBuf {
        if let Ok(path) = std::env::var("POLLWATCH_ROOT_FOLDER") {
            tracing::debug!("Root folder from POLLWATCH_ROOT_FOLDER: {}", path);
            return PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("POLLWATCH_ROOT") {
            tracing::debug!("Root folder from POLLWATCH_ROOT: {}", path);
            return PathBuf::from(path);
        }

        if let Some(config) = self.load_config_file() {
            if let Some(root_folder) = config.root_folder {
                tracing::debug!("Root folder from config file: {}", root_folder.display());
                return root_folder;
            }
        }

        let defaults = CompiledDefaults::for_current_platform();
        tracing::debug!(
            "Root folder from compiled default: {}",
            defaults.root_folder.display()
        );
        defaults.root_folder
    }

    /// Load the first config file that exists, or None
    pub fn load_config_file(&self) -> Option<TomlConfig> {
        for path in self.config_file_candidates() {
            if !path.exists() {
                continue;
            }
            match TomlConfig::load(&path) {
                Ok(config) => return Some(config),
                Err(e) => {
                    tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                    return None;
                }
            }
        }
        None
    }

    /// Candidate config file locations, most specific first:
    /// `<config_dir>/pollwatch/<module>.toml`, then
    /// `<config_dir>/pollwatch/config.toml`, then `/etc/pollwatch/config.toml`
    /// on Linux.
    fn config_file_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            let base = config_dir.join("pollwatch");
            candidates.push(base.join(format!("{}.toml", self.module_name)));
            candidates.push(base.join("config.toml"));
        }
        if cfg!(target_os = "linux") {
            candidates.push(PathBuf::from("/etc/pollwatch/config.toml"));
        }
        candidates
    }
}

/// Prepares a resolved root folder for use: creates the directory tree and
/// exposes the well-known paths inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder (and parents) if missing. Idempotent.
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    /// Path of the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("pollwatch.db")
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Directory uploaded media files are stored in and served from
    pub fn media_dir(&self) -> PathBuf {
        self.root_folder.join("media")
    }
}
