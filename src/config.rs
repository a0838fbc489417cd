//! Application configuration.
//!
//! Configuration is read from a TOML file and controls where profile records are
//! stored, which transfer mode the front end uses by default, and which files in
//! a source folder are ignored when organizing.
//!
//! # Configuration File Format
//!
//! ```toml
//! [store]
//! profiles_dir = "/home/me/.config/pipeline-organizer/profiles"
//!
//! [organize]
//! default_mode = "copy"
//!
//! [filters]
//! enable_hidden_files = true
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp"]
//! extensions = ["bak"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use crate::transfer::TransferMode;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".pipeline-organizer.toml";

/// Errors that can occur during configuration loading and filter compilation.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub organize: OrganizeConfig,

    #[serde(default)]
    pub filters: FilterRules,
}

/// Where profile records live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_profiles_dir")]
    pub profiles_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            profiles_dir: default_profiles_dir(),
        }
    }
}

/// `$HOME/.config/pipeline-organizer/profiles`, or `./profiles` without a home directory.
fn default_profiles_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => app_config_dir(Path::new(&home)).join("profiles"),
        Err(_) => PathBuf::from("profiles"),
    }
}

fn app_config_dir(home: &Path) -> PathBuf {
    home.join(".config").join("pipeline-organizer")
}

/// Defaults for organize runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizeConfig {
    #[serde(default)]
    pub default_mode: TransferMode,
}

/// Source-file filter rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether files starting with "." are organized. Defaults to true.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Whitelist, overrides exclude rules.
    #[serde(default)]
    pub include: IncludeRules,
}

fn default_enable_hidden_files() -> bool {
    true
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for leaving files out of an organize run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames (e.g. ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns (e.g. "*.tmp").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Extensions without the dot (e.g. "bak").
    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl AppConfig {
    /// Load configuration, with fallback to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, when provided (must exist)
    /// 2. `.pipeline-organizer.toml` in the current directory
    /// 3. `~/.config/pipeline-organizer/config.toml`
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = app_config_dir(Path::new(&home)).join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Compile the filter section for matching.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Filter rules with every pattern pre-compiled.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl Default for CompiledFilters {
    /// Accepts every file.
    fn default() -> Self {
        Self {
            enable_hidden_files: true,
            exclude_filenames: HashSet::new(),
            exclude_extensions: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
        }
    }
}

impl CompiledFilters {
    pub fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Check if a source file takes part in organization.
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Include patterns - if matched, always include
    /// 2. Hidden file filter
    /// 3. Exact filename
    /// 4. Extension
    /// 5. Glob patterns
    /// 6. Regex patterns
    /// 7. Default: include
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.matches_any(&self.include_patterns, file_path, &file_name) {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.matches_any(&self.exclude_patterns, file_path, &file_name) {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }

    // Source entries arrive as absolute paths, so patterns are tried against the
    // bare file name as well as the full path.
    fn matches_any(&self, patterns: &[Pattern], file_path: &Path, file_name: &str) -> bool {
        patterns
            .iter()
            .any(|pattern| pattern.matches(file_name) || pattern.matches_path(file_path))
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters_with(exclude: ExcludeRules) -> CompiledFilters {
        CompiledFilters::new(&FilterRules {
            enable_hidden_files: true,
            exclude,
            include: IncludeRules::default(),
        })
        .unwrap()
    }

    #[test]
    fn test_default_config_accepts_everything() {
        let config = AppConfig::default();
        let compiled = config.compile_filters().unwrap();

        assert!(compiled.should_include(Path::new(".hidden")));
        assert!(compiled.should_include(Path::new("/src/scene.ma")));
        assert_eq!(config.organize.default_mode, TransferMode::Copy);
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_toml(
            r#"
            [store]
            profiles_dir = "/data/profiles"

            [organize]
            default_mode = "move"

            [filters]
            enable_hidden_files = false

            [filters.exclude]
            extensions = ["bak"]
            "#,
        )
        .unwrap();

        assert_eq!(config.store.profiles_dir, PathBuf::from("/data/profiles"));
        assert_eq!(config.organize.default_mode, TransferMode::Move);
        assert!(!config.filters.enable_hidden_files);
        assert_eq!(config.filters.exclude.extensions, vec!["bak"]);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert!(config.filters.enable_hidden_files);
        assert_eq!(config.organize.default_mode, TransferMode::Copy);
    }

    #[test]
    fn test_invalid_toml() {
        let result = AppConfig::from_toml("[store\nprofiles_dir = 3");
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let result = AppConfig::load(Some(Path::new("/non/existent/config.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_hidden_files_excluded_when_disabled() {
        let compiled = CompiledFilters::new(&FilterRules {
            enable_hidden_files: false,
            ..Default::default()
        })
        .unwrap();

        assert!(!compiled.should_include(Path::new("/src/.DS_Store")));
        assert!(compiled.should_include(Path::new("/src/texture.png")));
    }

    #[test]
    fn test_exclude_extensions_case_insensitive() {
        let compiled = filters_with(ExcludeRules {
            extensions: vec!["bak".to_string(), ".tmp".to_string()],
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("/src/scene.BAK")));
        assert!(!compiled.should_include(Path::new("/src/scene.tmp")));
        assert!(compiled.should_include(Path::new("/src/scene.ma")));
    }

    #[test]
    fn test_exclude_glob_matches_file_name_of_absolute_path() {
        let compiled = filters_with(ExcludeRules {
            patterns: vec!["*_autosave.*".to_string()],
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("/work/src/scene_autosave.ma")));
        assert!(compiled.should_include(Path::new("/work/src/scene.ma")));
    }

    #[test]
    fn test_exclude_regex() {
        let compiled = filters_with(ExcludeRules {
            regex: vec![r"^~\$".to_string()],
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("~$lock.ma")));
        assert!(compiled.should_include(Path::new("lock.ma")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let compiled = CompiledFilters::new(&FilterRules {
            enable_hidden_files: false,
            exclude: ExcludeRules::default(),
            include: IncludeRules {
                patterns: vec![".keep".to_string()],
            },
        })
        .unwrap();

        assert!(compiled.should_include(Path::new("/src/.keep")));
        assert!(!compiled.should_include(Path::new("/src/.other")));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let glob = CompiledFilters::new(&FilterRules {
            exclude: ExcludeRules {
                patterns: vec!["[invalid".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(matches!(glob, Err(ConfigError::InvalidGlobPattern(_))));

        let regex = CompiledFilters::new(&FilterRules {
            exclude: ExcludeRules {
                regex: vec!["[invalid(".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(matches!(regex, Err(ConfigError::InvalidRegexPattern { .. })));
    }
}
