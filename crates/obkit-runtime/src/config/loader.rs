//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config`: enables TOML files (`obkit.toml`, `config.toml`)
//! - `yaml-config`: enables YAML files (`obkit.yaml`, `obkit.yml`, `config.yaml`, `config.yml`)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`obkit.{profile}.toml` / `obkit.{profile}.yaml`)
//! 3. Main config file (`obkit.toml` / `obkit.yaml`)
//! 4. Environment variables (`OBKIT_*`)
//! 5. Programmatic overrides
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `OBKIT_` prefix with `__` as separator:
//!
//! - `OBKIT_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `OBKIT_LOGGING__OUTPUT=stderr` → `logging.output = "stderr"`
//!
//! `OBKIT_PROFILE` selects the profile and is not part of the configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use figment::providers::Serialized;
//! use obkit_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./config/obkit.yaml")
//!     .merge(Serialized::default("logging.level", "debug"))
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::providers::{Env, Serialized};
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::{Figment, Provider};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::ObkitConfig;

const ENV_PREFIX: &str = "OBKIT_";
const PROFILE_ENV: &str = "OBKIT_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `dev` and `prod` are accepted as aliases.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `OBKIT_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
    overrides: Figment,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
            overrides: Figment::new(),
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    ///
    /// Without search paths, the current directory and the user config
    /// directory (`~/.config/obkit` on Linux) are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(config_dir) => self.search_path(config_dir.join("obkit")),
            None => self,
        }
    }

    /// Loads this file instead of searching. A missing file is an error.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables `OBKIT_*` environment variables (default: enabled).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a provider on top of every other source.
    pub fn merge<P: Provider>(mut self, provider: P) -> Self {
        self.overrides = self.overrides.merge(provider);
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<ObkitConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: ObkitConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            bots = config.bots.len(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(ObkitConfig::default()));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["profile"]).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    /// Merges a single config file, dispatching on its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("obkit"));
        }
        paths
    }

    /// Searches `search_paths × base_names`. A profile-specific variant is
    /// merged before its base file; the first base file found ends the
    /// search.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path =
                    search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    return (merge_fn(figment, &base_path), true);
                }
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["obkit.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["obkit.yaml", "obkit.yml", "config.yaml", "config.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!(
                paths = ?search_paths,
                "No configuration file found, using defaults"
            );
        }
        figment
    }
}

// =============================================================================
// Tests
// =============================================================================
