//! Configuration source selection
//!
//! A run takes its configuration from exactly one source:
//! 1. defaults, overridable through `DOCDB_<PARAM>` environment variables
//! 2. the canonical file next to the installer, falling back to (1)
//! 3. an explicit file, which must exist
//!
//! Keyword overrides are merged after the source is read.

use crate::config::environment::{env_var_name, Environment, ProcessEnvironment};
use crate::config::settings::{InstallConfig, SECRET_PARAMETERS};
use crate::error::{InstallError, Result};
use crate::utils::password::{PasswordGenerator, RandomPasswordGenerator};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Command-line sentinel selecting the canonical location
pub const CANONICAL_MARKER: &str = "*canonical*";

/// File name of the canonical configuration
pub const CANONICAL_FILE_NAME: &str = "installation.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    Canonical,
    File(PathBuf),
}

impl ConfigSource {
    /// Interpret the installer's positional argument. No argument or the
    /// sentinel selects the canonical location, an empty string selects
    /// defaults, anything else is a file path.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None | Some(CANONICAL_MARKER) => Self::Canonical,
            Some("") => Self::Defaults,
            Some(path) => Self::File(PathBuf::from(path)),
        }
    }

    /// Where a configuration resolved from this source is saved
    pub fn destination(&self, canonical_path: &Path) -> PathBuf {
        match self {
            Self::File(path) => path.clone(),
            Self::Defaults | Self::Canonical => canonical_path.to_path_buf(),
        }
    }
}

/// `installation.json` in the directory holding the running executable
pub fn canonical_config_path() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| InstallError::config("Unable to determine installer directory"))?;
    Ok(dir.join(CANONICAL_FILE_NAME))
}

pub struct ConfigResolver {
    environment: Box<dyn Environment>,
    passwords: Box<dyn PasswordGenerator>,
    canonical_path: PathBuf,
    overrides: BTreeMap<String, String>,
}

impl ConfigResolver {
    /// Resolver reading the process environment and generating passwords
    /// in-process
    pub fn new<P: Into<PathBuf>>(canonical_path: P) -> Self {
        Self {
            environment: Box::new(ProcessEnvironment),
            passwords: Box::new(RandomPasswordGenerator::default()),
            canonical_path: canonical_path.into(),
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_environment<E: Environment + 'static>(mut self, environment: E) -> Self {
        self.environment = Box::new(environment);
        self
    }

    pub fn with_password_generator<G: PasswordGenerator + 'static>(mut self, passwords: G) -> Self {
        self.passwords = Box::new(passwords);
        self
    }

    pub fn with_override<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn canonical_path(&self) -> &Path {
        &self.canonical_path
    }

    /// Produce the configuration for `source`, then apply overrides
    pub fn resolve(&self, source: &ConfigSource) -> Result<InstallConfig> {
        let config = match source {
            ConfigSource::Defaults => {
                info!("Using default/environment configuration");
                self.defaults()?
            }
            ConfigSource::Canonical => {
                if self.canonical_path.exists() {
                    info!("Reading from canonical: {}", self.canonical_path.display());
                    InstallConfig::load(&self.canonical_path)?
                } else {
                    info!("No canonical file: {}", self.canonical_path.display());
                    self.defaults()?
                }
            }
            ConfigSource::File(path) => {
                if !path.exists() {
                    return Err(InstallError::missing_file(path));
                }
                info!("Using previous configuration from {}", path.display());
                InstallConfig::load(path)?
            }
        };

        config.with_overrides(&self.overrides)
    }

    /// Secret parameters that a defaults build fills with a fresh password:
    /// neither an environment variable nor an override supplies them
    pub fn generated_secrets(&self) -> Vec<&'static str> {
        SECRET_PARAMETERS
            .iter()
            .copied()
            .filter(|name| {
                self.environment.var(&env_var_name(name)).is_none()
                    && !self.overrides.contains_key(*name)
            })
            .collect()
    }

    fn defaults(&self) -> Result<InstallConfig> {
        let config =
            InstallConfig::from_environment(self.environment.as_ref(), self.passwords.as_ref())?;
        for name in self.generated_secrets() {
            warn!("generated new password for '{}'", name);
        }
        Ok(config)
    }
}
