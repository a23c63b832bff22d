//! Command-line arguments and the top-level installation driver

use crate::config::{canonical_config_path, ConfigResolver, ConfigSource, CANONICAL_MARKER};
use crate::error::{InstallError, Result};
use crate::provision::{Provisioner, SystemRunner};
use crate::utils::format::format_config_table;
use crate::utils::password::PwgenPasswordGenerator;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Install the DocDB document database
///
/// Clones DocDB, links it into the web server, renders its configuration,
/// creates web credentials and bootstraps the MySQL database. The resolved
/// configuration, passwords included, is saved for the next run.
#[derive(Parser, Debug)]
#[command(name = "docdb-install", author, version, about)]
pub struct Cli {
    /// Saved configuration to use, or `*canonical*` for installation.json
    /// next to the installer
    #[arg(value_name = "CONFIG", default_value = CANONICAL_MARKER)]
    pub config: String,

    /// Ignore saved configuration; build it from DOCDB_* variables and defaults
    #[arg(long)]
    pub defaults: bool,

    /// Override a configuration parameter (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub overrides: Vec<(String, String)>,

    /// Directory holding the *.template files
    #[arg(long, value_name = "DIR", env = "DOCDB_TEMPLATE_DIR")]
    pub template_dir: Option<PathBuf>,

    /// Generate passwords with the external pwgen tool
    #[arg(long)]
    pub pwgen: bool,

    /// Do not create the database
    #[arg(long)]
    pub skip_database: bool,

    /// Print the resolved configuration (secrets masked) and exit
    #[arg(long)]
    pub show_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

fn parse_key_value(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{arg}'")),
    }
}

impl Cli {
    pub fn source(&self) -> ConfigSource {
        if self.defaults {
            ConfigSource::Defaults
        } else {
            ConfigSource::from_arg(Some(self.config.as_str()))
        }
    }

    pub fn resolver(&self, canonical_path: PathBuf) -> ConfigResolver {
        let resolver = ConfigResolver::new(canonical_path).with_overrides(self.overrides.clone());
        if self.pwgen {
            resolver.with_password_generator(PwgenPasswordGenerator::default())
        } else {
            resolver
        }
    }

    /// Resolve, provision, then persist the configuration
    pub fn execute(self) -> Result<()> {
        let canonical = canonical_config_path()?;
        let source = self.source();
        let config = self.resolver(canonical.clone()).resolve(&source)?;

        if self.show_config {
            println!("{}", format_config_table(&config)?);
            return Ok(());
        }

        let template_dir = match self.template_dir {
            Some(dir) => dir,
            None => default_template_dir()?,
        };
        info!("templates from {}", template_dir.display());

        let provisioner = Provisioner::new(config, SystemRunner, template_dir);
        provisioner.install_files()?;
        if self.skip_database {
            info!("skipping database configuration");
        } else {
            provisioner.configure_database()?;
        }

        let saved = provisioner.save(&source.destination(&canonical))?;
        println!("Installation data saved in {}", saved.display());
        Ok(())
    }
}

/// `templates/` next to the installer executable
pub fn default_template_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent()
        .map(|dir| dir.join("templates"))
        .ok_or_else(|| InstallError::config("Unable to determine installer directory"))
}
