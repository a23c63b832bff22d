//! docdb-install - DocDB installation tool
//!
//! Resolves an installation configuration, then clones DocDB, wires it into
//! Apache, renders its configuration templates, creates web credentials and
//! bootstraps its MySQL database.

pub mod cli;
pub mod config;
pub mod error;
pub mod provision;
pub mod utils;

// Re-export commonly used types
pub use config::{ConfigResolver, ConfigSource, InstallConfig};
pub use error::{InstallError, Result};
pub use provision::Provisioner;
