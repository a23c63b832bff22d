//! Provisioning module
//!
//! This module runs the ordered installation sequence: source checkout,
//! web-server layout, template rendering, web credentials and the database
//! bootstrap. External tools are reached through [`CommandRunner`].

pub mod auth_file;
pub mod database;
pub mod provisioner;
pub mod runner;
pub mod site;

pub use auth_file::AuthFile;
pub use database::DatabaseOutcome;
pub use provisioner::*;
pub use runner::*;
