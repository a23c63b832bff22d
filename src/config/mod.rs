//! Configuration management module
//!
//! This module resolves the installation configuration from environment
//! variables, a saved configuration file or built-in defaults, and
//! persists it at the end of a run.

pub mod environment;
pub mod resolver;
pub mod secret;
pub mod settings;

pub use environment::*;
pub use resolver::*;
pub use secret::Secret;
pub use settings::*;
