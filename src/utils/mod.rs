//! Utility functions module
//!
//! This module contains password generation, template substitution and
//! table formatting helpers.

pub mod format;
pub mod password;
pub mod template;

pub use format::*;
pub use password::*;
pub use template::Vars;
