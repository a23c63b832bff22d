//! CLI module for docdb-install
//!
//! This module contains the command-line interface definition and the
//! driver that ties configuration resolution to provisioning.

pub mod commands;

pub use commands::*;
