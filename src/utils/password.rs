//! Password generation for secret configuration defaults

use crate::config::Secret;
use crate::error::{InstallError, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::process::Command;

/// Length of every generated password
pub const PASSWORD_LENGTH: usize = 12;

pub trait PasswordGenerator {
    fn generate(&self) -> Result<Secret>;
}

/// In-process generator drawing alphanumerics from the thread RNG
#[derive(Debug, Clone)]
pub struct RandomPasswordGenerator {
    length: usize,
}

impl RandomPasswordGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomPasswordGenerator {
    fn default() -> Self {
        Self::new(PASSWORD_LENGTH)
    }
}

impl PasswordGenerator for RandomPasswordGenerator {
    fn generate(&self) -> Result<Secret> {
        let password: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect();
        Ok(Secret::new(password))
    }
}

/// Delegates to the external `pwgen` tool (`pwgen -s <length> 1`)
#[derive(Debug, Clone)]
pub struct PwgenPasswordGenerator {
    length: usize,
}

impl Default for PwgenPasswordGenerator {
    fn default() -> Self {
        Self {
            length: PASSWORD_LENGTH,
        }
    }
}

impl PasswordGenerator for PwgenPasswordGenerator {
    fn generate(&self) -> Result<Secret> {
        let length = self.length.to_string();
        let output = Command::new("pwgen")
            .args(["-s", length.as_str(), "1"])
            .output()
            .map_err(|source| InstallError::CommandSpawn {
                command: format!("pwgen -s {length} 1"),
                source,
            })?;

        if !output.status.success() {
            return Err(InstallError::CommandFailed {
                command: format!("pwgen -s {length} 1"),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let password = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if password.is_empty() {
            return Err(InstallError::config("pwgen produced an empty password"));
        }
        Ok(Secret::new(password))
    }
}
