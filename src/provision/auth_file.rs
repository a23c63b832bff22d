//! Web credential file (`htpasswd` format)
//!
//! Entries are added through the external `htpasswd` tool. Users already
//! present are never touched, so a rerun cannot reset a password.

use crate::config::Secret;
use crate::error::Result;
use crate::provision::provisioner::Provisioner;
use crate::provision::runner::{CommandLine, CommandRunner};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::warn;

/// User names recorded in an authentication file
#[derive(Debug, Clone, Default)]
pub struct AuthFile {
    path: PathBuf,
    users: BTreeSet<String>,
}

impl AuthFile {
    /// Create the file (and its directory) when missing, then read it.
    /// `htpasswd` refuses to add entries to a file that does not exist.
    pub fn ensure(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)?;
        Self::read(path)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            users: parse_users(&contents),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, user: &str) -> bool {
        self.users.contains(user)
    }

    fn record(&mut self, user: &str) {
        self.users.insert(user.to_string());
    }
}

/// User name of every non-blank `user:hash` line
pub fn parse_users(contents: &str) -> BTreeSet<String> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(':').next().unwrap_or_default().to_string())
        .collect()
}

impl<R: CommandRunner> Provisioner<R> {
    /// Step 5: add the administrative and read-write web users. Returns
    /// the users that were added.
    pub fn provision_auth_file(&self) -> Result<Vec<String>> {
        let config = self.config();
        let mut auth = AuthFile::ensure(&config.auth_file)?;
        let mut added = Vec::new();

        let accounts = [
            (&config.web_admuser, "{web_admuser}", "{web_admpass}"),
            (&config.web_rwuser, "{web_rwuser}", "{web_rwpass}"),
        ];
        for (user, user_ref, password_ref) in accounts {
            if auth.contains(user) {
                warn!(
                    "web password for {} already set in {}",
                    user,
                    auth.path().display()
                );
                continue;
            }

            let htpasswd = CommandLine::new("htpasswd")
                .args(["-m", "-i", "{auth_file}", user_ref])
                .stdin_data(Secret::new(password_ref));
            self.shell(&htpasswd, &[])?;

            auth.record(user);
            added.push(user.clone());
        }

        Ok(added)
    }
}
