//! Installation configuration
//!
//! The configuration is a flat record of named parameters. It is built once
//! per run (see [`crate::config::ConfigResolver`]), validated eagerly, and
//! persisted at the end of the run with its secrets in plain text.

use crate::config::environment::{env_var_name, Environment};
use crate::config::secret::Secret;
use crate::error::{InstallError, Result};
use crate::utils::password::PasswordGenerator;
use crate::utils::template::{self, Vars};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_ROOT: &str = "/var/lib/docdb";
pub const DEFAULT_GIT_URL: &str = "https://github.com/brettviren/DocDB.git";

/// Parameters holding generated passwords
pub const SECRET_PARAMETERS: [&str; 5] = [
    "db_admpass",
    "db_rwpass",
    "db_ropass",
    "web_admpass",
    "web_rwpass",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallConfig {
    pub root: PathBuf,

    pub db_name: String,
    pub db_host: String,
    #[serde(default = "default_db_rootuser")]
    pub db_rootuser: String,

    pub db_admuser: String,
    pub db_admpass: Secret,
    pub db_rwuser: String,
    pub db_rwpass: Secret,
    pub db_rouser: String,
    pub db_ropass: Secret,

    pub web_admuser: String,
    pub web_admpass: Secret,
    pub web_rwuser: String,
    pub web_rwpass: Secret,
    #[serde(default = "default_web_user")]
    pub web_user: String,
    #[serde(default = "default_web_user")]
    pub web_group: String,

    pub file_root: PathBuf,
    pub script_root: PathBuf,
    #[serde(default = "default_sites_enabled")]
    pub sites_enabled: PathBuf,
    pub web_host: String,
    pub web_base: String,
    pub cgi_base: String,
    pub admin_email: String,
    pub admin_name: String,
    pub auth_file: PathBuf,
    pub smtp_server: String,
    #[serde(deserialize_with = "year_from_number_or_text")]
    pub first_year: u32,
    pub project_name: String,
    pub project_nick: String,

    pub giturl: String,
    #[serde(default)]
    pub gittag: String,
    pub srcdir: PathBuf,

    pub my_cnf: PathBuf,
}

fn default_db_rootuser() -> String {
    "root".to_string()
}

fn default_web_user() -> String {
    "www-data".to_string()
}

fn default_sites_enabled() -> PathBuf {
    PathBuf::from("/etc/apache2/sites-enabled")
}

/// Accept `1998` as well as `"1998"`; files written by older installers
/// store the year as text when it came from the environment.
fn year_from_number_or_text<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Year {
        Number(u32),
        Text(String),
    }

    match Year::deserialize(deserializer)? {
        Year::Number(year) => Ok(year),
        Year::Text(text) => text.trim().parse().map_err(|e| {
            serde::de::Error::custom(format!("first_year '{text}': {e}"))
        }),
    }
}

/// Format of a persisted configuration file, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

impl InstallConfig {
    /// Build the default table, letting `DOCDB_<PARAM>` variables override
    /// each fallback. A fresh password is generated for every secret whose
    /// variable is absent.
    pub fn from_environment(
        env: &dyn Environment,
        passwords: &dyn PasswordGenerator,
    ) -> Result<Self> {
        let text = |name: &str, fallback: &str| -> String {
            env.var(&env_var_name(name))
                .unwrap_or_else(|| fallback.to_string())
        };
        let secret = |name: &str| -> Result<Secret> {
            match env.var(&env_var_name(name)) {
                Some(value) => Ok(Secret::new(value)),
                None => {
                    debug!("generating password for '{}'", name);
                    passwords.generate()
                }
            }
        };

        let root = PathBuf::from(text("root", DEFAULT_ROOT));
        let under_root = |name: &str, sub_path: &str| -> PathBuf {
            env.var(&env_var_name(name))
                .map(PathBuf::from)
                .unwrap_or_else(|| root.join(sub_path))
        };

        let first_year = text("first_year", "2000");
        let first_year = first_year.parse::<u32>().map_err(|e| {
            InstallError::invalid_value("first_year", format!("'{first_year}': {e}"))
        })?;

        let config = Self {
            db_name: text("db_name", "DocDB"),
            db_host: text("db_host", "localhost"),
            db_rootuser: text("db_rootuser", "root"),

            db_admuser: text("db_admuser", "docdbadm"),
            db_admpass: secret("db_admpass")?,
            db_rwuser: text("db_rwuser", "docdbrw"),
            db_rwpass: secret("db_rwpass")?,
            db_rouser: text("db_rouser", "docdbro"),
            db_ropass: secret("db_ropass")?,

            web_admuser: text("web_admuser", "docdbadm"),
            web_admpass: secret("web_admpass")?,
            web_rwuser: text("web_rwuser", "docdbrw"),
            web_rwpass: secret("web_rwpass")?,
            web_user: text("web_user", "www-data"),
            web_group: text("web_group", "www-data"),

            file_root: under_root("file_root", "htdocs"),
            script_root: under_root("script_root", "cgi-bin"),
            sites_enabled: PathBuf::from(text("sites_enabled", "/etc/apache2/sites-enabled")),
            web_host: text("web_host", "localhost"),
            web_base: text("web_base", "DocDB"),
            cgi_base: text("cgi_base", "private"),
            admin_email: text("admin_email", "root@localhost"),
            admin_name: text("admin_name", "root"),
            auth_file: under_root("auth_file", "passwords/htpasswd"),
            smtp_server: text("smtp_server", "localhost"),
            first_year,
            project_name: text("project_name", "Document Database"),
            project_nick: text("project_nick", "DocDB"),

            giturl: text("giturl", DEFAULT_GIT_URL),
            gittag: text("gittag", ""),
            srcdir: under_root("srcdir", "src"),

            my_cnf: under_root("my_cnf", "my.cnf"),
            root,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load a previously saved configuration (JSON, or TOML for `.toml`)
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(InstallError::missing_file(path));
        }

        let contents = fs::read_to_string(path)?;
        let config: Self = match FileFormat::for_path(path) {
            FileFormat::Toml => toml::from_str(&contents)?,
            FileFormat::Json => serde_json::from_str(&contents)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check values that would break templates, command arguments or the
    /// credential file
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("db_name", self.db_name.as_str()),
            ("db_host", self.db_host.as_str()),
            ("db_admuser", self.db_admuser.as_str()),
            ("web_admuser", self.web_admuser.as_str()),
            ("web_rwuser", self.web_rwuser.as_str()),
            ("web_host", self.web_host.as_str()),
            ("giturl", self.giturl.as_str()),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(InstallError::invalid_value(key, "must not be empty"));
            }
        }

        if !self
            .db_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(InstallError::invalid_value(
                "db_name",
                "only letters, digits and '_' are allowed",
            ));
        }

        for (key, user) in [
            ("db_admuser", &self.db_admuser),
            ("db_rwuser", &self.db_rwuser),
            ("db_rouser", &self.db_rouser),
            ("web_admuser", &self.web_admuser),
            ("web_rwuser", &self.web_rwuser),
        ] {
            if user.contains(':') || user.chars().any(char::is_whitespace) {
                return Err(InstallError::invalid_value(
                    key,
                    "user names may not contain ':' or whitespace",
                ));
            }
        }

        if self.web_host.contains('/') {
            return Err(InstallError::invalid_value("web_host", "must be a host name"));
        }

        // scp-style and local clone sources are not URLs
        if self.giturl.contains("://") {
            url::Url::parse(&self.giturl)
                .map_err(|e| InstallError::invalid_value("giturl", e.to_string()))?;
        }

        Ok(())
    }

    /// Merge keyword overrides; they take precedence over every source
    pub fn with_overrides(self, overrides: &BTreeMap<String, String>) -> Result<Self> {
        if overrides.is_empty() {
            return Ok(self);
        }

        let mut map = self.to_map()?;
        for (key, value) in overrides {
            let Some(current) = map.get(key) else {
                return Err(InstallError::unknown_parameter(key));
            };
            let replacement = match current {
                Value::Number(_) => value
                    .parse::<u64>()
                    .map(Value::from)
                    .map_err(|e| InstallError::invalid_value(key, format!("'{value}': {e}")))?,
                _ => Value::String(value.clone()),
            };
            debug!("override {}", key);
            map.insert(key.clone(), replacement);
        }

        let config: Self = serde_json::from_value(Value::Object(map))?;
        config.validate()?;
        Ok(config)
    }

    /// Flat parameter map, secrets included
    pub fn to_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(InstallError::serialization(format!(
                "configuration serialized to {other} instead of a map"
            ))),
        }
    }

    /// Every parameter rendered as text, the form templates consume
    pub fn vars(&self) -> Result<Vars> {
        Ok(self
            .to_map()?
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect())
    }

    /// Attribute-style access by parameter name
    pub fn get(&self, key: &str) -> Result<String> {
        self.vars()?
            .remove(key)
            .ok_or_else(|| InstallError::missing_key(key))
    }

    /// Substitute `{name}` placeholders from this configuration plus
    /// call-site overrides
    pub fn format(&self, text: &str, overrides: &[(&str, &str)]) -> Result<String> {
        let mut vars = self.vars()?;
        for (key, value) in overrides {
            vars.insert((*key).to_string(), (*value).to_string());
        }
        template::format_braces(text, &vars)
    }

    pub fn is_secret(key: &str) -> bool {
        SECRET_PARAMETERS.contains(&key)
    }

    /// Persist to `path`. An existing file is first renamed to
    /// `<path>.old`. Returns the written path.
    pub fn save(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if path.exists() {
            let backup = backup_path(path);
            info!("keeping previous configuration as {}", backup.display());
            fs::rename(path, &backup)?;
        }

        let contents = match FileFormat::for_path(path) {
            FileFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| InstallError::serialization(e.to_string()))?,
            FileFormat::Json => serde_json::to_string_pretty(self)?,
        };

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(contents.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(path.to_path_buf())
    }
}

/// `<path>.old`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".old");
    PathBuf::from(name)
}
