//! Source checkout, web-server layout and per-site configuration

use crate::error::Result;
use crate::provision::provisioner::Provisioner;
use crate::provision::runner::{CommandLine, CommandRunner};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Name of the script-directory link into the source tree's CGI scripts
pub const SCRIPT_SUBDIR: &str = "private";

/// Per-application files rendered from `<name>.template`
pub const APPLICATION_FILES: [&str; 4] = [
    "ProjectGlobals.pm",
    "ProjectMessages.pm",
    "ProjectRoutines.pm",
    "ProjectHelp.xml",
];

pub const SITE_TEMPLATE: &str = "apache-site.template";

impl<R: CommandRunner> Provisioner<R> {
    /// Steps 1-5: source, web paths, application config, site config and
    /// web credentials
    pub fn install_files(&self) -> Result<()> {
        self.install_source()?;
        self.layout_web_paths()?;
        self.render_application_config()?;
        self.install_site_config()?;
        self.provision_auth_file()?;
        Ok(())
    }

    /// Clone the DocDB sources unless `srcdir` already exists
    pub fn install_source(&self) -> Result<()> {
        let config = self.config();
        if config.srcdir.exists() {
            info!("source already installed at {}", config.srcdir.display());
            return Ok(());
        }

        let mut clone = CommandLine::new("git").arg("clone");
        if !config.gittag.is_empty() {
            clone = clone.args(["-b", "{gittag}"]);
        }
        self.shell(&clone.args(["{giturl}", "{srcdir}"]), &[])
    }

    /// Public file directory owned by the web server, plus links into the
    /// source tree for static assets and CGI scripts
    pub fn layout_web_paths(&self) -> Result<()> {
        let config = self.config();
        fs::create_dir_all(&config.root)?;

        fs::create_dir_all(&config.file_root)?;
        self.shell(
            &CommandLine::new("chown").args(["{web_user}:{web_group}", "{file_root}"]),
            &[],
        )?;
        force_symlink(
            &config.srcdir.join("DocDB").join("html"),
            &config.file_root.join("Static"),
        )?;

        fs::create_dir_all(&config.script_root)?;
        force_symlink(
            &config.srcdir.join("DocDB").join("cgi"),
            &config.script_root.join(SCRIPT_SUBDIR),
        )
    }

    pub fn render_application_config(&self) -> Result<()> {
        let destination = format!("{{script_root}}/{SCRIPT_SUBDIR}/{{fname}}");
        for name in APPLICATION_FILES {
            self.render("{fname}.template", &destination, &[("fname", name)])?;
        }
        Ok(())
    }

    /// Render the Apache site and enable it under `<web_host>.conf`
    pub fn install_site_config(&self) -> Result<()> {
        let config = self.config();
        self.render(SITE_TEMPLATE, "{root}/apache-site.conf", &[])?;

        let enabled = config
            .sites_enabled
            .join(format!("{}.conf", config.web_host));
        force_symlink(&config.root.join("apache-site.conf"), &enabled)
    }
}

/// Point `link` at `target`, replacing an existing file or link the way
/// `ln -sf` does. A real directory in the way is left alone.
pub fn force_symlink(target: &Path, link: &Path) -> Result<()> {
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_dir() => {
            warn!("directory exists, not linking: {}", link.display());
            return Ok(());
        }
        Ok(_) => fs::remove_file(link)?,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    info!("linking {} -> {}", link.display(), target.display());
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InstallConfig, MapEnvironment};
    use crate::provision::runner::MockCommandRunner;
    use crate::utils::password::RandomPasswordGenerator;
    use std::path::PathBuf;

    fn config_in(root: &Path) -> InstallConfig {
        let env = MapEnvironment::new()
            .with("DOCDB_ROOT", root.to_string_lossy())
            .with("DOCDB_SITES_ENABLED", root.join("sites-enabled").to_string_lossy());
        InstallConfig::from_environment(&env, &RandomPasswordGenerator::default()).unwrap()
    }

    #[test]
    fn test_install_source_skips_existing_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir_all(&config.srcdir).unwrap();

        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(0);
        Provisioner::new(config, runner, dir.path())
            .install_source()
            .unwrap();
    }

    #[test]
    fn test_install_source_clones_tag() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.gittag = "docdb-8.8.9".to_string();
        let srcdir = config.srcdir.to_string_lossy().into_owned();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(move |c| {
                c.program == "git"
                    && c.args
                        == vec![
                            "clone".to_string(),
                            "-b".to_string(),
                            "docdb-8.8.9".to_string(),
                            "https://github.com/brettviren/DocDB.git".to_string(),
                            srcdir.clone(),
                        ]
            })
            .times(1)
            .returning(|_| Ok(()));

        Provisioner::new(config, runner, dir.path())
            .install_source()
            .unwrap();
    }

    #[test]
    fn test_force_symlink_replaces_existing_link() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        force_symlink(Path::new("/first"), &link).unwrap();
        force_symlink(Path::new("/second"), &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("/second"));
    }

    #[test]
    fn test_force_symlink_leaves_directories_alone() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("Static");
        fs::create_dir(&existing).unwrap();
        force_symlink(Path::new("/elsewhere"), &existing).unwrap();
        assert!(fs::symlink_metadata(&existing).unwrap().is_dir());
    }

    #[test]
    fn test_layout_web_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let file_root = config.file_root.to_string_lossy().into_owned();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(move |c| {
                c.program == "chown"
                    && c.args == vec!["www-data:www-data".to_string(), file_root.clone()]
            })
            .times(1)
            .returning(|_| Ok(()));

        let provisioner = Provisioner::new(config, runner, dir.path());
        provisioner.layout_web_paths().unwrap();

        let config = provisioner.config();
        assert_eq!(
            fs::read_link(config.file_root.join("Static")).unwrap(),
            config.srcdir.join("DocDB/html")
        );
        assert_eq!(
            fs::read_link(config.script_root.join("private")).unwrap(),
            config.srcdir.join("DocDB/cgi")
        );
    }
}
