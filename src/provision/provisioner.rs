//! Provisioning primitives shared by every installation step

use crate::config::{InstallConfig, Secret};
use crate::error::{InstallError, Result};
use crate::provision::runner::{CommandLine, CommandRunner, Stdin};
use crate::utils::template;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of [`Provisioner::render`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Written(PathBuf),
    Skipped(PathBuf),
}

/// Runs the installation sequence against a resolved configuration
pub struct Provisioner<R: CommandRunner> {
    config: InstallConfig,
    runner: R,
    template_dir: PathBuf,
}

impl<R: CommandRunner> Provisioner<R> {
    pub fn new<P: Into<PathBuf>>(config: InstallConfig, runner: R, template_dir: P) -> Self {
        Self {
            config,
            runner,
            template_dir: template_dir.into(),
        }
    }

    pub fn config(&self) -> &InstallConfig {
        &self.config
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Steps 1-5 followed by the database step
    pub fn run(&self) -> Result<()> {
        self.install_files()?;
        self.configure_database()?;
        Ok(())
    }

    /// Format `command` against the configuration, log and run it
    pub fn shell(&self, command: &CommandLine, overrides: &[(&str, &str)]) -> Result<()> {
        let command = self.prepare(command, overrides)?;
        info!("shell: {}", command);
        self.runner.run(&command)
    }

    /// Like [`Provisioner::shell`], returning the command's standard output
    pub fn command(&self, command: &CommandLine, overrides: &[(&str, &str)]) -> Result<String> {
        let command = self.prepare(command, overrides)?;
        info!("shell: {}", command);
        self.runner.output(&command)
    }

    /// Resolve a template reference. Absolute paths pass through; relative
    /// ones are looked up in the template directory.
    pub fn locate(&self, reference: &str, overrides: &[(&str, &str)]) -> Result<PathBuf> {
        let reference = self.config.format(reference, overrides)?;
        let path = Path::new(&reference);
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }

        let candidate = self.template_dir.join(path);
        if candidate.exists() {
            return Ok(candidate);
        }

        Err(InstallError::template_not_found(reference))
    }

    /// Render `template` into `destination` unless the destination already
    /// exists
    pub fn render(
        &self,
        template: &str,
        destination: &str,
        overrides: &[(&str, &str)],
    ) -> Result<RenderOutcome> {
        let destination = PathBuf::from(self.config.format(destination, overrides)?);
        if destination.exists() {
            warn!("file exists: {}", destination.display());
            return Ok(RenderOutcome::Skipped(destination));
        }

        let source = self.locate(template, overrides)?;
        info!("filtering {}", destination.display());

        let text = fs::read_to_string(&source)?;
        let mut vars = self.config.vars()?;
        for (key, value) in overrides {
            vars.insert((*key).to_string(), (*value).to_string());
        }
        let rendered = template::render(&text, &vars)?;

        fs::write(&destination, rendered)?;
        Ok(RenderOutcome::Written(destination))
    }

    /// Step 7: persist the configuration readable by its owner only
    pub fn save(&self, destination: &Path) -> Result<PathBuf> {
        let written = self.config.save(destination)?;
        restrict_permissions(&written)?;
        info!("installation data in {}", written.display());
        Ok(written)
    }

    fn prepare(&self, command: &CommandLine, overrides: &[(&str, &str)]) -> Result<CommandLine> {
        let format = |text: &str| self.config.format(text, overrides);

        let stdin = match &command.stdin {
            Stdin::Null => Stdin::Null,
            Stdin::File(path) => Stdin::File(PathBuf::from(format(&path.to_string_lossy())?)),
            Stdin::Data(data) => Stdin::Data(Secret::new(format(data.expose())?)),
        };

        let env = command
            .env
            .iter()
            .map(|(name, value)| Ok((name.clone(), Secret::new(format(value.expose())?))))
            .collect::<Result<Vec<_>>>()?;

        Ok(CommandLine {
            program: format(&command.program)?,
            args: command
                .args
                .iter()
                .map(|arg| format(arg))
                .collect::<Result<Vec<_>>>()?,
            stdin,
            env,
        })
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapEnvironment;
    use crate::provision::runner::MockCommandRunner;
    use crate::utils::password::RandomPasswordGenerator;
    use mockall::predicate::*;

    fn config() -> InstallConfig {
        InstallConfig::from_environment(
            &MapEnvironment::new().with("DOCDB_ROOT", "/srv/docdb"),
            &RandomPasswordGenerator::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_shell_formats_arguments() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .with(function(|c: &CommandLine| {
                c.program == "git"
                    && c.args == ["clone", "-b", "v8.8", "https://github.com/brettviren/DocDB.git", "/srv/docdb/src"]
            }))
            .times(1)
            .returning(|_| Ok(()));

        let provisioner = Provisioner::new(config(), runner, "/nonexistent");
        let command = CommandLine::new("git").args(["clone", "-b", "{tag}", "{giturl}", "{srcdir}"]);
        provisioner.shell(&command, &[("tag", "v8.8")]).unwrap();
    }

    #[test]
    fn test_shell_formats_secrets_without_exposing_them() {
        let config = config();
        let password = config.db_admpass.clone();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(move |c| c.env == vec![("MYSQL_PWD".to_string(), password.clone())])
            .times(1)
            .returning(|_| Ok(()));

        let provisioner = Provisioner::new(config, runner, "/nonexistent");
        let command = CommandLine::new("mysql").env("MYSQL_PWD", Secret::new("{db_admpass}"));
        provisioner.shell(&command, &[]).unwrap();
    }

    #[test]
    fn test_shell_propagates_failure() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|c| {
            Err(InstallError::CommandFailed {
                command: c.to_string(),
                status: "exit status: 1".to_string(),
                stderr: String::new(),
            })
        });

        let provisioner = Provisioner::new(config(), runner, "/nonexistent");
        let err = provisioner.shell(&CommandLine::new("false"), &[]).unwrap_err();
        assert!(matches!(err, InstallError::CommandFailed { .. }));
    }

    #[test]
    fn test_shell_missing_key_runs_nothing() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(0);

        let provisioner = Provisioner::new(config(), runner, "/nonexistent");
        let err = provisioner
            .shell(&CommandLine::new("echo").arg("{undefined}"), &[])
            .unwrap_err();
        assert!(matches!(err, InstallError::MissingKey { ref key } if key == "undefined"));
    }

    #[test]
    fn test_command_returns_output() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_output()
            .returning(|_| Ok("DocDB\n".to_string()));

        let provisioner = Provisioner::new(config(), runner, "/nonexistent");
        let out = provisioner.command(&CommandLine::new("mysql"), &[]).unwrap();
        assert_eq!(out, "DocDB\n");
    }

    #[test]
    fn test_locate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("apache-site.template"), "x").unwrap();
        let provisioner = Provisioner::new(config(), MockCommandRunner::new(), dir.path());

        assert_eq!(
            provisioner.locate("apache-site.template", &[]).unwrap(),
            dir.path().join("apache-site.template")
        );
        assert_eq!(
            provisioner.locate("/etc/absolute.template", &[]).unwrap(),
            PathBuf::from("/etc/absolute.template")
        );
        assert!(matches!(
            provisioner.locate("missing.template", &[]),
            Err(InstallError::TemplateNotFound { .. })
        ));
    }

    #[test]
    fn test_render_writes_destination() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("site.template"), "ServerName {web_host}\n").unwrap();
        let provisioner = Provisioner::new(config(), MockCommandRunner::new(), dir.path());

        let destination = dir.path().join("site.conf");
        let outcome = provisioner
            .render("site.template", &destination.to_string_lossy(), &[])
            .unwrap();

        assert_eq!(outcome, RenderOutcome::Written(destination.clone()));
        assert_eq!(fs::read_to_string(destination).unwrap(), "ServerName localhost\n");
    }

    #[test]
    fn test_render_skips_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("site.template"), "ServerName {web_host}\n").unwrap();
        let destination = dir.path().join("site.conf");
        fs::write(&destination, "hand edited\n").unwrap();
        let provisioner = Provisioner::new(config(), MockCommandRunner::new(), dir.path());

        let outcome = provisioner
            .render("site.template", &destination.to_string_lossy(), &[])
            .unwrap();

        assert_eq!(outcome, RenderOutcome::Skipped(destination.clone()));
        assert_eq!(fs::read_to_string(destination).unwrap(), "hand edited\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let provisioner = Provisioner::new(config(), MockCommandRunner::new(), dir.path());
        let path = provisioner.save(&dir.path().join("installation.json")).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
