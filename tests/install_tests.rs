use docdb_install::config::{InstallConfig, MapEnvironment};
use docdb_install::provision::{CommandLine, CommandRunner, DatabaseOutcome, Provisioner};
use docdb_install::utils::RandomPasswordGenerator;
use docdb_install::Result;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Records every command instead of running it
#[derive(Default)]
struct RecordingRunner {
    commands: RefCell<Vec<CommandLine>>,
    listing: String,
}

impl RecordingRunner {
    fn with_databases(listing: &str) -> Self {
        Self {
            commands: RefCell::default(),
            listing: listing.to_string(),
        }
    }

    fn programs(&self) -> Vec<String> {
        self.commands
            .borrow()
            .iter()
            .map(|c| c.program.clone())
            .collect()
    }
}

impl CommandRunner for &RecordingRunner {
    fn run(&self, command: &CommandLine) -> Result<()> {
        self.commands.borrow_mut().push(command.clone());
        Ok(())
    }

    fn output(&self, command: &CommandLine) -> Result<String> {
        self.commands.borrow_mut().push(command.clone());
        Ok(self.listing.clone())
    }
}

fn template_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("templates")
}

/// Configuration rooted in `root`, with an existing checkout so no clone
/// is attempted
fn prepared_config(root: &Path) -> InstallConfig {
    let env = MapEnvironment::new()
        .with("DOCDB_ROOT", root.to_string_lossy())
        .with("DOCDB_SITES_ENABLED", root.join("sites-enabled").to_string_lossy())
        .with("DOCDB_WEB_HOST", "docdb.example.org");
    let config = InstallConfig::from_environment(&env, &RandomPasswordGenerator::default()).unwrap();

    fs::create_dir_all(config.srcdir.join("DocDB").join("html")).unwrap();
    fs::create_dir_all(config.srcdir.join("DocDB").join("cgi")).unwrap();
    fs::create_dir_all(&config.sites_enabled).unwrap();
    config
}

#[cfg(test)]
mod install_files_tests {
    use super::*;

    #[test]
    fn test_fresh_install_lays_out_site() {
        let root = TempDir::new().unwrap();
        let config = prepared_config(root.path());
        let runner = RecordingRunner::default();

        let provisioner = Provisioner::new(config, &runner, template_dir());
        provisioner.install_files().unwrap();
        let config = provisioner.config();

        assert_eq!(runner.programs(), vec!["chown", "htpasswd", "htpasswd"]);

        let globals =
            fs::read_to_string(config.script_root.join("private").join("ProjectGlobals.pm"))
                .unwrap();
        assert!(globals.contains("$db_name       = \"DocDB\";"));
        assert!(globals.contains(&format!("$db_rwpass     = \"{}\";", config.db_rwpass.expose())));
        assert!(globals.contains("%SecurityGroupDefaults"));

        // rendered through the script link into the checkout
        assert!(config
            .srcdir
            .join("DocDB/cgi/ProjectHelp.xml")
            .exists());

        let site = fs::read_to_string(config.root.join("apache-site.conf")).unwrap();
        assert!(site.contains("ServerName docdb.example.org"));
        assert_eq!(
            fs::read_link(config.sites_enabled.join("docdb.example.org.conf")).unwrap(),
            config.root.join("apache-site.conf")
        );

        assert!(config.auth_file.exists());
    }

    #[test]
    fn test_rerun_skips_existing_artifacts() {
        let root = TempDir::new().unwrap();
        let config = prepared_config(root.path());

        let first = RecordingRunner::default();
        Provisioner::new(config.clone(), &first, template_dir())
            .install_files()
            .unwrap();

        let site = config.root.join("apache-site.conf");
        fs::write(&site, "# edited by the operator\n").unwrap();
        let credentials = "docdbadm:$apr1$aaaa$AAAA\ndocdbrw:$apr1$bbbb$BBBB\n";
        fs::write(&config.auth_file, credentials).unwrap();

        let second = RecordingRunner::default();
        Provisioner::new(config.clone(), &second, template_dir())
            .install_files()
            .unwrap();

        assert_eq!(second.programs(), vec!["chown"]);
        assert_eq!(fs::read_to_string(&site).unwrap(), "# edited by the operator\n");
        assert_eq!(fs::read_to_string(&config.auth_file).unwrap(), credentials);
    }

    #[test]
    fn test_missing_template_aborts() {
        let root = TempDir::new().unwrap();
        let config = prepared_config(root.path());
        let empty_templates = TempDir::new().unwrap();
        let runner = RecordingRunner::default();

        let err = Provisioner::new(config, &runner, empty_templates.path())
            .install_files()
            .unwrap_err();
        assert!(err.to_string().contains("ProjectGlobals.pm.template"));
    }
}

#[cfg(test)]
mod database_tests {
    use super::*;

    #[test]
    fn test_existing_database_is_left_alone() {
        let root = TempDir::new().unwrap();
        let config = prepared_config(root.path());
        let runner = RecordingRunner::with_databases("information_schema\nDocDB\nmysql\n");

        let outcome = Provisioner::new(config, &runner, template_dir())
            .configure_database()
            .unwrap();

        assert_eq!(outcome, DatabaseOutcome::AlreadyExists);
        assert_eq!(runner.commands.borrow().len(), 1);
    }

    #[test]
    fn test_new_database_uses_shipped_templates() {
        let root = TempDir::new().unwrap();
        let config = prepared_config(root.path());
        let runner = RecordingRunner::with_databases("information_schema\nmysql\n");

        let outcome = Provisioner::new(config, &runner, template_dir())
            .configure_database()
            .unwrap();

        assert_eq!(outcome, DatabaseOutcome::Created);
        assert_eq!(runner.programs(), vec!["mysql", "mysql", "mysql", "mysql"]);

        let commands = runner.commands.borrow();
        for command in commands.iter() {
            assert!(!command.to_string().contains(command_password(command)));
        }
    }

    fn command_password(command: &CommandLine) -> &str {
        command
            .env
            .first()
            .map(|(_, secret)| secret.expose())
            .unwrap_or("\u{0}")
    }
}
