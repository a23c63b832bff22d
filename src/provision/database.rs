//! MySQL database bootstrap

use crate::config::Secret;
use crate::error::Result;
use crate::provision::provisioner::Provisioner;
use crate::provision::runner::{CommandLine, CommandRunner};
use tracing::{info, warn};

pub const INIT_SQL_TEMPLATE: &str = "mysql-init.sql.template";
pub const SECGRP_SQL_TEMPLATE: &str = "mysql-secgrp.sql.template";

/// Schema script shipped with the DocDB sources
pub const CREATE_DATABASE_SCRIPT: &str = "{srcdir}/DocDB/sql/CreateDatabase.SQL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseOutcome {
    Created,
    AlreadyExists,
}

/// True when `name` is one of the lines of a `show databases` listing
pub fn database_listed(listing: &str, name: &str) -> bool {
    listing.lines().any(|line| line.trim() == name)
}

fn root_client() -> CommandLine {
    CommandLine::new("mysql").args(["-u{db_rootuser}", "-h{db_host}"])
}

fn admin_client() -> CommandLine {
    CommandLine::new("mysql")
        .args(["-u{db_admuser}", "-h{db_host}", "{db_name}"])
        .env("MYSQL_PWD", Secret::new("{db_admpass}"))
}

impl<R: CommandRunner> Provisioner<R> {
    /// Step 6: create the database, its accounts and its schema. An
    /// existing database is never dropped or modified; the step warns and
    /// returns instead.
    pub fn configure_database(&self) -> Result<DatabaseOutcome> {
        let listing = self.command(
            &root_client().args(["--batch", "--skip-column-names", "-e", "show databases"]),
            &[],
        )?;

        let db_name = &self.config().db_name;
        if database_listed(&listing, db_name) {
            warn!("Database exists: \"{}\", manually drop to remake.", db_name);
            return Ok(DatabaseOutcome::AlreadyExists);
        }

        // rendered scripts hold passwords; the directory is private and
        // removed when this function returns
        let workdir = tempfile::Builder::new()
            .prefix("docdb-install-")
            .tempdir()?;
        let init_sql = workdir.path().join("mysql-init.sql");
        let init_sql = init_sql.to_string_lossy().into_owned();
        let secgrp_sql = workdir.path().join("mysql-secgrp.sql");
        let secgrp_sql = secgrp_sql.to_string_lossy().into_owned();

        self.render(INIT_SQL_TEMPLATE, "{sql_file}", &[("sql_file", init_sql.as_str())])?;
        self.render(SECGRP_SQL_TEMPLATE, "{sql_file}", &[("sql_file", secgrp_sql.as_str())])?;

        self.shell(&root_client().stdin_file("{sql_file}"), &[("sql_file", init_sql.as_str())])?;
        self.shell(&admin_client().stdin_file(CREATE_DATABASE_SCRIPT), &[])?;
        self.shell(&admin_client().stdin_file("{sql_file}"), &[("sql_file", secgrp_sql.as_str())])?;

        info!("database {} created", db_name);
        Ok(DatabaseOutcome::Created)
    }
}
