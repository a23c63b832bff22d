//! External process invocation
//!
//! Commands are described as a program plus an argument vector and run
//! without a shell, so configuration values never pass through shell
//! parsing. Secrets travel through stdin or the child environment and are
//! masked whenever a command is displayed.

use crate::config::Secret;
use crate::error::{InstallError, Result};
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Standard input of a child process
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Stdin {
    #[default]
    Null,
    File(PathBuf),
    Data(Secret),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Stdin,
    pub env: Vec<(String, Secret)>,
}

impl CommandLine {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: Stdin::Null,
            env: Vec::new(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.stdin = Stdin::File(path.into());
        self
    }

    pub fn stdin_data(mut self, data: Secret) -> Self {
        self.stdin = Stdin::Data(data);
        self
    }

    pub fn env<K: Into<String>>(mut self, name: K, value: Secret) -> Self {
        self.env.push((name.into(), value));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, _) in &self.env {
            write!(f, "{}={} ", name, Secret::masked())?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        match &self.stdin {
            Stdin::Null => Ok(()),
            Stdin::File(path) => write!(f, " < {}", path.display()),
            Stdin::Data(_) => write!(f, " <<< {}", Secret::masked()),
        }
    }
}

/// Runs external commands on behalf of the provisioner
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Run to completion, failing on a nonzero exit status
    fn run(&self, command: &CommandLine) -> Result<()>;

    /// Run to completion and return standard output
    fn output(&self, command: &CommandLine) -> Result<String>;
}

/// Spawns real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn execute(&self, command: &CommandLine, capture: bool) -> Result<Output> {
        let mut process = Command::new(&command.program);
        process.args(&command.args);
        for (name, value) in &command.env {
            process.env(name, value.expose());
        }

        match &command.stdin {
            Stdin::Null => {
                process.stdin(Stdio::null());
            }
            Stdin::File(path) => {
                process.stdin(Stdio::from(open_stdin(path)?));
            }
            Stdin::Data(_) => {
                process.stdin(Stdio::piped());
            }
        }

        if capture {
            process.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            process.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let mut child = process.spawn().map_err(|source| InstallError::CommandSpawn {
            command: command.to_string(),
            source,
        })?;

        if let Stdin::Data(data) = &command.stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(data.expose().as_bytes())?;
                pipe.write_all(b"\n")?;
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(InstallError::CommandFailed {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

/// Open a file to feed a child's stdin. Only an absent file is reported as
/// `MissingFile`; other failures keep their I/O cause.
fn open_stdin(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => InstallError::missing_file(path),
        _ => e.into(),
    })
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> Result<()> {
        self.execute(command, false).map(|_| ())
    }

    fn output(&self, command: &CommandLine) -> Result<String> {
        let output = self.execute(command, true)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
