//! Base command execution abstraction
//!
//! Provides the foundational trait for executing external commands, enabling
//! dependency injection for testing. Secrets handed to a child process travel
//! on its standard input and never become part of the rendered command line.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status_code: i32,
    /// Raw bytes; a `Pipe` step hands them on to the next command unchanged
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }

    pub fn ok() -> Self {
        Self {
            status_code: 0,
            stdout: Vec::new(),
            stderr: String::new(),
        }
    }

    /// Stdout decoded as UTF-8, lossily
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Last non-empty line of stderr, used when reporting a failed step
    pub fn stderr_tail(&self) -> Option<&str> {
        self.stderr.lines().rev().find(|line| !line.trim().is_empty())
    }
}

#[derive(Debug, Error, Clone)]
pub enum CommandError {
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("Failed to write standard input of {command}: {message}")]
    Stdin { command: String, message: String },
    #[error("IO error: {message}")]
    Io { message: String },
}

/// How the child's stdout/stderr are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect output into the returned `CommandOutput`
    Capture,
    /// Stream straight to the operator's terminal (package managers, compilers)
    Inherit,
}

/// A fully described external command.
///
/// `Display` renders the command line an operator would type; the stdin
/// payload is shown only as a placeholder.
#[derive(Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<StdinPayload>,
    pub output: OutputMode,
}

/// Bytes written to a child's standard input
#[derive(Clone)]
pub enum StdinPayload {
    Secret(SecretString),
    /// Standard output of an earlier invocation in the same step
    Piped(Vec<u8>),
}

impl StdinPayload {
    fn as_bytes(&self) -> &[u8] {
        match self {
            StdinPayload::Secret(secret) => secret.expose_secret().as_bytes(),
            StdinPayload::Piped(data) => data.as_slice(),
        }
    }
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            stdin: None,
            output: OutputMode::Inherit,
        }
    }

    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_secret_stdin(mut self, secret: SecretString) -> Self {
        self.stdin = Some(StdinPayload::Secret(secret));
        self
    }

    pub fn with_piped_stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(StdinPayload::Piped(data.into()));
        self
    }

    pub fn captured(mut self) -> Self {
        self.output = OutputMode::Capture;
        self
    }

    /// Prefix the command with `sudo` when `use_sudo` is set
    pub fn privileged(self, use_sudo: bool) -> Self {
        if !use_sudo {
            return self;
        }
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            ..self
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        match self.stdin {
            Some(StdinPayload::Secret(_)) => write!(f, " < [REDACTED]")?,
            Some(StdinPayload::Piped(_)) => write!(f, " < (piped)")?,
            None => {}
        }
        if let Some(cwd) = &self.cwd {
            write!(f, " (in {})", cwd.display())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Invocation").field(&self.to_string()).finish()
    }
}

/// Trait for executing external commands
///
/// This abstraction allows the rest of the codebase to execute commands
/// without directly depending on tokio::process::Command, enabling testing
/// with mock implementations.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError>;
}

/// Real implementation using tokio::process::Command
pub struct ProcessCommandExecutor;

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        use tokio::process::Command;

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }
        command.stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        match invocation.output {
            OutputMode::Capture => {
                command.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            OutputMode::Inherit => {
                command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandError::CommandNotFound {
                    command: invocation.program.clone(),
                }
            } else {
                CommandError::Io {
                    message: e.to_string(),
                }
            }
        })?;

        // Stdin is fed while stdout/stderr drain, so a child echoing a large
        // payload cannot fill its output pipe and stall the write.
        let stdin = child.stdin.take();
        let feed_stdin = async {
            let (Some(payload), Some(mut stdin)) = (&invocation.stdin, stdin) else {
                return Ok::<(), std::io::Error>(());
            };
            stdin.write_all(payload.as_bytes()).await?;
            // Shutting down closes the pipe so the child sees EOF
            stdin.shutdown().await
        };

        let (fed, output) = tokio::join!(feed_stdin, child.wait_with_output());
        let output = output.map_err(|e| CommandError::Io {
            message: e.to_string(),
        })?;
        // A child may exit without reading all of its input; its exit status
        // is the report that matters then.
        if let Err(e) = fed {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(CommandError::Stdin {
                    command: invocation.program.clone(),
                    message: e.to_string(),
                });
            }
        }

        Ok(CommandOutput {
            status_code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
