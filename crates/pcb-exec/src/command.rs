//! Argument-vector and shell-string commands.
//!
//! The two forms never mix implicitly: an [`ArgCommand`] can be turned
//! into a [`ShellCommand`] with [`ArgCommand::to_shell_cmd`], which quotes
//! every token, but there is no way back.

use std::borrow::Cow;
use std::fmt;
use std::ops::{Add, BitOr};
use std::path::Path;

use pcb_common::error::Result;

use crate::completed::{CompletedExec, ExecOptions};
use crate::target::ExecutorTarget;

/// Quotes `token` for safe embedding in a POSIX shell string.
pub fn quote(token: &str) -> Cow<'_, str> {
    // nul bytes are allowed, so the quoter cannot fail
    shlex::Quoter::new()
        .allow_nul(true)
        .quote(token)
        .unwrap_or(Cow::Borrowed(token))
}

/// Quotes every token and joins them with spaces.
pub fn join_quoted<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| quote(t.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A command given as an argument vector, run without shell interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgCommand {
    args: Vec<String>,
}

impl ArgCommand {
    /// Creates a command from its tokens.
    #[must_use]
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a command consisting of a single token.
    #[must_use]
    pub fn from_single(arg: impl Into<String>) -> Self {
        Self {
            args: vec![arg.into()],
        }
    }

    /// Concatenates `parts`, dropping every absent token.
    ///
    /// ```
    /// use pcb_exec::ArgCommand;
    ///
    /// let workdir: Option<String> = None;
    /// let cmd = ArgCommand::combine([
    ///     vec![Some("exec".to_owned()), workdir],
    ///     vec![Some("web".to_owned())],
    /// ]);
    /// assert_eq!(cmd.args(), ["exec", "web"]);
    /// ```
    #[must_use]
    pub fn combine<I, P, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            args: parts
                .into_iter()
                .flatten()
                .flatten()
                .map(Into::into)
                .collect(),
        }
    }

    /// Appends one token.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends `arg` if present.
    #[must_use]
    pub fn opt_arg<S: Into<String>>(mut self, arg: Option<S>) -> Self {
        if let Some(arg) = arg {
            self.args.push(arg.into());
        }
        self
    }

    /// Appends every present token of `args`.
    #[must_use]
    pub fn extend_present<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().flatten().map(Into::into));
        self
    }

    /// The tokens of this command.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Consumes the command, returning its tokens.
    pub fn into_args(self) -> Vec<String> {
        self.args
    }

    /// Converts into a shell string by quoting every token.
    #[must_use]
    pub fn to_shell_cmd(&self) -> ShellCommand {
        ShellCommand::new(self.to_string())
    }

    /// Runs the command on `executor`.
    ///
    /// # Errors
    ///
    /// Propagates the executor's failure.
    pub fn run(&self, executor: &dyn ExecutorTarget, options: &ExecOptions) -> Result<CompletedExec> {
        executor.exec(&self.args, options)
    }
}

impl Add for ArgCommand {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self.args.extend(other.args);
        self
    }
}

impl fmt::Display for ArgCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_quoted(&self.args))
    }
}

/// A command given as a string interpreted by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    command: String,
}

impl ShellCommand {
    /// Wraps a shell string.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The shell string.
    pub fn as_str(&self) -> &str {
        &self.command
    }

    /// `(self) | (other)`; an argument command is quoted first.
    #[must_use]
    pub fn pipe(&self, other: &Command) -> Self {
        Self::new(format!("({}) | ({other})", self.command))
    }

    /// `self < path`, with `path` quoted.
    #[must_use]
    pub fn read_from(&self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_string_lossy();
        Self::new(format!("{} < {}", self.command, quote(&path)))
    }

    /// `self > path`, with `path` quoted.
    #[must_use]
    pub fn write_to(&self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_string_lossy();
        Self::new(format!("{} > {}", self.command, quote(&path)))
    }

    /// Appends raw text to the shell string, e.g. a flag.
    #[must_use]
    pub fn append(&self, suffix: &str) -> Self {
        Self::new(format!("{}{suffix}", self.command))
    }

    /// Runs the command through the executor's shell.
    ///
    /// # Errors
    ///
    /// Fails if the executor has no usable shell or the execution fails.
    pub fn run(&self, executor: &dyn ExecutorTarget, options: &ExecOptions) -> Result<CompletedExec> {
        executor.exec_shell(&self.command, options)
    }
}

impl BitOr<&Command> for &ShellCommand {
    type Output = ShellCommand;

    fn bitor(self, other: &Command) -> ShellCommand {
        self.pipe(other)
    }
}

impl BitOr for ShellCommand {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        self.pipe(&Command::Shell(other))
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)
    }
}

/// Either form of command, dispatched exhaustively at execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Argument vector.
    Args(ArgCommand),
    /// Shell string.
    Shell(ShellCommand),
}

impl Command {
    /// Runs the command on `executor`.
    ///
    /// # Errors
    ///
    /// Propagates the executor's failure.
    pub fn run(&self, executor: &dyn ExecutorTarget, options: &ExecOptions) -> Result<CompletedExec> {
        match self {
            Self::Args(cmd) => cmd.run(executor, options),
            Self::Shell(cmd) => cmd.run(executor, options),
        }
    }
}

impl From<ArgCommand> for Command {
    fn from(cmd: ArgCommand) -> Self {
        Self::Args(cmd)
    }
}

impl From<ShellCommand> for Command {
    fn from(cmd: ShellCommand) -> Self {
        Self::Shell(cmd)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Args(cmd) => fmt::Display::fmt(cmd, f),
            Self::Shell(cmd) => fmt::Display::fmt(cmd, f),
        }
    }
}
