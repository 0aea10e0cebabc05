//! The recorded test case and its process-output counterpart.

use thiserror::Error;

/// Errors produced while converting between `command` text and an argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("command {command:?} has unbalanced quoting or a dangling escape")]
    Unbalanced { command: String },
    #[error("argument vector cannot be shell-quoted: {reason}")]
    Unquotable { reason: String },
}

/// One recorded expectation: a command, its stdin, and what it produced.
///
/// Immutable once built. Refreshing expectations produces a new value via
/// [`TestCase::with_observed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    expected_exit_code: i32,
    command: String,
    expected_stdout: String,
    expected_stderr: String,
    stdin: String,
}

impl TestCase {
    #[must_use]
    pub fn new(
        expected_exit_code: i32,
        command: impl Into<String>,
        expected_stdout: impl Into<String>,
        expected_stderr: impl Into<String>,
        stdin: impl Into<String>,
    ) -> Self {
        Self {
            expected_exit_code,
            command: command.into(),
            expected_stdout: expected_stdout.into(),
            expected_stderr: expected_stderr.into(),
            stdin: stdin.into(),
        }
    }

    /// Build a case from an argument vector and what the command produced.
    ///
    /// The tokens are joined with shell quoting so that [`TestCase::command_list`]
    /// yields them back unchanged.
    pub fn from_run(
        command_list: &[String],
        stdin: impl Into<String>,
        output: ProcessOutput,
    ) -> Result<Self, TokenizeError> {
        let command = join_command(command_list)?;
        Ok(Self {
            expected_exit_code: output.exit_code,
            command,
            expected_stdout: output.stdout,
            expected_stderr: output.stderr,
            stdin: stdin.into(),
        })
    }

    /// Same command and stdin, fresh expectations.
    #[must_use]
    pub fn with_observed(&self, output: ProcessOutput) -> Self {
        Self {
            expected_exit_code: output.exit_code,
            command: self.command.clone(),
            expected_stdout: output.stdout,
            expected_stderr: output.stderr,
            stdin: self.stdin.clone(),
        }
    }

    #[must_use]
    pub fn expected_exit_code(&self) -> i32 {
        self.expected_exit_code
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn expected_stdout(&self) -> &str {
        &self.expected_stdout
    }

    #[must_use]
    pub fn expected_stderr(&self) -> &str {
        &self.expected_stderr
    }

    #[must_use]
    pub fn stdin(&self) -> &str {
        &self.stdin
    }

    /// Shell-word split of `command`. Never persisted.
    pub fn command_list(&self) -> Result<Vec<String>, TokenizeError> {
        split_command(&self.command)
    }
}

/// Exit code and captured text of one finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// POSIX shell-word splitting of a command line.
pub fn split_command(command: &str) -> Result<Vec<String>, TokenizeError> {
    shlex::split(command).ok_or_else(|| TokenizeError::Unbalanced {
        command: command.to_string(),
    })
}

/// Inverse of [`split_command`]: quote each token as needed and join with spaces.
pub fn join_command(tokens: &[String]) -> Result<String, TokenizeError> {
    shlex::try_join(tokens.iter().map(String::as_str)).map_err(|err| TokenizeError::Unquotable {
        reason: err.to_string(),
    })
}
