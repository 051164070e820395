//! Synchronous process execution with merged output capture.
//!
//! Every call blocks until the child exits. There is no timeout and no retry.

use std::io::{ErrorKind, Read};
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

/// Shell used for [`Invocation::ShellLine`].
const SHELL: &str = "/bin/sh";

/// What to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Executed directly, no shell interpretation.
    Argv(Vec<String>),
    /// Executed through `/bin/sh -c`. Needed for globbing, `;` chains and
    /// variable expansion inside the command string.
    ShellLine(String),
}

impl Invocation {
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::Argv(args.into_iter().map(Into::into).collect())
    }

    pub fn shell(line: impl Into<String>) -> Self {
        Invocation::ShellLine(line.into())
    }

    /// Name of the program as the operator would recognise it.
    pub fn program(&self) -> &str {
        match self {
            Invocation::Argv(args) => args.first().map(String::as_str).unwrap_or(""),
            Invocation::ShellLine(line) => line.split_whitespace().next().unwrap_or(""),
        }
    }

    fn build_command(&self) -> Result<Command> {
        match self {
            Invocation::Argv(args) => {
                let (program, rest) = args.split_first().ok_or(Error::EmptyCommand)?;
                let mut cmd = Command::new(program);
                cmd.args(rest);
                Ok(cmd)
            }
            Invocation::ShellLine(line) => {
                if line.trim().is_empty() {
                    return Err(Error::EmptyCommand);
                }
                let mut cmd = Command::new(SHELL);
                cmd.args(["-c", line]);
                Ok(cmd)
            }
        }
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Invocation::Argv(args) => write!(f, "{}", args.join(" ")),
            Invocation::ShellLine(line) => write!(f, "{line}"),
        }
    }
}

/// Exit code and combined stdout/stderr of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdOutput {
    /// Exit code, or the negated signal number if the child was killed.
    pub code: i32,
    pub output: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Run `invocation` and capture stdout and stderr as one stream.
///
/// A nonzero exit is not an error here; callers decide what it means.
pub fn run(invocation: &Invocation) -> Result<CmdOutput> {
    let mut cmd = invocation.build_command()?;

    // Both streams share one pipe so their interleaving is preserved.
    let (mut reader, writer) = std::io::pipe()?;
    cmd.stdin(Stdio::null())
        .stdout(writer.try_clone()?)
        .stderr(writer);

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::ProcessStart {
            command: invocation.program().to_string(),
        },
        _ => Error::Spawn {
            command: invocation.program().to_string(),
            source: e,
        },
    })?;
    // The command still holds the write ends; drop them or the read never ends.
    drop(cmd);

    let (status, raw) = drain_and_wait(&mut reader, &mut child)?;

    Ok(CmdOutput {
        code: exit_code(status),
        output: String::from_utf8_lossy(&raw).into_owned(),
    })
}

/// Read the child's output to the end, then reap it.
///
/// The child is waited on even when reading fails.
fn drain_and_wait<R: Read>(reader: &mut R, child: &mut Child) -> Result<(ExitStatus, Vec<u8>)> {
    let mut raw = Vec::new();
    let read = reader.read_to_end(&mut raw);
    let status = child.wait()?;
    read?;
    Ok((status, raw))
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Run a command and fail unless it exits with 0.
///
/// Without `as_shell` the line is split on whitespace and run directly.
/// Returns the trimmed output.
pub fn exec_cmd(cmd_and_args: &str, as_shell: bool) -> Result<String> {
    debug!(cmd = %cmd_and_args, as_shell, "exec_cmd");
    let invocation = if as_shell {
        Invocation::shell(cmd_and_args)
    } else {
        Invocation::argv(cmd_and_args.split_whitespace())
    };

    let result = run(&invocation)?;
    let output = result.output.trim().to_string();
    if !result.success() {
        return Err(Error::CommandFailed {
            command: cmd_and_args.to_string(),
            code: result.code,
            output,
        });
    }

    debug!(cmd = %cmd_and_args, code = result.code, output = %output, "exec_cmd finished");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_runs_without_shell() {
        let result = run(&Invocation::argv(["echo", "$HOME", "*"])).unwrap();
        assert_eq!(result.code, 0);
        assert_eq!(result.output, "$HOME *\n");
    }

    #[test]
    fn test_shell_line_expands_variables() {
        let result = run(&Invocation::shell("X=world; echo hello $X")).unwrap();
        assert!(result.success());
        assert_eq!(result.output.trim(), "hello world");
    }

    #[test]
    fn test_stdout_and_stderr_are_merged() {
        let result = run(&Invocation::shell("echo out; echo err >&2; echo again")).unwrap();
        assert_eq!(result.output, "out\nerr\nagain\n");
    }

    #[test]
    fn test_nonzero_exit_is_returned() {
        let result = run(&Invocation::shell("echo failing; exit 42")).unwrap();
        assert_eq!(result.code, 42);
        assert_eq!(result.output.trim(), "failing");
    }

    #[test]
    fn test_missing_program_is_process_start_error() {
        let err = run(&Invocation::argv(["definitely_not_a_real_command_12345", "-x"])).unwrap_err();
        match err {
            Error::ProcessStart { command } => {
                assert_eq!(command, "definitely_not_a_real_command_12345")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_program_in_shell_is_exit_127() {
        let result = run(&Invocation::shell("definitely_not_a_real_command_12345")).unwrap();
        assert_eq!(result.code, 127);
    }

    #[test]
    fn test_child_is_reaped_when_read_fails() {
        struct BrokenPipe;
        impl Read for BrokenPipe {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::BrokenPipe, "read failed"))
            }
        }

        let mut child = Command::new("true").spawn().unwrap();
        let err = drain_and_wait(&mut BrokenPipe, &mut child).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == ErrorKind::BrokenPipe));
        // already waited on, so the status is available without blocking
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn test_empty_command() {
        assert!(matches!(run(&Invocation::Argv(vec![])), Err(Error::EmptyCommand)));
        assert!(matches!(run(&Invocation::shell("  ")), Err(Error::EmptyCommand)));
    }

    #[test]
    fn test_program_name() {
        assert_eq!(Invocation::argv(["parted", "-s"]).program(), "parted");
        assert_eq!(Invocation::shell("  mkfs.ext4 -F img").program(), "mkfs.ext4");
    }

    #[test]
    fn test_exec_cmd_trims_output() {
        assert_eq!(exec_cmd("echo   spaced  ", false).unwrap(), "spaced");
    }

    #[test]
    fn test_exec_cmd_fails_on_nonzero() {
        let err = exec_cmd("false", false).unwrap_err();
        match err {
            Error::CommandFailed { command, code, .. } => {
                assert_eq!(command, "false");
                assert_eq!(code, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
