//! Shell command execution for work items

use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Lines of stderr kept in an exit error
const STDERR_TAIL_LINES: usize = 5;

/// Errors from running a shell command
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Run `command` with `sh -c` and return its trimmed stdout.
///
/// A non-zero exit is an error carrying the tail of stderr.
pub async fn run_shell(command: &str) -> Result<String, ShellError> {
    debug!(%command, "run_shell: called");
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| ShellError::Spawn {
            command: command.to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.trim().lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        debug!(%command, status = %output.status, "run_shell: command failed");
        return Err(ShellError::Exit {
            command: command.to_string(),
            status: output.status.to_string(),
            stderr: tail,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let out = run_shell("echo hello").await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let err = run_shell("echo oops >&2; exit 3").await.unwrap_err();
        match err {
            ShellError::Exit { status, stderr, .. } => {
                assert!(status.contains('3'));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_stderr_tail_is_bounded() {
        let err = run_shell("for i in 1 2 3 4 5 6 7 8; do echo line$i >&2; done; false")
            .await
            .unwrap_err();
        let ShellError::Exit { stderr, .. } = err else {
            panic!("expected exit error");
        };
        assert_eq!(stderr.lines().count(), STDERR_TAIL_LINES);
        assert!(stderr.ends_with("line8"));
    }
}
