//! External command execution
//!
//! The camera, the viewer and the mail transport are all external programs.
//! Commands are spawned directly (no shell), optionally fed on stdin, and
//! bounded by a timeout. Arguments may contain `{placeholder}` tokens that
//! are expanded before spawning.

use crate::error::CommandError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Output of a command that exited successfully
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Replace `{key}` tokens in each argument
pub fn expand_args(args: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (key, value)| {
                acc.replace(&format!("{{{}}}", key), value)
            })
        })
        .collect()
}

/// Run `program` with `args`, optionally writing `stdin`, and wait for it
/// to exit within `limit`.
///
/// The child is killed when the timeout fires.
pub async fn run_with_timeout(
    program: &str,
    args: &[String],
    stdin: Option<&[u8]>,
    limit: Duration,
) -> Result<CommandOutput, CommandError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CommandError::NotFound(program.to_string()),
            _ => CommandError::Spawn {
                program: program.to_string(),
                message: e.to_string(),
            },
        })?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input)
            .await
            .map_err(|e| CommandError::Write(e.to_string()))?;
        // Close stdin to signal EOF
        drop(pipe);
    }

    let output = timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| CommandError::Timeout(limit.as_secs()))?
        .map_err(|e| CommandError::Wait(e.to_string()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        return Err(CommandError::NonZeroExit {
            code: output.status.code(),
            stderr,
        });
    }

    Ok(CommandOutput { stdout, stderr })
}
