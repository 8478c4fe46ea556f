// src/commands.rs
//
// Every OS enumeration command the services shell out to goes through this
// wrapper so a hung dependency cannot stall a scan indefinitely.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("{program} exited with status {code}")]
    Failed { program: String, code: i32 },
}

/// Run a command to completion, capturing stdout. Non-zero exit, spawn
/// failure (typically the binary not existing on this OS) and timeout all
/// surface as errors; callers degrade to a sentinel instead of propagating.
pub async fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, CommandError> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();

    let output = tokio::time::timeout(timeout, output)
        .await
        .map_err(|_| CommandError::TimedOut {
            program: program.to_string(),
            timeout,
        })?
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            code: output.status.code().unwrap_or(-1),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_of_successful_command() {
        let out = run_with_timeout("echo", &["inventory"], Duration::from_secs(3))
            .await
            .unwrap();
        assert_eq!(out.trim(), "inventory");
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let err = run_with_timeout("definitely-not-a-real-binary", &[], Duration::from_secs(3))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let err = run_with_timeout("sleep", &["5"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::TimedOut { .. }));
    }
}
