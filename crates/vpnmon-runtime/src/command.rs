use crate::error::{MonitorError, Result};
use tracing::debug;

/// Captured result of an external process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

fn command_line<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(|arg| AsRef::<str>::as_ref(arg)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a program and fail with `CommandFailed` on a non-zero exit code
pub async fn exec<S: AsRef<str>>(program: &str, args: &[S]) -> Result<CommandOutput> {
    let output = exec_unchecked(program, args).await?;

    if !output.success() {
        return Err(MonitorError::command_failed(
            command_line(program, args),
            output.exit_code,
            output.stderr.trim(),
        ));
    }

    Ok(output)
}

/// Run a program and return its output regardless of exit code.
///
/// Only a failure to spawn the process is an error here. A process killed by
/// a signal reports exit code -1.
pub async fn exec_unchecked<S: AsRef<str>>(program: &str, args: &[S]) -> Result<CommandOutput> {
    let line = command_line(program, args);
    debug!("Executing: {}", line);

    let output = tokio::process::Command::new(program)
        .args(args.iter().map(|arg| AsRef::<str>::as_ref(arg)))
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| MonitorError::command_failed(line.clone(), -1, e.to_string()))?;

    let exit_code = output.status.code().unwrap_or(-1);
    debug!("Command exited with code {}: {}", exit_code, line);

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code,
    })
}
