//! Running external command-line tools (tesseract, pdftoppm) with a deadline.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::ExtractionError;

/// Name used in error messages for an executable path.
pub(crate) fn tool_name(program: &Path) -> String {
    program
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("tool")
        .to_string()
}

/// Run a prepared command to completion, killing it if it exceeds `timeout`.
///
/// A non-zero exit status is an error carrying the tool's stderr.
pub(crate) async fn run(
    mut command: Command,
    tool: &str,
    timeout: Duration,
) -> Result<Output, ExtractionError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    trace!("Running {}: {:?}", tool, command.as_std());

    let child = command.spawn().map_err(|e| ExtractionError::ToolMissing {
        tool: tool.to_string(),
        reason: e.to_string(),
    })?;

    // Dropping the future on timeout drops the child, which kills it.
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ExtractionError::Timeout {
            tool: tool.to_string(),
            secs: timeout.as_secs(),
        })??;

    if !output.status.success() {
        return Err(ExtractionError::ToolFailed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    debug!("{} finished, {} bytes of output", tool, output.stdout.len());
    Ok(output)
}

/// Check whether a tool can be started with the given argument, e.g. `--version`.
pub(crate) async fn is_available(program: &Path, check_arg: &str) -> bool {
    let mut command = Command::new(program);
    command.arg(check_arg);
    run(command, &tool_name(program), Duration::from_secs(10))
        .await
        .is_ok()
}
