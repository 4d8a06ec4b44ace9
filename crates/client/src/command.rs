//! Local command execution
//!
//! Thin wrapper around `tokio::process` for driving the local `usbip` tool.
//! The kernel-side import/release of devices is usbip's job; we only shell
//! out to it and turn non-zero exits into proper errors.

use awusb_common::{Error, Result};
use tokio::process::Command;
use tracing::debug;

/// Captured output of a finished command
#[derive(Debug)]
pub struct CommandOutput {
    pub status_ok: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run a command, capturing output; non-zero exit becomes `Error::Command`
pub async fn run_command(program: &str, args: &[&str]) -> Result<CommandOutput> {
    let output = run_command_unchecked(program, args).await?;
    if !output.status_ok {
        return Err(Error::Command {
            command: format!("{} {}", program, args.join(" ")),
            message: if output.stderr.trim().is_empty() {
                "exited with non-zero status".to_string()
            } else {
                output.stderr.trim().to_string()
            },
        });
    }
    Ok(output)
}

/// Run a command, capturing output without failing on non-zero exit
///
/// Used where a failure is an expected answer, e.g. `usbip port` when the
/// vhci-hcd module is not loaded.
pub async fn run_command_unchecked(program: &str, args: &[&str]) -> Result<CommandOutput> {
    debug!("Running: {} {}", program, args.join(" "));
    let output = Command::new(program).args(args).output().await?;

    Ok(CommandOutput {
        status_ok: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
