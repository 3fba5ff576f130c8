//! `.wskprops` materialization for wskdeploy.

use std::path::Path;

use crate::credentials::PlatformCredentials;
use crate::error::{CommandFailedDetails, Error, Result};
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::utils::shell;

/// Render the three-line props file. Unresolved values render empty.
pub fn render(platform: &PlatformCredentials, namespace: &str) -> String {
    format!(
        "AUTH={}\nAPIHOST={}\nNAMESPACE={}\n",
        platform.wsk_auth.as_deref().unwrap_or_default(),
        platform.wsk_api_host.as_deref().unwrap_or_default(),
        namespace
    )
}

/// POSIX shell command that writes `content` to `path`.
pub fn write_command(path: &Path, content: &str) -> CommandSpec {
    let script = format!(
        "printf '%s' {} > {}",
        shell::quote_arg(content),
        shell::quote_path(&path.display().to_string())
    );
    CommandSpec::shell(script)
}

/// Write the props file through `runner` (directly on non-unix hosts).
///
/// Only a failed write is fatal; stderr from a successful one is logged.
pub fn write(
    runner: &dyn CommandRunner,
    path: &Path,
    platform: &PlatformCredentials,
    namespace: &str,
) -> Result<()> {
    log_status!("config", "Creating {} for wskdeploy", path.display());

    let content = render(platform, namespace);
    let output = run_write(runner, path, &content);

    if !output.success {
        eprintln!("[config] Error creating {}: {}", path.display(), output.error_text());
        // The script embeds the auth token, so report the target path instead.
        return Err(Error::config_write_failed(CommandFailedDetails {
            command: format!("write {}", path.display()),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        }));
    }

    if !output.stderr.trim().is_empty() {
        eprintln!("[config] stderr: {}", output.stderr.trim());
    }

    Ok(())
}

#[cfg(unix)]
fn run_write(runner: &dyn CommandRunner, path: &Path, content: &str) -> CommandOutput {
    runner.run(&write_command(path, content))
}

#[cfg(not(unix))]
fn run_write(_runner: &dyn CommandRunner, path: &Path, content: &str) -> CommandOutput {
    match std::fs::write(path, content) {
        Ok(()) => CommandOutput::success(""),
        Err(e) => CommandOutput::failure(-1, e.to_string()),
    }
}
