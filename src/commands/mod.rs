use std::io::Read;
use std::path::Path;

use bpdeploy::Envelope;

use crate::output;
use crate::Commands;

pub type CmdResult<T> = bpdeploy::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

pub mod config;
pub mod deploy;

/// Run a command and produce its envelope plus process exit code.
pub(crate) fn run_json(command: Commands, global: &GlobalArgs) -> (Envelope, i32) {
    match command {
        Commands::Deploy(args) => {
            let envelope = deploy::run(args, global);
            let exit_code = output::exit_code_for_envelope(&envelope);
            (envelope, exit_code)
        }
        Commands::Config(args) => output::map_cmd_result_to_envelope(config::run(args, global)),
    }
}

/// Read a JSON spec from string, file (@path), or stdin (-).
pub(crate) fn read_json_spec_to_string(spec: &str) -> bpdeploy::Result<String> {
    use std::io::IsTerminal;

    if spec.trim() == "-" {
        let mut buf = String::new();
        let mut stdin = std::io::stdin();
        if stdin.is_terminal() {
            return Err(bpdeploy::Error::validation_invalid_argument(
                "params",
                "Cannot read JSON from stdin when stdin is a TTY",
            ));
        }
        stdin.read_to_string(&mut buf).map_err(|e| {
            bpdeploy::Error::internal_io(e.to_string(), Some("read stdin".to_string()))
        })?;
        return Ok(buf);
    }

    if let Some(path) = spec.strip_prefix('@') {
        if path.trim().is_empty() {
            return Err(bpdeploy::Error::validation_invalid_argument(
                "params",
                "Invalid JSON spec '@' (missing file path)",
            ));
        }
        return bpdeploy::io::read_file(Path::new(path), &format!("read {}", path));
    }

    Ok(spec.to_string())
}
