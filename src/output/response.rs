//! CLI response formatting and output.
//!
//! Prints the result envelope and maps outcomes to exit codes.

use bpdeploy::{Envelope, Error, ErrorCode, Result};
use serde::Serialize;

fn to_json(envelope: &Envelope) -> Result<String> {
    serde_json::to_string_pretty(envelope)
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize response".to_string())))
}

pub fn print_envelope(envelope: &Envelope) -> Result<()> {
    use std::io::{self, Write};

    let payload = to_json(envelope)?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn map_cmd_result_to_envelope<T: Serialize>(result: Result<(T, i32)>) -> (Envelope, i32) {
    match result {
        Ok((data, exit_code)) => {
            let envelope = Envelope::success(&data);
            let exit_code = if envelope.success { exit_code } else { 1 };
            (envelope, exit_code)
        }
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Envelope::failure(&err, None), exit_code)
        }
    }
}

pub fn exit_code_for_envelope(envelope: &Envelope) -> i32 {
    match envelope.error_code() {
        None => 0,
        Some(code) => error_code_from_str(code).map(exit_code_for_error).unwrap_or(1),
    }
}

fn error_code_from_str(code: &str) -> Option<ErrorCode> {
    const ALL: &[ErrorCode] = &[
        ErrorCode::CredentialsMissing,
        ErrorCode::FilesystemError,
        ErrorCode::FetchFailed,
        ErrorCode::ConfigWriteFailed,
        ErrorCode::DeployExecFailed,
        ErrorCode::DeployLogicalFailure,
        ErrorCode::ConfigInvalidJson,
        ErrorCode::ValidationInvalidArgument,
        ErrorCode::ValidationInvalidJson,
        ErrorCode::InternalIoError,
        ErrorCode::InternalJsonError,
        ErrorCode::InternalUnexpected,
    ];
    ALL.iter().copied().find(|c| c.as_str() == code)
}

pub fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::CredentialsMissing
        | ErrorCode::ConfigInvalidJson
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::ValidationInvalidJson => 2,

        ErrorCode::FetchFailed | ErrorCode::DeployExecFailed | ErrorCode::DeployLogicalFailure => {
            20
        }

        ErrorCode::FilesystemError
        | ErrorCode::ConfigWriteFailed
        | ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_failure_maps_to_exit_code_20() {
        let err = Error::deploy_logical_failure("failed", serde_json::json!({ "error": "x" }));
        let envelope = Envelope::failure(&err, Some("invoking"));
        assert_eq!(exit_code_for_envelope(&envelope), 20);
    }

    #[test]
    fn missing_credentials_maps_to_exit_code_2() {
        let (envelope, exit_code) =
            map_cmd_result_to_envelope::<()>(Err(Error::credentials_missing(vec![])));
        assert!(!envelope.success);
        assert_eq!(exit_code, 2);
    }

    #[test]
    fn success_keeps_command_exit_code() {
        let (envelope, exit_code) = map_cmd_result_to_envelope(Ok((serde_json::json!({}), 0)));
        assert!(envelope.success);
        assert_eq!(exit_code, 0);
        assert_eq!(exit_code_for_envelope(&envelope), 0);
    }

    #[test]
    fn every_code_round_trips_through_its_string() {
        for code in [ErrorCode::FetchFailed, ErrorCode::ConfigWriteFailed, ErrorCode::InternalUnexpected] {
            assert_eq!(error_code_from_str(code.as_str()), Some(code));
        }
    }
}
