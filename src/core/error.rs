use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    CredentialsMissing,

    FilesystemError,
    FetchFailed,
    ConfigWriteFailed,

    DeployExecFailed,
    DeployLogicalFailure,

    ConfigInvalidJson,

    ValidationInvalidArgument,
    ValidationInvalidJson,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CredentialsMissing => "credentials.missing",

            ErrorCode::FilesystemError => "filesystem.error",
            ErrorCode::FetchFailed => "fetch.failed",
            ErrorCode::ConfigWriteFailed => "config.write_failed",

            ErrorCode::DeployExecFailed => "deploy.exec_failed",
            ErrorCode::DeployLogicalFailure => "deploy.logical_failure",

            ErrorCode::ConfigInvalidJson => "config.invalid_json",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationInvalidJson => "validation.invalid_json",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingCredentialsDetails {
    pub missing: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemErrorDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchFailedDetails {
    pub remote: String,
    pub target: String,
    pub error: String,
}

/// Captured state of a subprocess that exited unsuccessfully.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn credentials_missing(missing: Vec<String>) -> Self {
        Self::new(
            ErrorCode::CredentialsMissing,
            "ERROR: Please enter username, password, and repo as params",
            to_details(MissingCredentialsDetails { missing }),
        )
    }

    pub fn filesystem(path: impl Into<String>, error: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::FilesystemError,
            format!("Error checking if {} exists", path),
            to_details(FilesystemErrorDetails {
                path,
                error: error.into(),
            }),
        )
    }

    /// The per-repository fetch lock could not be prepared or acquired.
    pub fn filesystem_lock(path: impl Into<String>, error: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::FilesystemError,
            format!("Error acquiring fetch lock {}", path),
            to_details(FilesystemErrorDetails {
                path,
                error: error.into(),
            }),
        )
    }

    pub fn fetch_failed(
        remote: impl Into<String>,
        target: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::FetchFailed,
            "Error cloning remote",
            to_details(FetchFailedDetails {
                remote: remote.into(),
                target: target.into(),
                error: error.into(),
            }),
        )
    }

    pub fn config_write_failed(details: CommandFailedDetails) -> Self {
        Self::new(
            ErrorCode::ConfigWriteFailed,
            "Error creating .wskprops",
            to_details(details),
        )
    }

    pub fn deploy_exec_failed(details: CommandFailedDetails) -> Self {
        Self::new(
            ErrorCode::DeployExecFailed,
            "Error running wskdeploy",
            to_details(details),
        )
    }

    /// The tool exited zero but its structured output reported a failure.
    /// `payload` is the parsed output, surfaced to the caller unchanged.
    pub fn deploy_logical_failure(descriptive_error: impl Into<String>, payload: Value) -> Self {
        let descriptive_error = descriptive_error.into();
        let details = match payload {
            Value::Object(mut map) => {
                map.insert(
                    "descriptiveError".to_string(),
                    Value::String(descriptive_error.clone()),
                );
                Value::Object(map)
            }
            other => serde_json::json!({
                "output": other,
                "descriptiveError": descriptive_error.clone(),
            }),
        };

        Self::new(ErrorCode::DeployLogicalFailure, descriptive_error, details)
            .with_hint("Check that envData provides every variable the manifest references")
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem: problem.into(),
            }),
        )
    }

    pub fn validation_invalid_json(err: serde_json::Error, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": err.to_string(),
            "context": context,
        });

        Self::new(ErrorCode::ValidationInvalidJson, "Invalid JSON", details)
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            to_details(ConfigInvalidJsonDetails {
                path: path.into(),
                error: err.to_string(),
            }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalIoErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalJsonErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::internal_unexpected(message)
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
