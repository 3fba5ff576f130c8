//! wskdeploy invocation and output classification.
//!
//! A zero exit status is not enough to call a deploy successful: wskdeploy can
//! exit cleanly while reporting an `error` in its JSON output.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CommandFailedDetails, Error, Result};
use crate::runner::{CommandRunner, CommandSpec};

pub const LOGICAL_FAILURE_MESSAGE: &str =
    "Error: Could not successfully run wskdeploy. Did you provide the needed environment variables?";

/// Everything needed to run the deploy tool once.
#[derive(Debug, Clone)]
pub struct DeployInvocation<'a> {
    pub tool: &'a Path,
    pub work_dir: &'a Path,
    pub manifest: PathBuf,
    pub env: &'a BTreeMap<String, String>,
    pub confirm_input: &'a str,
}

/// wskdeploy stdout, decoded when possible.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolOutput {
    Empty,
    Structured(Value),
    Opaque(String),
}

impl ToolOutput {
    /// The structured payload when it reports a failure through a truthy
    /// `error` field.
    pub fn reported_error(&self) -> Option<&Value> {
        match self {
            ToolOutput::Structured(value @ Value::Object(map)) => map
                .get("error")
                .filter(|error| is_truthy(error))
                .map(|_| value),
            _ => None,
        }
    }
}

/// Decode tool stdout. Parse failures fall back to opaque text.
pub fn interpret(stdout: &str) -> ToolOutput {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return ToolOutput::Empty;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => ToolOutput::Structured(value),
        Err(_) => {
            eprintln!("[deploy] Failed to parse stdout, it wasn't a JSON object");
            ToolOutput::Opaque(stdout.to_string())
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn command(invocation: &DeployInvocation<'_>) -> CommandSpec {
    CommandSpec::new(invocation.tool.display().to_string())
        .arg("-m")
        .arg(invocation.manifest.display().to_string())
        .current_dir(invocation.work_dir)
        .envs(invocation.env)
        .stdin(invocation.confirm_input)
}

/// A successful deploy: decoded stdout plus any diagnostics on stderr.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRun {
    pub output: ToolOutput,
    pub stderr: Option<String>,
}

/// Run the deploy tool and classify the result.
pub fn deploy(runner: &dyn CommandRunner, invocation: &DeployInvocation<'_>) -> Result<ToolRun> {
    let spec = command(invocation);
    log_status!("deploy", "Running {}", spec.display());

    let output = runner.run(&spec);

    if !output.success {
        eprintln!("[deploy] Error running wskdeploy: {}", output.error_text());
        return Err(Error::deploy_exec_failed(CommandFailedDetails {
            command: spec.display(),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        }));
    }

    let stderr = Some(output.stderr.trim())
        .filter(|text| !text.is_empty())
        .map(str::to_string);
    if let Some(text) = &stderr {
        eprintln!("[deploy] stderr: {}", text);
    }

    let tool_output = interpret(&output.stdout);

    if let Some(payload) = tool_output.reported_error() {
        eprintln!("[deploy] {}", LOGICAL_FAILURE_MESSAGE);
        return Err(Error::deploy_logical_failure(
            LOGICAL_FAILURE_MESSAGE,
            payload.clone(),
        ));
    }

    Ok(ToolRun {
        output: tool_output,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use serde_json::json;
    use std::cell::RefCell;

    struct ScriptedRunner {
        output: CommandOutput,
        seen: RefCell<Vec<CommandSpec>>,
    }

    impl ScriptedRunner {
        fn new(output: CommandOutput) -> Self {
            Self {
                output,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, spec: &CommandSpec) -> CommandOutput {
            self.seen.borrow_mut().push(spec.clone());
            self.output.clone()
        }
    }

    fn invocation<'a>(env: &'a BTreeMap<String, String>) -> DeployInvocation<'a> {
        DeployInvocation {
            tool: Path::new("./wskdeploy"),
            work_dir: Path::new("."),
            manifest: PathBuf::from("tmp/bp/blueprint/manifest.yaml"),
            env,
            confirm_input: "y",
        }
    }

    #[test]
    fn interpret_variants() {
        assert_eq!(interpret("  \n"), ToolOutput::Empty);
        assert_eq!(interpret("{\"ok\":true}\n"), ToolOutput::Structured(json!({"ok": true})));
        assert_eq!(
            interpret("Deployment completed successfully.\n"),
            ToolOutput::Opaque("Deployment completed successfully.\n".to_string())
        );
    }

    #[test]
    fn reported_error_follows_truthiness() {
        assert!(interpret(r#"{"error":"missing CLOUDANT_URL"}"#).reported_error().is_some());
        assert!(interpret(r#"{"error":{"code":1}}"#).reported_error().is_some());
        assert!(interpret(r#"{"error":""}"#).reported_error().is_none());
        assert!(interpret(r#"{"error":null}"#).reported_error().is_none());
        assert!(interpret(r#"{"error":false}"#).reported_error().is_none());
        assert!(interpret(r#"{"error":0}"#).reported_error().is_none());
        assert!(interpret(r#"[{"error":"x"}]"#).reported_error().is_none());
        assert!(interpret("error: plain text").reported_error().is_none());
    }

    #[test]
    fn command_points_at_manifest_and_confirms() {
        let mut env = BTreeMap::new();
        env.insert("CLOUDANT_URL".to_string(), "https://db".to_string());

        let spec = command(&invocation(&env));
        assert_eq!(spec.program, "./wskdeploy");
        assert_eq!(spec.args, vec!["-m", "tmp/bp/blueprint/manifest.yaml"]);
        assert_eq!(spec.stdin.as_deref(), Some("y"));
        assert_eq!(spec.env.get("CLOUDANT_URL").map(String::as_str), Some("https://db"));
    }

    #[test]
    fn non_zero_exit_is_exec_error() {
        let env = BTreeMap::new();
        let runner = ScriptedRunner::new(CommandOutput::failure(1, "manifest not found"));

        let err = deploy(&runner, &invocation(&env)).unwrap_err();
        assert_eq!(err.code.as_str(), "deploy.exec_failed");
        assert_eq!(err.details["stderr"], "manifest not found");
        assert_eq!(runner.seen.borrow().len(), 1);
    }

    #[test]
    fn zero_exit_with_error_field_is_logical_failure() {
        let env = BTreeMap::new();
        let runner = ScriptedRunner::new(CommandOutput::success(r#"{"error":"missing vars"}"#));

        let err = deploy(&runner, &invocation(&env)).unwrap_err();
        assert_eq!(err.code.as_str(), "deploy.logical_failure");
        assert_eq!(err.details["error"], "missing vars");
        assert_eq!(err.details["descriptiveError"], LOGICAL_FAILURE_MESSAGE);
    }

    #[test]
    fn opaque_output_is_success() {
        let env = BTreeMap::new();
        let runner = ScriptedRunner::new(CommandOutput::success("Deployment completed"));

        let run = deploy(&runner, &invocation(&env)).unwrap();
        assert!(matches!(run.output, ToolOutput::Opaque(_)));
        assert_eq!(run.stderr, None);
    }

    #[test]
    fn stderr_of_successful_run_is_kept() {
        let env = BTreeMap::new();
        let runner = ScriptedRunner::new(CommandOutput {
            stderr: "warning: package already exists\n".to_string(),
            ..CommandOutput::success(r#"{"deployed":true}"#)
        });

        let run = deploy(&runner, &invocation(&env)).unwrap();
        assert_eq!(run.output, ToolOutput::Structured(json!({"deployed": true})));
        assert_eq!(run.stderr.as_deref(), Some("warning: package already exists"));
    }
}
