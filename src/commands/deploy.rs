use clap::Args;
use serde_json::{Map, Value};

use bpdeploy::credentials::ProcessEnv;
use bpdeploy::defaults::{self, Defaults};
use bpdeploy::git::GitCli;
use bpdeploy::runner::LocalRunner;
use bpdeploy::{Envelope, Error, Pipeline, Stage};

use super::read_json_spec_to_string;

#[derive(Args, Debug, Default)]
pub struct DeployArgs {
    /// Action params as JSON (supports @file and - for stdin)
    #[arg(long, value_name = "JSON")]
    pub params: Option<String>,

    /// Git username
    #[arg(long)]
    pub user: Option<String>,

    /// Git password or access token
    #[arg(long)]
    pub pass: Option<String>,

    /// Repository path without scheme (e.g. github.com/org/blueprint)
    #[arg(long)]
    pub repo: Option<String>,

    /// OpenWhisk API host (falls back to $__OW_API_HOST)
    #[arg(long)]
    pub wsk_api_host: Option<String>,

    /// OpenWhisk auth key (falls back to $__OW_API_KEY)
    #[arg(long)]
    pub wsk_auth: Option<String>,

    /// Environment variable for the deployed workload (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Override the configured working directory
    #[arg(long)]
    pub work_dir: Option<String>,

    /// Override the configured wskdeploy binary
    #[arg(long)]
    pub deploy_tool: Option<String>,
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

pub fn run(args: DeployArgs, _global: &crate::commands::GlobalArgs) -> Envelope {
    let params = match build_params(&args) {
        Ok(params) => params,
        Err(e) => return Envelope::failure(&e, Some(Stage::ResolvingCredentials.as_str())),
    };

    let defaults = apply_overrides(defaults::load_defaults(), &args);
    let fetcher = GitCli::with_program(defaults.git_program.clone());

    Pipeline::new(&defaults, &fetcher, &LocalRunner, &ProcessEnv).invoke_json(params)
}

/// Merge the JSON params with individual flags. Flags win. Field types are
/// checked when the pipeline decodes the result.
fn build_params(args: &DeployArgs) -> bpdeploy::Result<Value> {
    let mut params = match &args.params {
        Some(spec) => {
            let raw = read_json_spec_to_string(spec)?;
            match serde_json::from_str::<Value>(&raw).map_err(|e| {
                Error::validation_invalid_json(e, Some("parse params".to_string()))
            })? {
                Value::Object(map) => map,
                _ => {
                    return Err(Error::validation_invalid_argument(
                        "params",
                        "Params must be a JSON object",
                    ))
                }
            }
        }
        None => Map::new(),
    };

    let overrides = [
        ("user", &args.user),
        ("pass", &args.pass),
        ("repo", &args.repo),
        ("wskApiHost", &args.wsk_api_host),
        ("wskAuth", &args.wsk_auth),
    ];
    for (key, value) in overrides {
        if let Some(value) = value {
            params.insert(key.to_string(), Value::String(value.clone()));
        }
    }

    if !args.env.is_empty() {
        let env_data = params
            .entry("envData")
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(env_data) = env_data.as_object_mut() else {
            return Err(Error::validation_invalid_argument(
                "envData",
                "envData must be a JSON object to merge --env values",
            ));
        };
        for (key, value) in &args.env {
            env_data.insert(key.clone(), Value::String(value.clone()));
        }
    }

    Ok(Value::Object(params))
}

fn apply_overrides(mut defaults: Defaults, args: &DeployArgs) -> Defaults {
    if let Some(work_dir) = &args.work_dir {
        defaults.work_dir = work_dir.clone();
    }
    if let Some(tool) = &args.deploy_tool {
        defaults.deploy_tool = tool.clone();
    }
    defaults
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_pair_splits_on_first_equals() {
        assert_eq!(
            parse_env_pair("URL=https://db?a=b").unwrap(),
            ("URL".to_string(), "https://db?a=b".to_string())
        );
        assert!(parse_env_pair("=value").is_err());
        assert!(parse_env_pair("NOVALUE").is_err());
    }

    #[test]
    fn flags_override_json_params() {
        let args = DeployArgs {
            params: Some(
                r#"{"user":"json-user","pass":"p","repo":"github.com/org/bp","envData":{"A":"1"}}"#
                    .to_string(),
            ),
            user: Some("flag-user".to_string()),
            wsk_auth: Some("key".to_string()),
            env: vec![("B".to_string(), "2".to_string())],
            ..Default::default()
        };

        let params = build_params(&args).unwrap();
        assert_eq!(params["user"], "flag-user");
        assert_eq!(params["pass"], "p");
        assert_eq!(params["wskAuth"], "key");
        assert_eq!(params["envData"]["A"], "1");
        assert_eq!(params["envData"]["B"], "2");
    }

    #[test]
    fn invalid_params_json_is_rejected() {
        let args = DeployArgs {
            params: Some("{ nope".to_string()),
            ..Default::default()
        };
        let err = build_params(&args).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_json");
    }

    #[test]
    fn non_object_params_are_rejected() {
        let args = DeployArgs {
            params: Some("[1, 2]".to_string()),
            ..Default::default()
        };
        let err = build_params(&args).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }

    #[test]
    fn env_flags_need_object_env_data() {
        let args = DeployArgs {
            params: Some(r#"{"envData":"A=1"}"#.to_string()),
            env: vec![("B".to_string(), "2".to_string())],
            ..Default::default()
        };
        let err = build_params(&args).unwrap_err();
        assert_eq!(err.details["field"], "envData");
    }

    #[test]
    fn overrides_replace_configured_paths() {
        let args = DeployArgs {
            work_dir: Some("/srv/action".to_string()),
            ..Default::default()
        };
        let defaults = apply_overrides(Defaults::default(), &args);
        assert_eq!(defaults.work_dir, "/srv/action");
        assert_eq!(defaults.deploy_tool, "./wskdeploy");
    }
}
