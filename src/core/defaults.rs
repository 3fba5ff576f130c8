use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::paths;

/// Root configuration structure for bpdeploy.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BpdeployConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via bpdeploy.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    /// Directory the deploy tool and `ls` run in; artifact paths are relative to it.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Directory (relative to `work_dir` unless absolute) holding fetched repos.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,

    #[serde(default = "default_wskprops_path")]
    pub wskprops_path: String,

    #[serde(default = "default_deploy_tool")]
    pub deploy_tool: String,

    /// git binary used to fetch repositories.
    #[serde(default = "default_git_program")]
    pub git_program: String,

    /// Manifest location inside a fetched repository.
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,

    #[serde(default = "default_api_host_env")]
    pub api_host_env: String,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Written to the deploy tool's stdin to answer its confirmation prompt.
    #[serde(default = "default_confirm_input")]
    pub confirm_input: String,

    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            artifacts_dir: default_artifacts_dir(),
            wskprops_path: default_wskprops_path(),
            deploy_tool: default_deploy_tool(),
            git_program: default_git_program(),
            manifest_path: default_manifest_path(),
            api_host_env: default_api_host_env(),
            api_key_env: default_api_key_env(),
            namespace: default_namespace(),
            confirm_input: default_confirm_input(),
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}

impl Defaults {
    /// Working directory, made absolute against the current directory so
    /// paths derived from it resolve the same inside child processes.
    pub fn work_dir(&self) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(&self.work_dir).to_string());
        std::path::absolute(&expanded).unwrap_or(expanded)
    }

    pub fn artifacts_root(&self) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(&self.artifacts_dir).to_string());
        if expanded.is_absolute() {
            expanded
        } else {
            self.work_dir().join(expanded)
        }
    }

    pub fn wskprops_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.wskprops_path).to_string())
    }

    /// Deploy tool program path. Relative paths containing a separator are
    /// resolved against `work_dir`; bare names are left for PATH lookup.
    pub fn deploy_tool(&self) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(&self.deploy_tool).to_string());
        if expanded.is_relative() && expanded.components().count() > 1 {
            let relative = expanded.strip_prefix(".").unwrap_or(&expanded);
            self.work_dir().join(relative)
        } else {
            expanded
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_work_dir() -> String {
    ".".to_string()
}

fn default_artifacts_dir() -> String {
    "tmp".to_string()
}

fn default_wskprops_path() -> String {
    "~/.wskprops".to_string()
}

fn default_deploy_tool() -> String {
    "./wskdeploy".to_string()
}

fn default_git_program() -> String {
    "git".to_string()
}

fn default_manifest_path() -> String {
    "blueprint/manifest.yaml".to_string()
}

fn default_api_host_env() -> String {
    "__OW_API_HOST".to_string()
}

fn default_api_key_env() -> String {
    "__OW_API_KEY".to_string()
}

fn default_namespace() -> String {
    "_".to_string()
}

fn default_confirm_input() -> String {
    "y".to_string()
}

fn default_lock_timeout_secs() -> u64 {
    300
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load defaults, merging file config with built-in defaults.
/// If bpdeploy.json is missing or invalid, silently returns built-in defaults.
pub fn load_defaults() -> Defaults {
    load_config().defaults
}

/// Load the full bpdeploy.json config, falling back to defaults on any error.
pub fn load_config() -> BpdeployConfig {
    paths::bpdeploy_json()
        .and_then(|path| load_config_from(&path))
        .unwrap_or_default()
}

/// Load config from an explicit file path.
pub fn load_config_from(path: &Path) -> crate::Result<BpdeployConfig> {
    if !path.exists() {
        return Err(crate::Error::other(format!(
            "{} not found",
            path.display()
        )));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        crate::Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| crate::Error::config_invalid_json(path.display().to_string(), e))
}

/// Save config to bpdeploy.json file (creates if missing).
pub fn save_config(config: &BpdeployConfig) -> crate::Result<()> {
    let path = paths::bpdeploy_json()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            crate::Error::internal_io(e.to_string(), Some(format!("create {}", parent.display())))
        })?;
    }

    let content = serde_json::to_string_pretty(config).map_err(|e| {
        crate::Error::internal_json(e.to_string(), Some("serialize bpdeploy.json".to_string()))
    })?;

    fs::write(&path, content).map_err(|e| {
        crate::Error::internal_io(e.to_string(), Some(format!("write {}", path.display())))
    })?;

    Ok(())
}

/// Delete bpdeploy.json file (reset to defaults)
pub fn reset_config() -> crate::Result<bool> {
    let path = paths::bpdeploy_json()?;

    if path.exists() {
        fs::remove_file(&path).map_err(|e| {
            crate::Error::internal_io(e.to_string(), Some(format!("delete {}", path.display())))
        })?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Check if bpdeploy.json file exists
pub fn config_exists() -> bool {
    paths::bpdeploy_json()
        .map(|p| p.exists())
        .unwrap_or(false)
}

/// Get the path to bpdeploy.json (for display purposes)
pub fn config_path() -> crate::Result<String> {
    Ok(paths::bpdeploy_json()?.display().to_string())
}

/// Get built-in defaults (ignoring any file config)
pub fn builtin_defaults() -> Defaults {
    Defaults::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_file_keeps_builtin_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bpdeploy.json");
        fs::write(
            &path,
            r#"{"defaults": {"work_dir": "/srv/action", "deploy_tool": "wskdeploy"}}"#,
        )
        .unwrap();

        let defaults = load_config_from(&path).unwrap().defaults;
        assert_eq!(defaults.work_dir, "/srv/action");
        assert_eq!(defaults.deploy_tool, "wskdeploy");
        assert_eq!(defaults.manifest_path, "blueprint/manifest.yaml");
        assert_eq!(defaults.api_host_env, "__OW_API_HOST");
        assert_eq!(defaults.git_program, "git");
    }

    #[test]
    fn invalid_json_reports_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bpdeploy.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_json");
    }

    #[test]
    fn artifacts_root_is_relative_to_work_dir() {
        let defaults = Defaults {
            work_dir: "/srv/action".to_string(),
            ..Defaults::default()
        };
        assert_eq!(defaults.artifacts_root(), PathBuf::from("/srv/action/tmp"));
    }

    #[test]
    fn absolute_artifacts_dir_is_kept() {
        let defaults = Defaults {
            artifacts_dir: "/var/cache/bp".to_string(),
            ..Defaults::default()
        };
        assert_eq!(defaults.artifacts_root(), PathBuf::from("/var/cache/bp"));
    }

    #[test]
    fn deploy_tool_resolution() {
        let mut defaults = Defaults {
            work_dir: "/srv/action".to_string(),
            ..Defaults::default()
        };
        assert_eq!(defaults.deploy_tool(), PathBuf::from("/srv/action/wskdeploy"));

        defaults.deploy_tool = "wskdeploy".to_string();
        assert_eq!(defaults.deploy_tool(), PathBuf::from("wskdeploy"));
    }

    #[test]
    fn relative_work_dir_is_resolved_once() {
        let defaults = Defaults {
            work_dir: "action".to_string(),
            ..Defaults::default()
        };
        let cwd = std::env::current_dir().unwrap();

        assert_eq!(defaults.work_dir(), cwd.join("action"));
        assert_eq!(defaults.deploy_tool(), cwd.join("action").join("wskdeploy"));
        assert_eq!(defaults.artifacts_root(), cwd.join("action").join("tmp"));
    }

    #[test]
    fn default_work_dir_is_current_directory() {
        let cwd = std::env::current_dir().unwrap();
        let work_dir = Defaults::default().work_dir();
        assert!(work_dir.is_absolute());
        assert_eq!(work_dir.canonicalize().unwrap(), cwd.canonicalize().unwrap());
    }
}
