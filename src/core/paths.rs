use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base bpdeploy config directory (~/.config/bpdeploy/ on all platforms)
pub fn bpdeploy() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("bpdeploy"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("bpdeploy"))
    }
}

/// Global bpdeploy.json config file path
pub fn bpdeploy_json() -> Result<PathBuf> {
    Ok(bpdeploy()?.join("bpdeploy.json"))
}
