//! Sextant configuration.
//!
//! Every run needs an API key for the plate-solving service. Rather than
//! requiring `--api-key` on every invocation, the key is resolved through
//! a chain:
//!
//! 1. `--api-key <key>` — explicit per-run override
//! 2. `SEXTANT_API_KEY` env var — process/session level
//! 3. `~/.sextant/config.toml` — global default
//!
//! The config file can also pin a `base-url`, mostly for pointing runs at
//! a local stand-in for the remote service.

use std::path::PathBuf;
use std::{env, fs};

use serde::Deserialize;

/// Contents of `~/.sextant/config.toml`. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// API key for the plate-solving service.
    pub api_key: Option<String>,

    /// Base URL override for the plate-solving service.
    pub base_url: Option<String>,
}

/// Error message shown when no API key can be resolved.
pub const API_KEY_REQUIRED: &str = "api key required: pass --api-key <key>, \
    set SEXTANT_API_KEY, or add `api-key = \"...\"` to ~/.sextant/config.toml";

impl Config {
    /// Load `~/.sextant/config.toml`. A missing file is an empty config.
    pub fn load() -> Result<Self, String> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };

        let contents = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The config file path: `~/.sextant/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".sextant").join("config.toml"))
    }
}

/// Resolve the API key from the tiered resolution chain.
///
/// Checks in order: explicit `--api-key` value, `SEXTANT_API_KEY` env
/// var, the config file. Errors with [`API_KEY_REQUIRED`] when none of
/// the sources yield a value.
pub fn resolve_api_key(explicit: Option<&str>, config: &Config) -> Result<String, String> {
    // 1. Explicit --api-key flag.
    if let Some(key) = explicit {
        return Ok(key.to_string());
    }

    // 2. SEXTANT_API_KEY environment variable.
    if let Ok(key) = env::var("SEXTANT_API_KEY")
        && !key.is_empty()
    {
        return Ok(key);
    }

    // 3. ~/.sextant/config.toml.
    if let Some(key) = config.api_key.clone().filter(|k| !k.is_empty()) {
        return Ok(key);
    }

    Err(API_KEY_REQUIRED.to_string())
}
