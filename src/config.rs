//! TOML configuration for the parser and the command-line tool.
//!
//! ```toml
//! log_level = "info"
//!
//! [parse]
//! max_syntax_errors = 20
//! report_duplicate_keys = true
//!
//! [output]
//! format = "json"
//! ```

use crate::error::WdlError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "WDL_FRONTEND_CONFIG";

const DEFAULT_FILE_NAME: &str = ".wdl-frontend.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub parse: ParseOptions,
    pub output: OutputOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            parse: ParseOptions::default(),
            output: OutputOptions::default(),
        }
    }
}

/// Options that change what a parse records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Stop recording syntax errors after this many; the parse still completes
    pub max_syntax_errors: Option<usize>,
    /// Report repeated meta, parameter_meta, runtime and call-input keys
    pub report_duplicate_keys: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_syntax_errors: None,
            report_duplicate_keys: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
    Debug,
}

/// `$HOME/.wdl-frontend.toml`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(home) = env::var_os("HOME") {
        if !home.is_empty() {
            return Some(PathBuf::from(home).join(DEFAULT_FILE_NAME));
        }
    }

    if cfg!(windows) {
        if let Some(profile) = env::var_os("USERPROFILE") {
            if !profile.is_empty() {
                return Some(PathBuf::from(profile).join(DEFAULT_FILE_NAME));
            }
        }
    }

    None
}

/// Read and parse a configuration file.
pub fn load_config(path: &Path) -> Result<Config, WdlError> {
    let contents = fs::read_to_string(path).map_err(|source| WdlError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str::<Config>(&contents).map_err(|e| WdlError::Config {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Locate and load the configuration.
///
/// An explicit path, then `$WDL_FRONTEND_CONFIG`, must name a readable file.
/// The per-user default file is optional.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config, WdlError> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return load_config(Path::new(&path));
    }
    let Some(path) = default_config_path() else {
        return Ok(Config::default());
    };
    match load_config(&path) {
        Err(WdlError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            log::debug!("no configuration at {}", path.display());
            Ok(Config::default())
        }
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log_level, "warn");
        assert!(config.parse.report_duplicate_keys);
        assert_eq!(config.output.format, OutputFormat::Summary);
    }

    #[test]
    fn test_partial_tables() {
        let config: Config =
            toml::from_str("[parse]\nmax_syntax_errors = 3\n[output]\nformat = \"json\"").unwrap();
        assert_eq!(config.parse.max_syntax_errors, Some(3));
        assert!(config.parse.report_duplicate_keys);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = [").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, WdlError::Config { .. }));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_config(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, WdlError::Io { .. }));
    }
}
