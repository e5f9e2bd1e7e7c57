//! This module controls configuration parsing from the end user, providing a
//! convenience mechanism for the rest of the program. Every setting defaults
//! to the historical hardcoded behaviour, so an empty configuration
//! posts warehouse records to `http://localhost:8000/v0/log`.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use hyper::{HeaderMap, Uri, http::uri::InvalidUri};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable that, when set, holds the configuration YAML itself.
pub const CONFIG_ENV_VAR: &str = "EMITTER_CONFIG";

/// Host and port of the log service assumed when no target is configured.
pub const DEFAULT_AUTHORITY: &str = "localhost:8000";

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// The default target could not be assembled into a URI
    #[error("Invalid target URI: {0}")]
    Uri(#[from] InvalidUri),
}

/// Main configuration struct for this program
#[derive(Debug, Default, Deserialize, Serialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Label attached to this emitter's metrics
    #[serde(default)]
    pub id: Option<String>,
    /// The seed for random operations, drawn from the OS when absent
    #[serde(default)]
    pub seed: Option<[u8; 32]>,
    /// The URI records are posted to, derived from the payload variant when
    /// absent
    #[serde(default, with = "http_serde::option::uri")]
    pub target_uri: Option<Uri>,
    /// Headers added to every request, replacing any default of the same name
    #[serde(default, with = "http_serde::header_map")]
    pub headers: HeaderMap,
    /// The records to emit
    #[serde(default)]
    pub payload: emitter_payload::Config,
    /// The pace to emit at, derived from the payload variant when absent
    #[serde(default)]
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub throttle: Option<emitter_throttle::Config>,
}

impl Config {
    /// Parse a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Function will error if `contents` is not a valid configuration.
    pub fn from_yaml(contents: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load the configuration, preferring the contents of
    /// [`CONFIG_ENV_VAR`] over the file at `path`. With neither present the
    /// default configuration is returned.
    ///
    /// # Errors
    ///
    /// Function will error if the file cannot be read or the configuration does
    /// not parse.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        Self::load_from(std::env::var(CONFIG_ENV_VAR).ok(), path)
    }

    fn load_from(env_contents: Option<String>, path: Option<&Path>) -> Result<Self, Error> {
        if let Some(contents) = env_contents {
            debug!("Using config from env var '{CONFIG_ENV_VAR}'");
            return Self::from_yaml(&contents);
        }
        match path {
            Some(path) => {
                debug!("Attempting to open configuration file at: {}", path.display());
                let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
                    path: path.to_path_buf(),
                    source: Box::new(source),
                })?;
                Self::from_yaml(&contents)
            }
            None => {
                debug!("No configuration supplied, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// The URI records are posted to.
    ///
    /// # Errors
    ///
    /// Function will error if no target is configured and the default target
    /// for the payload variant is not a valid URI.
    pub fn target_uri(&self) -> Result<Uri, Error> {
        if let Some(uri) = &self.target_uri {
            return Ok(uri.clone());
        }
        let path = self.payload.variant.default_path();
        Ok(format!("http://{DEFAULT_AUTHORITY}{path}").parse()?)
    }

    /// The pace records are emitted at.
    #[must_use]
    pub fn throttle(&self) -> emitter_throttle::Config {
        self.throttle.unwrap_or_else(|| {
            emitter_throttle::Config::fixed(self.payload.variant.default_delay())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, time::Duration};

    use emitter_payload::Variant;

    use super::*;

    #[test]
    fn empty_config_reproduces_warehouse_script() {
        let config = Config::from_yaml("{}").expect("failed to parse");
        assert_eq!(config, Config::default());
        assert_eq!(
            config.target_uri().expect("invalid uri"),
            "http://localhost:8000/v0/log"
        );
        assert_eq!(
            config.throttle(),
            emitter_throttle::Config::fixed(Duration::from_micros(300))
        );
        assert!(config.seed.is_none());
        assert!(config.headers.is_empty());
    }

    #[test]
    fn basic_variant_defaults_to_log_path_and_thirty_millis() {
        let contents = r"
payload:
  variant: basic
";
        let config = Config::from_yaml(contents).expect("failed to parse");
        assert_eq!(config.payload.variant, Variant::Basic);
        assert_eq!(
            config.target_uri().expect("invalid uri"),
            "http://localhost:8000/log"
        );
        assert_eq!(
            config.throttle(),
            emitter_throttle::Config::Fixed {
                delay_micros: 30_000
            }
        );
    }

    #[test]
    fn config_deserializes_every_field() {
        let contents = r#"
id: "smoke"
target_uri: "http://127.0.0.1:9000/v0/log"
headers:
  x-uplink-key: "abc"
payload:
  variant: warehouse
  schema: "audit"
  warehouse: "staging"
throttle:
  fixed:
    delay_micros: 1000
"#;
        let config = Config::from_yaml(contents).expect("failed to parse");
        assert_eq!(config.id.as_deref(), Some("smoke"));
        assert_eq!(
            config.target_uri().expect("invalid uri"),
            "http://127.0.0.1:9000/v0/log"
        );
        assert_eq!(
            config
                .headers
                .get("x-uplink-key")
                .expect("header missing")
                .to_str()
                .expect("header not ascii"),
            "abc"
        );
        assert_eq!(config.payload.schema, "audit");
        assert_eq!(config.payload.warehouse, "staging");
        assert_eq!(
            config.throttle(),
            emitter_throttle::Config::Fixed {
                delay_micros: 1_000
            }
        );
    }

    #[test]
    fn config_deserializes_all_out_throttle() {
        let config = Config::from_yaml("throttle: all_out").expect("failed to parse");
        assert_eq!(config.throttle(), emitter_throttle::Config::AllOut);
    }

    #[test]
    fn config_rejects_unknown_fields() {
        assert!(Config::from_yaml("concurrency: 4").is_err());
    }

    #[test]
    fn env_contents_take_precedence_over_file() {
        let mut file = tempfile::NamedTempFile::new().expect("could not create temp file");
        writeln!(file, "id: from_file").expect("could not write config");

        let config = Config::load_from(Some("id: from_env".to_string()), Some(file.path()))
            .expect("failed to load");
        assert_eq!(config.id.as_deref(), Some("from_env"));

        let config = Config::load_from(None, Some(file.path())).expect("failed to load");
        assert_eq!(config.id.as_deref(), Some("from_file"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("could not create temp dir");
        let path = dir.path().join("absent.yaml");
        let err = Config::load_from(None, Some(&path)).expect_err("load should fail");
        assert!(matches!(err, Error::ReadFile { .. }));
    }

    #[test]
    fn no_source_yields_defaults() {
        let config = Config::load_from(None, None).expect("failed to load");
        assert_eq!(config, Config::default());
    }
}
