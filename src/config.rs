use std::{path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Generation settings, loadable from a TOML document.
#[derive(Debug, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// root module path of the emitted client library, e.g. "ses"
    pub namespace: String,

    /// crate the emitted code imports its runtime types from
    #[serde(default = "default_runtime_crate")]
    pub runtime_crate: String,

    /// client type name; derived from the endpoint prefix when unset
    #[serde(default)]
    pub client_name: Option<String>,

    /// base directory for the filesystem writer
    #[serde(default)]
    pub output_dir: PathBuf,
}

fn default_runtime_crate() -> String {
    "aws_core".to_string()
}

impl GeneratorConfig {
    pub fn new<S: Into<String>>(namespace: S) -> Self {
        GeneratorConfig {
            namespace: namespace.into(),
            runtime_crate: default_runtime_crate(),
            client_name: None,
            output_dir: PathBuf::default(),
        }
    }

    pub fn input_namespace(&self) -> String {
        format!("{}::input", self.namespace)
    }

    pub fn result_namespace(&self) -> String {
        format!("{}::result", self.namespace)
    }
}

impl FromStr for GeneratorConfig {
    type Err = Error;

    fn from_str(content: &str) -> std::result::Result<GeneratorConfig, Self::Err> {
        let config = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::GeneratorConfig;
    use std::str::FromStr;

    #[test]
    fn parse_config() {
        let config = GeneratorConfig::from_str(
            r#"
            namespace = "ses"
            output_dir = "gen"
            "#,
        )
        .unwrap();
        assert_eq!(config.namespace, "ses");
        assert_eq!(config.runtime_crate, "aws_core");
        assert_eq!(config.input_namespace(), "ses::input");
        assert_eq!(config.result_namespace(), "ses::result");
    }

    #[test]
    fn bad_config_is_rejected() {
        assert!(GeneratorConfig::from_str("namespace = 3").is_err());
    }
}
