// file: src/config/loader.rs
// version: 2.0.0
// guid: d4e5f6g7-h8i9-0123-4567-890123defghi

//! Configuration file loading and environment variable substitution

use super::ProvisionConfig;
use crate::error::ProvisionError;
use crate::Result;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
    env_vars: HashMap<String, String>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self {
            env_vars: std::env::vars().collect(),
        }
    }

    /// Load the provisioning configuration, or the defaults when no path is given
    pub fn load_or_default<P: AsRef<Path>>(&self, path: Option<P>) -> Result<ProvisionConfig> {
        let config = match path {
            Some(path) => self.load(path)?,
            None => ProvisionConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML or TOML file (chosen by extension)
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<ProvisionConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ProvisionError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let expanded = self.expand_env_vars(&content)?;
        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let config: ProvisionConfig = if is_toml {
            toml::from_str(&expanded)?
        } else if expanded.trim().is_empty() {
            ProvisionConfig::default()
        } else {
            serde_yaml::from_str(&expanded)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Expand `${VAR}` references in configuration content
    fn expand_env_vars(&self, content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ProvisionError::config(format!("Invalid regex pattern: {}", e)))?;

        let mut missing_vars = Vec::new();
        let result = re.replace_all(content, |cap: &regex::Captures<'_>| {
            match self.env_vars.get(&cap[1]) {
                Some(value) => value.clone(),
                None => {
                    missing_vars.push(cap[1].to_string());
                    cap[0].to_string()
                }
            }
        });

        if !missing_vars.is_empty() {
            return Err(ProvisionError::config(format!(
                "Missing environment variables: {}",
                missing_vars.join(", ")
            )));
        }

        Ok(result.into_owned())
    }

    /// Set environment variable for substitution
    pub fn set_env_var(&mut self, key: String, value: String) {
        self.env_vars.insert(key, value);
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    #[test]
    fn test_env_var_expansion() {
        let mut loader = ConfigLoader::new();
        loader.set_env_var("TEST_VAR".to_string(), "test_value".to_string());

        let result = loader.expand_env_vars("key: ${TEST_VAR}").unwrap();
        assert_eq!(result, "key: test_value");
    }

    #[test]
    fn test_missing_env_var() {
        let loader = ConfigLoader::new();
        let result = loader.expand_env_vars("key: ${DEVHOST_MISSING_VAR_12345}");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Missing environment variables"));
    }

    #[test]
    fn test_load_yaml_partial_override() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            r#"
database:
  name: shopdb
  app_user: shop
production:
  upstream_port: 8080
tools:
  - dotnet-ef
"#
        )?;

        let config = ConfigLoader::new().load(file.path())?;
        assert_eq!(config.database.name, "shopdb");
        assert_eq!(config.database.app_user, "shop");
        assert_eq!(config.database.admin_user, "postgres");
        assert_eq!(config.production.upstream_port, 8080);
        assert_eq!(config.tools.0, vec!["dotnet-ef".to_string()]);
        assert_eq!(config.runtime.channel, "8.0");
        Ok(())
    }

    #[test]
    fn test_load_toml() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(
            file,
            r#"
[runtime]
channel = "9.0"
sdk_package = "dotnet-sdk-9.0"

[scaffold]
project_name = "Orders"
"#
        )?;

        let config = ConfigLoader::new().load(file.path())?;
        assert_eq!(config.runtime.channel, "9.0");
        assert_eq!(config.scaffold.project_name, "Orders");
        Ok(())
    }

    #[test]
    fn test_invalid_config_rejected() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "database:\n  password_length: 4\n")?;
        assert!(ConfigLoader::new().load(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_defaults_without_path() -> Result<()> {
        let config = ConfigLoader::new().load_or_default(None::<&Path>)?;
        assert_eq!(config.database.name, "appdb");
        Ok(())
    }
}
