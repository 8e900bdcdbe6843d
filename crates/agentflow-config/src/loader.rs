//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let mut config: Config = toml::from_str(&expanded)?;
        config.logging.directory =
            PathBuf::from(Self::expand_path(&config.logging.directory.to_string_lossy()));
        Ok(config)
    }

    /// Load from an explicit path, else the default location, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Config::default()),
            },
        }
    }

    /// `~/.agentflow/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".agentflow").join("config.toml"))
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.agentflow`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.app.name, "agentflow");
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [app]
            name = "research"
            default_user = "alice"

            [execution]
            channel_capacity = 16
            max_tool_rounds = 4

            [retry]
            max_retries = 2
            initial_backoff_ms = 100

            [model]
            default = "gemini-2.0-flash"
            temperature = 0.3

            [logging]
            level = "debug"
            file = true
            directory = "/var/log/agentflow"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.app.name, "research");
        assert_eq!(config.app.default_user, "alice");
        assert_eq!(config.execution.channel_capacity, 16);
        assert_eq!(config.execution.max_tool_rounds, 4);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.initial_backoff_ms, 100);
        assert_eq!(config.model.default, "gemini-2.0-flash");
        assert_eq!(config.model.temperature, Some(0.3));
        assert!(config.logging.file);
        assert_eq!(config.logging.directory, PathBuf::from("/var/log/agentflow"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[app]").unwrap();
        writeln!(file, "name = \"from-file\"").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.app.name, "from-file");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_with_explicit_missing_path() {
        let result = ConfigLoader::load_or_default(Some(Path::new("/nonexistent/agentflow.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test-only variable name not read anywhere else
        unsafe {
            std::env::set_var("AGENTFLOW_TEST_APP_NAME", "from-env");
        }
        let config = ConfigLoader::load_str("[app]\nname = \"${AGENTFLOW_TEST_APP_NAME}\"").unwrap();
        assert_eq!(config.app.name, "from-env");
        unsafe {
            std::env::remove_var("AGENTFLOW_TEST_APP_NAME");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let result = ConfigLoader::expand_env_vars("value = \"${AGENTFLOW_UNSET_VAR_12345}\"");
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        assert_eq!(ConfigLoader::expand_env_vars(content).unwrap(), content);
    }

    #[test]
    fn test_tilde_in_log_directory_expanded() {
        let config = ConfigLoader::load_str("[logging]\ndirectory = \"~/logs\"").unwrap();
        assert!(!config.logging.directory.to_string_lossy().starts_with('~'));
        assert!(config.logging.directory.ends_with("logs"));
    }

    #[test]
    fn test_expand_path_no_tilde() {
        assert_eq!(ConfigLoader::expand_path("/usr/local/bin"), "/usr/local/bin");
    }
}
