//! Configuration validation.

use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_app(config, &mut result);
        Self::validate_execution(config, &mut result);
        Self::validate_retry(config, &mut result);
        Self::validate_model(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_app(config: &Config, result: &mut ValidationResult) {
        if config.app.name.trim().is_empty() {
            result.add_error(ValidationError::new("app.name", "App name cannot be empty"));
        }
        if config.app.default_user.trim().is_empty() {
            result.add_error(ValidationError::new(
                "app.default_user",
                "Default user cannot be empty",
            ));
        }
    }

    fn validate_execution(config: &Config, result: &mut ValidationResult) {
        if config.execution.channel_capacity == 0 {
            result.add_error(ValidationError::new(
                "execution.channel_capacity",
                "channel_capacity must be greater than 0",
            ));
        }

        if config.execution.max_tool_rounds == 0 {
            result.add_error(ValidationError::new(
                "execution.max_tool_rounds",
                "max_tool_rounds must be greater than 0",
            ));
        } else if config.execution.max_tool_rounds > 100 {
            result.add_warning(ValidationWarning::new(
                "execution.max_tool_rounds",
                "max_tool_rounds is very high (>100), a misbehaving model may loop for a long time",
            ));
        }
    }

    fn validate_retry(config: &Config, result: &mut ValidationResult) {
        let retry = &config.retry;

        if retry.backoff_multiplier < 1.0 {
            result.add_error(ValidationError::new(
                "retry.backoff_multiplier",
                "backoff_multiplier must be at least 1.0",
            ));
        }

        if retry.max_backoff_ms < retry.initial_backoff_ms {
            result.add_error(ValidationError::new(
                "retry.max_backoff_ms",
                "max_backoff_ms must not be below initial_backoff_ms",
            ));
        }

        if retry.max_retries > 10 {
            result.add_warning(ValidationWarning::new(
                "retry.max_retries",
                "max_retries is very high (>10), failing calls will take a long time to surface",
            ));
        }
    }

    fn validate_model(config: &Config, result: &mut ValidationResult) {
        if config.model.default.trim().is_empty() {
            result.add_error(ValidationError::new(
                "model.default",
                "Default model cannot be empty",
            ));
        }

        if let Some(temperature) = config.model.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                result.add_error(ValidationError::new(
                    "model.temperature",
                    "temperature must be between 0.0 and 2.0",
                ));
            }
        }

        if config.model.max_output_tokens == Some(0) {
            result.add_error(ValidationError::new(
                "model.max_output_tokens",
                "max_output_tokens must be greater than 0",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

        let level = config.logging.level.to_ascii_lowercase();
        if !LEVELS.contains(&level.as_str()) && !level.contains('=') {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!("Unrecognized log level '{}', falling back to info", config.logging.level),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
