use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("rtl_433 process error: {message}")]
    ProcessError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BridgeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BridgeError::ConfigError { .. }
            | BridgeError::MissingConfigError { .. }
            | BridgeError::InvalidConfigValueError { .. }
            | BridgeError::TomlError(_)
            | BridgeError::UrlError(_) => ErrorCategory::Configuration,
            BridgeError::HttpError(_) => ErrorCategory::Network,
            BridgeError::SerializationError(_) => ErrorCategory::Data,
            BridgeError::IoError(_) | BridgeError::ProcessError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BridgeError::ConfigError { message } => format!("Configuration problem: {}", message),
            BridgeError::MissingConfigError { field } => {
                format!("The configuration file does not define '{}'", field)
            }
            BridgeError::InvalidConfigValueError { field, reason, .. } => {
                format!("The configuration value for '{}' is invalid: {}", field, reason)
            }
            BridgeError::TomlError(_) | BridgeError::SerializationError(_) => {
                "The configuration file could not be parsed".to_string()
            }
            BridgeError::UrlError(e) => format!("Could not build a CHORDS URL: {}", e),
            BridgeError::HttpError(e) => format!("Could not reach the CHORDS portal: {}", e),
            BridgeError::IoError(e) => format!("File or stream error: {}", e),
            BridgeError::ProcessError { message } => format!("rtl_433 failed: {}", message),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BridgeError::ConfigError { .. }
            | BridgeError::MissingConfigError { .. }
            | BridgeError::InvalidConfigValueError { .. } => {
                "Compare the configuration with deploy/config.example.json"
            }
            BridgeError::TomlError(_) | BridgeError::SerializationError(_) => {
                "Check the configuration file syntax"
            }
            BridgeError::UrlError(_) => "Check chords_host in the configuration file",
            BridgeError::HttpError(_) => "Check network connectivity and the CHORDS host name",
            BridgeError::IoError(_) => "Check that the file exists and is readable",
            BridgeError::ProcessError { .. } => {
                "Check that rtl_433 is installed and the SDR dongle is plugged in"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = BridgeError::MissingConfigError {
            field: "api_key".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("api_key"));
    }

    #[test]
    fn test_process_errors_are_critical() {
        let err = BridgeError::ProcessError {
            message: "no stdout".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.recovery_suggestion().contains("rtl_433"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BridgeError = io.into();
        assert_eq!(err.category(), ErrorCategory::System);
    }
}
