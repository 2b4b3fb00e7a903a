use thiserror::Error;

#[derive(Error, Debug)]
pub enum MortgageError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid input for {field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("Invalid state: {message}")]
    InvalidStateError { message: String },

    #[error("Upstream returned {status}: {message}")]
    UpstreamError { status: u16, message: String },

    #[error("Assistant error: {message}")]
    AssistantError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Input,
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

impl MortgageError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) | Self::UpstreamError { .. } => ErrorCategory::Network,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::ValidationError { .. } | Self::InvalidStateError { .. } => ErrorCategory::Input,
            Self::CsvError(_) | Self::SerializationError(_) | Self::AssistantError { .. } => {
                ErrorCategory::Data
            }
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::HttpError(_) => "Check network connectivity and the endpoint URL, then retry",
            Self::UpstreamError { status, .. } if *status == 429 => {
                "The upstream service is rate limiting, wait a moment and retry"
            }
            Self::UpstreamError { .. } => "The upstream service rejected the request, retry later",
            Self::MissingConfigError { .. } => "Set the missing environment variable or config key",
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => "Fix the configuration file and run again",
            Self::ValidationError { .. } => "Enter a finite, non-negative number",
            Self::InvalidStateError { .. } => "Finish the current wizard step first",
            Self::AssistantError { .. } => "Rephrase the message and try again",
            Self::CsvError(_) | Self::SerializationError(_) => "Check the data format",
            Self::IoError(_) => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::HttpError(_) => "Could not reach the remote service".to_string(),
            Self::UpstreamError { status, .. } => {
                format!("The remote service answered with status {}", status)
            }
            Self::ValidationError { field, message } => format!("{}: {}", field, message),
            Self::MissingConfigError { field } => format!("Missing setting: {}", field),
            other => other.to_string(),
        }
    }

    /// HTTP status the proxies answer with when this error escapes a handler.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationError { .. }
            | Self::SerializationError(_)
            | Self::InvalidStateError { .. } => 400,
            Self::HttpError(_) | Self::UpstreamError { .. } => 502,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, MortgageError>;
