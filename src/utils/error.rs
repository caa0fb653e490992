use thiserror::Error;

#[derive(Error, Debug)]
pub enum PriceCheckError {
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

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Price lookup unavailable: {message}")]
    LookupUnavailableError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
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

impl PriceCheckError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) | Self::LookupUnavailableError { .. } => ErrorCategory::Network,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_) | Self::SerializationError(_) | Self::ProcessingError { .. } => {
                ErrorCategory::Data
            }
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::HttpError(_) => "Check your network connection and try again",
            Self::LookupUnavailableError { .. } => {
                "Cardmarket could not be reached; check the base URL or retry later"
            }
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ConfigValidationError { .. } => {
                "Review the command line flags and the TOML config file"
            }
            Self::IoError(_) => "Make sure the input file exists and the output directory is writable",
            Self::CsvError(_) | Self::SerializationError(_) => {
                "Remove the output or cache file and run again"
            }
            Self::ProcessingError { .. } => "Run again with --verbose for details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("File not found: {}", e)
            }
            Self::LookupUnavailableError { message } => {
                format!("No price could be fetched for any card: {}", message)
            }
            other => other.to_string(),
        }
    }
}

/// Failure of a single price lookup. Never aborts a run on its own.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("price source unreachable: {0}")]
    Unavailable(String),

    #[error("lookup failed: {0}")]
    Failed(String),
}

impl LookupError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, PriceCheckError>;
