use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("{tool} exited with {code}: {stderr}")]
    ToolError {
        tool: String,
        code: String,
        stderr: String,
    },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Unexpected response from {url}: HTTP {status}")]
    ServiceResponseError { url: String, status: u16 },

    /// An error object in a 200 body, the way ArcGIS REST reports failures.
    #[error("{url} reported error {code}: {message}")]
    ServiceFaultError { url: String, code: i64, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    DataProcessing,
    ExternalTool,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::ServiceResponseError { .. } | EtlError::ServiceFaultError { .. } => {
                ErrorCategory::Network
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::ZipError(_)
            | EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ImageError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::DataProcessing,
            EtlError::ToolError { .. } => ErrorCategory::ExternalTool,
            EtlError::StorageError { .. } => ErrorCategory::Storage,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    /// Drives the process exit code: Low 0, Medium 2, High 1, Critical 3.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Storage => ErrorSeverity::Medium,
            ErrorCategory::Configuration
            | ErrorCategory::DataProcessing
            | ErrorCategory::ExternalTool => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::ApiError(e) if e.is_timeout() || e.is_connect() => {
                "Check network connectivity and that the remote host is up, then rerun".to_string()
            }
            EtlError::ApiError(_) | EtlError::ServiceResponseError { .. } | EtlError::ServiceFaultError { .. } => {
                "Verify the URL in the configuration still points at a live resource".to_string()
            }
            EtlError::ConfigError { .. } | EtlError::ConfigValidationError { .. } => {
                "Fix the configuration file (see habitat-etl validate-config)".to_string()
            }
            EtlError::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}' in the configuration or on the command line", field)
            }
            EtlError::MissingConfigError { field } => {
                format!("Set '{}' in the configuration file or pass it as a flag", field)
            }
            EtlError::ToolError { tool, .. } => {
                format!("Make sure '{}' is installed and on PATH, or set its path under [gdal]", tool)
            }
            EtlError::StorageError { .. } => {
                "Check storage credentials and bucket permissions (habitat-etl check-credentials)".to_string()
            }
            EtlError::ZipError(_) => "The downloaded archive is corrupt; download it again".to_string(),
            EtlError::ImageError(_) => "Regenerate the tiles; an input image could not be decoded".to_string(),
            EtlError::CsvError(_) => "Check the schema CSV has Layer, Field and Rename columns".to_string(),
            EtlError::IoError(_) => "Check that paths exist and are writable".to_string(),
            EtlError::SerializationError(_) | EtlError::ProcessingError { .. } => {
                "Inspect the input data; the service may have changed its response format".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("A network request failed: {}", self),
            ErrorCategory::Configuration => format!("The configuration is not usable: {}", self),
            ErrorCategory::DataProcessing => format!("Processing the data failed: {}", self),
            ErrorCategory::ExternalTool => format!("An external raster tool failed: {}", self),
            ErrorCategory::Storage => format!("Object storage failed: {}", self),
            ErrorCategory::System => format!("A system error occurred: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
