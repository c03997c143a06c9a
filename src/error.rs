use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Column not found in CSV header: {name:?}")]
    ColumnNotFound { name: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        let error_response = ErrorResponse {
            error_type: self.error_type(),
            message: self.user_message(),
            recoverable: self.is_recoverable(),
        };

        error_response.serialize(serializer)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error_type: String,
    message: String,
    recoverable: bool,
}

impl AppError {
    /// Returns a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::FileNotFound { path } => format!("The file '{}' could not be found", path),
            Self::ColumnNotFound { name } => {
                format!("The CSV header is missing the required column {:?}", name)
            }
            Self::InvalidPath { .. } => "The provided path is invalid".to_string(),
            Self::ConfigError { .. } => "Configuration is invalid".to_string(),
            Self::ParseError { .. } => "Failed to parse the data".to_string(),
            Self::ProcessingError { message } => message.clone(),
            Self::InvalidInput { message } => message.clone(),
            Self::Io(_) => "File operation failed".to_string(),
            Self::Csv(_) => "Failed to read the CSV file".to_string(),
            Self::SerdeJson(_) => "Data processing error".to_string(),
        }
    }

    /// Returns a stable error type tag for scripting against CLI output
    pub fn error_type(&self) -> String {
        match self {
            Self::FileNotFound { .. } => "FILE_NOT_FOUND",
            Self::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            Self::InvalidPath { .. } => "INVALID_PATH",
            Self::ConfigError { .. } => "CONFIG_ERROR",
            Self::ParseError { .. } => "PARSE_ERROR",
            Self::ProcessingError { .. } => "PROCESSING_ERROR",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Io(_) => "IO_ERROR",
            Self::Csv(_) => "CSV_ERROR",
            Self::SerdeJson(_) => "PARSE_ERROR",
        }
        .to_string()
    }

    /// Indicates if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::ConfigError { .. } | Self::ColumnNotFound { .. } | Self::FileNotFound { .. }
        )
    }

    /// Returns the complete error source chain for debugging
    pub fn source_chain(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut current: &dyn std::error::Error = self;

        while let Some(source) = current.source() {
            chain.push(source.to_string());
            current = source;
        }

        chain
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
