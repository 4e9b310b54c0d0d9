/// Result type used throughout the roster pipeline
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading, parsing and reporting rosters
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Input file does not exist
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Input bytes could not be decoded with the configured encoding
    #[error("File encoding not supported for '{path}': {message}")]
    Encoding { path: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Field map does not describe a usable row layout
    #[error("Schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// Row has fewer fields than the field map references
    #[error("Malformed row: {found} fields, expected at least {required}")]
    MalformedRow { found: usize, required: usize },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn encoding(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encoding {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error only affects a single row and parsing may continue
    pub fn is_row_level(&self) -> bool {
        matches!(self, Self::MalformedRow { .. })
    }
}
