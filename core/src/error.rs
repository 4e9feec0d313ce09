use thiserror::Error;

/// Berth error types
#[derive(Error, Debug)]
pub enum BerthError {
    /// Requested image is not in the store
    #[error("Image not found: {0}")]
    ImageNotFound(String),

    /// Image reference string could not be parsed
    #[error("Invalid image reference: {0}")]
    InvalidImageReference(String),

    /// Registry auth payload could not be decoded
    #[error("Invalid registry auth: {0}")]
    InvalidAuth(String),

    /// Pod sandbox names a runtime handler that is not registered
    #[error("No runtime registered for handler \"{0}\"")]
    RuntimeNotFound(String),

    /// Configured mirror endpoint is not a valid host or URL
    #[error("Malformed mirror endpoint \"{endpoint}\": {message}")]
    MalformedEndpoint { endpoint: String, message: String },

    /// Container registry error
    #[error("Registry error: {registry} - {message}")]
    RegistryError { registry: String, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl BerthError {
    /// True for the miss case that status and remove treat as a no-op.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BerthError::ImageNotFound(_))
    }
}

impl From<serde_json::Error> for BerthError {
    fn from(err: serde_json::Error) -> Self {
        BerthError::SerializationError(err.to_string())
    }
}

/// Result type alias for Berth operations
pub type Result<T> = std::result::Result<T, BerthError>;
