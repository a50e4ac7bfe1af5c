use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("llm endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("llm response had no choices")]
    EmptyResponse,

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid llm config: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("{backend} statement failed ({code}): {message}")]
    Statement {
        backend: String,
        code: String,
        message: String,
    },

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("entity not found after upsert: {0}")]
    MissingEntity(String),
}

impl GraphError {
    /// True when the failure reports that the object being created is already there.
    pub fn is_already_exists(&self) -> bool {
        match self {
            GraphError::Sqlite(error) => error.to_string().contains("already exists"),
            GraphError::Statement { code, message, .. } => {
                code == "955"
                    || code == "ORA-00955"
                    || message.contains("ORA-00955")
                    || message.to_lowercase().contains("already exists")
            }
            _ => false,
        }
    }

    /// True when an insert collided with a unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            GraphError::Statement { code, message, .. } => {
                code == "1" || code == "ORA-00001" || message.contains("ORA-00001")
            }
            _ => false,
        }
    }
}
