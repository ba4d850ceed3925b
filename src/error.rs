pub type SpinrigResult<T> = Result<T, SpinrigError>;

#[derive(thiserror::Error, Debug)]
pub enum SpinrigError {
    #[error("render request error: {0}")]
    Request(String),

    #[error("transport error: HTTP {status}: {message}")]
    Transport { status: u16, message: String },

    #[error("render job error: {0}")]
    Job(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpinrigError {
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    pub fn transport(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn job(msg: impl Into<String>) -> Self {
        Self::Job(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
