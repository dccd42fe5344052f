pub type GlideResult<T> = Result<T, GlideError>;

#[derive(thiserror::Error, Debug)]
pub enum GlideError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("scene is locked while an export is running")]
    SceneLocked,

    #[error("export unavailable: {0}")]
    ExportUnavailable(String),

    #[error("export failed: {0}")]
    ExportFailure(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlideError {
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ExportUnavailable(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::ExportFailure(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Errors a user can act on by changing input; none of them poison the engine.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<serde_json::Error> for GlideError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}
