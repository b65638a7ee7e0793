use rewardnet_model::ErrorKind;

/// Ledger Error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Model Error.
    #[error(transparent)]
    Model(#[from] rewardnet_model::Error),
    /// Json error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Inconsistent snapshot.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl Error {
    /// Create an invalid snapshot error.
    pub fn invalid_snapshot(msg: impl ToString) -> Self {
        Self::InvalidSnapshot(msg.to_string())
    }

    /// Get the stable kind of this error.
    ///
    /// Malformed or inconsistent snapshots are reported as
    /// [`ErrorKind::InvalidArgument`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Model(err) => err.kind(),
            Self::Json(_) | Self::InvalidSnapshot(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Get the model error, if any.
    pub fn as_model(&self) -> Option<&rewardnet_model::Error> {
        match self {
            Self::Model(err) => Some(err),
            _ => None,
        }
    }

    /// Returns whether the failed operation may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        self.as_model()
            .map(rewardnet_model::Error::is_retryable)
            .unwrap_or(false)
    }
}
