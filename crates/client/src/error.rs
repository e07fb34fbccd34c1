use thiserror::Error;

/// Why a request to the study API did not produce the expected record.
///
/// Every variant takes the same rollback path in
/// [`OptimisticCollection`](crate::OptimisticCollection); only the message differs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
    /// Rejected locally before anything was sent.
    #[error(transparent)]
    Invalid(#[from] study_core::Error),
}

impl ClientError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Invalid(_)) || self.status() == Some(400)
    }
}
