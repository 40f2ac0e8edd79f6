/// Errors from talking to the order service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure or undecodable body.
    #[error("order service request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("order service returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl ApiError {
    /// Whether a retry could plausibly succeed (server-side or transport
    /// trouble, as opposed to a rejected request).
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http(_) => true,
            ApiError::Status { status, .. } => *status >= 500,
        }
    }
}
