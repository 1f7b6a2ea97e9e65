//! Authentication error types.

/// Reasons a request fails authentication.
///
/// All variants surface to callers as an authorization failure and are
/// never retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing signature")]
    MissingSignature,

    #[error("Missing timestamp")]
    MissingTimestamp,

    #[error("Request timestamp too old")]
    TimestampExpired,

    #[error("Invalid signature")]
    InvalidSignature,
}

impl AuthError {
    /// Stable wire code for this error.
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingSignature => "MISSING_SIGNATURE",
            Self::MissingTimestamp => "MISSING_TIMESTAMP",
            Self::TimestampExpired => "TIMESTAMP_EXPIRED",
            Self::InvalidSignature => "INVALID_SIGNATURE",
        }
    }
}
