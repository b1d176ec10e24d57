use thiserror::Error;

/// Error taxonomy shared by every surface of the service.
///
/// `Input`, `Validation`, `UnsupportedAction`, `MissingField`, and
/// `NotFound` are expected outcomes and always become an error envelope
/// with a specific code. `BackendUnavailable` triggers the deterministic
/// fallback instead of failing the request. `Internal` is caught at the
/// outermost per-request boundary and reduced to a generic envelope.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    Input(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("action `{0}` is not supported")]
    UnsupportedAction(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("{0} not found")]
    NotFound(String),
    #[error("text generation backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Maximum length of an internal error detail exposed on the wire.
pub const ERROR_DETAIL_LIMIT: usize = 200;

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Input(_) => "INVALID_JSON",
            Self::Validation(_) => "INVALID_REQUEST",
            Self::UnsupportedAction(_) => "UNSUPPORTED_ACTION",
            Self::MissingField("car_id") => "MISSING_CAR_ID",
            Self::MissingField(_) => "INVALID_REQUEST",
            Self::NotFound(_) => "CAR_NOT_FOUND",
            Self::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The message placed in the error envelope. Internal details are
    /// truncated so stack-sized strings never reach a client.
    pub fn wire_message(&self) -> String {
        match self {
            Self::Internal(detail) => {
                format!("internal server error: {}", truncate(detail, ERROR_DETAIL_LIMIT))
            }
            other => other.to_string(),
        }
    }

    pub fn internal(error: impl std::fmt::Display) -> Self {
        Self::Internal(error.to_string())
    }
}

pub fn truncate(value: &str, limit: usize) -> &str {
    if value.len() <= limit {
        return value;
    }
    let mut end = limit;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
