use thiserror::Error;

/// Failure reported by a [`UserSearch`](crate::UserSearch) backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("search rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("decode error: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum MapSearchError {
    #[error("unknown request path: {0}")]
    UnknownRequest(String),

    #[error("malformed payload for {path}: {reason}")]
    MalformedPayload { path: String, reason: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid shared link: {0}")]
    InvalidLink(String),

    #[error(transparent)]
    Search(#[from] SearchError),
}
