use std::sync::Arc;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Local data rejected before any remote call was made.
    #[error("validation failed: {0}")]
    Validation(Arc<str>),

    /// The backing document store failed.
    #[error("store error: {0}")]
    Store(Arc<str>),

    #[error("not found: {0}")]
    NotFound(Arc<str>),

    /// A stored document could not be turned into a domain value.
    #[error("malformed document: {0}")]
    Decode(Arc<str>),

    #[error("user {user_id} is already enrolled in course {course_id}")]
    AlreadyEnrolled { user_id: String, course_id: String },
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into().into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into().into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into().into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into().into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}
