use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::LabelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{}", .error_messages.join(", "))]
pub struct ValidationError {
    pub error_messages: Vec<String>,
}

impl ValidationError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            error_messages: vec![message.into()],
        }
    }
}

/// Failures raised while reading from or writing to the store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Label error: {0}")]
    Label(#[from] LabelError),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{message}")]
    Other { message: String },
    #[error("{context}: {inner}")]
    WithContext {
        context: String,
        inner: Box<StoreError>,
    },
}

impl StoreError {
    /// Strips any context wrappers to get at the underlying error
    pub fn root(&self) -> &StoreError {
        match self {
            StoreError::WithContext { inner, .. } => inner.root(),
            e => e,
        }
    }
}

#[macro_export]
macro_rules! other_error {
    ($($arg:tt)*) => {
        $crate::error::StoreError::Other { message: format!($($arg)*) }
    };
}

pub trait ErrorContext<E>: Sized {
    /// Add helpful context to errors
    ///
    /// `context` is provided as a closure to avoid potential formatting cost if
    /// the result isn't an error
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, context: F) -> E;
    /// Add helpful context to errors
    fn context<S: Into<String>>(self, context: S) -> E;
}

impl<E: Into<StoreError>> ErrorContext<StoreError> for E {
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, context: F) -> StoreError {
        self.context(context())
    }
    fn context<S: Into<String>>(self, context: S) -> StoreError {
        StoreError::WithContext {
            context: context.into(),
            inner: Box::new(self.into()),
        }
    }
}

pub trait ResultContext<T> {
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, context: F) -> Result<T, StoreError>;
    fn context<S: Into<String>>(self, context: S) -> Result<T, StoreError>;
}

impl<T, E: Into<StoreError>> ResultContext<T> for Result<T, E> {
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, context: F) -> Result<T, StoreError> {
        self.map_err(|e| e.context(context()))
    }
    fn context<S: Into<String>>(self, context: S) -> Result<T, StoreError> {
        self.map_err(|e| e.context(context))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_context_wraps_and_root_unwraps() {
        let r: Result<(), ValidationError> = Err(ValidationError::new("bad weight"));
        let e = r.context("inner").context("outer").unwrap_err();

        assert_eq!(e.to_string(), "outer: inner: Validation error: bad weight");
        assert!(matches!(e.root(), StoreError::Validation(_)));
    }

    #[test]
    fn test_other_error_macro() {
        let e = other_error!("schema version {} unknown", 7);
        assert_eq!(e.to_string(), "schema version 7 unknown");
    }
}
