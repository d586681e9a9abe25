use std::cell::RefCell;

use shared::error::StoreError;
use tracing::error;

/// Receives failures that core operations swallow instead of returning
pub trait ErrorSink {
    fn report(&self, operation: &'static str, error: &StoreError);
}

/// Logs the failure and moves on
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, operation: &'static str, error: &StoreError) {
        error!(operation, %error, "Store operation failed");
    }
}

/// Keeps every reported failure so they can be inspected afterwards
#[derive(Debug, Default)]
pub struct RecordingErrorSink {
    reports: RefCell<Vec<(&'static str, String)>>,
}

impl RecordingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(&'static str, String)> {
        self.reports.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }
}

impl ErrorSink for RecordingErrorSink {
    fn report(&self, operation: &'static str, error: &StoreError) {
        TracingErrorSink.report(operation, error);
        self.reports.borrow_mut().push((operation, error.to_string()));
    }
}
