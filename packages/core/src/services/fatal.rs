//! Panicking Adapters
//!
//! The executor always returns a [`GraphError`]. Call sites that prefer to
//! abort on failure (setup code, tests, one-shot tools) can opt in through
//! [`OrAbort`], which keeps every panic in this one module.

use crate::services::error::GraphError;

/// Turn a graph result into its value, panicking on error
pub trait OrAbort<T> {
    fn or_abort(self) -> T;
}

impl<T> OrAbort<T> for Result<T, GraphError> {
    #[track_caller]
    fn or_abort(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => panic!("graph operation failed: {}", err),
        }
    }
}
