use thiserror::Error;

use crate::field::FieldKind;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no compute adapter found")]
    AdapterUnavailable,
    #[error("device request failed: {0}")]
    DeviceRequest(String),
    #[error("kernel dispatch failed: {0}")]
    Dispatch(String),
    #[error("buffer map failed: {0}")]
    BufferMap(String),
    #[error("timed out waiting for the device after {0:?}")]
    Timeout(std::time::Duration),
    #[error("device lost")]
    DeviceLost,
    #[error("buffer size mismatch: expected {expected} elements, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum FluidError {
    #[error("event queue for {field} is full ({capacity} events)")]
    CapacityExceeded { field: FieldKind, capacity: usize },
    #[error("invalid injection: {0}")]
    InvalidInjection(String),
    #[error("invalid field selector: {0:?}")]
    InvalidFieldSelector(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type Result<T, E = FluidError> = std::result::Result<T, E>;
