use thiserror::Error;

/// Per-field construction failures. The builder logs and drops these, so they
/// never reach a caller as an error response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid identifier for '{field}': {value}")]
    InvalidId { field: String, value: String },

    #[error("Invalid value for '{field}': {value} (expected one of {allowed})")]
    InvalidEnum {
        field: String,
        value: String,
        allowed: String,
    },
}
