//! Error types for the metrics adapter.

use thiserror::Error;

/// Errors surfaced by the metrics adapter. Argument problems map to
/// `InvalidArgument` on the wire; backend failures map to `Upstream` and
/// keep the backend's message.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The PromQL query string was empty.
    #[error("query is required")]
    EmptyQuery,

    /// A time bound failed to parse.
    #[error("invalid {which} time format: {detail}")]
    InvalidTime { which: &'static str, detail: String },

    /// The start bound is after the end bound.
    #[error("start time must be before end time")]
    StartAfterEnd,

    /// The step failed to parse as a duration.
    #[error("invalid step duration: {0}")]
    InvalidStep(String),

    /// Failed to reach the metrics backend.
    #[error("prometheus request failed: {0}")]
    Connect(#[from] reqwest::Error),

    /// The backend answered with an error.
    #[error("error querying prometheus: {0}")]
    Upstream(String),

    /// The response body was not the expected JSON shape.
    #[error("failed to decode prometheus response: {0}")]
    Decode(#[from] serde_json::Error),
}
