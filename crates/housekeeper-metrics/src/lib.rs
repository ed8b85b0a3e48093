//! # housekeeper-metrics
//!
//! Prometheus / VictoriaMetrics adapter for the Housekeeper MCP gateway.
//!
//! Tool arguments are translated into `/api/v1/query_range` calls. Time
//! bounds accept either an ISO-8601 instant with timezone or a relative
//! duration prefixed with `-` (added to "now"); the end bound defaults to
//! now. Matrix results are reshaped into `{ raw_result, last_values }`,
//! where `last_values` carries the final sample of each series; non-matrix
//! results pass through unchanged.

mod client;
mod error;
mod shape;
mod timerange;

pub use client::PrometheusClient;
pub use error::MetricsError;
pub use shape::shape_range_result;
pub use timerange::{parse_step, parse_time, validate_time_range};
