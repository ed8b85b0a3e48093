//! # housekeeper-clickhouse
//!
//! ClickHouse adapter for the Housekeeper MCP gateway.
//!
//! Queries run over the ClickHouse HTTP interface with JSON output. Every
//! tool call opens its own connection and closes it on completion; nothing
//! is pooled at this layer. Structured requests are rewritten into
//! cluster-fan-out SQL for the system database; free-form SQL runs verbatim
//! (after the policy check, which is the caller's responsibility).
//!
//! The column-type metadata returned alongside each result drives the row
//! normalizer: nullable columns yield `null` or the normalized inner value,
//! timestamps become ISO-8601 strings, and unknown types degrade to their
//! string rendering.

mod client;
mod error;
mod normalize;
mod query;
mod types;

pub use client::{ClickhouseClient, Row};
pub use error::ClickhouseError;
pub use normalize::normalize_value;
pub use query::build_structured_sql;
pub use types::ColumnType;
