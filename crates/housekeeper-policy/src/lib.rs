//! # housekeeper-policy
//!
//! Lexical query policy for the Housekeeper MCP gateway.
//!
//! Model-supplied queries arrive in two shapes: structured arguments (table,
//! columns, opaque `WHERE`/`ORDER BY` fragments) and free-form SQL. Both are
//! checked against the same policy before anything reaches the database:
//!
//! - a single statement only (no semicolons),
//! - `SELECT`/`WITH` queries only, no write or DDL keywords,
//! - every referenced table lives in an allowed database
//!   (`clusterAllReplicas(_, T)` is unwrapped and checked against `T`).
//!
//! This is deliberately a lexical policy, not a SQL parser. It makes a small
//! set of unsafe shapes impossible; it does not try to understand the query.
//! The only non-lexical concession is quoted-literal stripping, which must
//! preserve byte offsets so position-based scanning stays valid.

mod allowed;
mod error;
mod freeform;
mod structured;

pub use allowed::AllowedDatabases;
pub use error::PolicyError;
pub use freeform::{strip_quoted_literals, validate_freeform_sql};
pub use structured::{validate_structured, StructuredQuery};
