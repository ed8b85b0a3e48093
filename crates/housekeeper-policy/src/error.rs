//! Error type for policy rejections.

use thiserror::Error;

/// A policy rejection. Every variant maps to `InvalidArgument` on the wire;
/// the message is surfaced verbatim to the calling model client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Neither `table` nor `sql` was provided.
    #[error("table is required (or provide 'sql')")]
    TableRequired,

    /// The structured table is not in an allowed database.
    #[error("table must be in allowed databases: {0}")]
    TableNotAllowed(String),

    /// The table name contains a separator or control character.
    #[error("invalid table name")]
    InvalidTableName,

    /// A column name is empty or contains a separator or control character.
    #[error("invalid column name: {0:?}")]
    InvalidColumnName(String),

    /// A `WHERE`/`ORDER BY` fragment contains a statement separator.
    #[error("invalid clause")]
    InvalidClause,

    /// A negative limit was supplied.
    #[error("limit must be >= 0")]
    NegativeLimit,

    /// Free-form SQL was empty after trimming.
    #[error("sql is empty")]
    EmptySql,

    /// Free-form SQL contained a semicolon.
    #[error("multiple statements are not allowed")]
    MultipleStatements,

    /// Free-form SQL did not begin with SELECT or WITH.
    #[error("only SELECT/WITH queries are allowed")]
    NotSelect,

    /// Free-form SQL contained a write or DDL keyword.
    #[error("forbidden keyword detected: {0}")]
    ForbiddenKeyword(String),

    /// A FROM/JOIN target resolves outside the allowed databases.
    #[error("only tables from allowed databases are allowed (found: {0})")]
    TargetNotAllowed(String),

    /// A `clusterAllReplicas` call targets a table outside the allowed set.
    #[error("clusterAllReplicas must target tables in allowed databases")]
    ClusterTargetNotAllowed,
}
