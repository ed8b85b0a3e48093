//! Validation of structured query arguments.

use crate::allowed::AllowedDatabases;
use crate::error::PolicyError;

/// The structured shape of a database tool call, after JSON decoding.
///
/// `where_clause` and `order_by` are opaque expressions; the policy only
/// guarantees they cannot terminate the statement or smuggle a second one.
#[derive(Debug, Clone, Default)]
pub struct StructuredQuery {
    pub table: String,
    pub columns: Vec<String>,
    pub where_clause: String,
    pub order_by: String,
    pub limit: i64,
}

/// Characters that end a statement or break out of a clause.
const SEPARATORS: &[char] = &[';', '\n', '\r', '\t'];

fn contains_separator(s: &str) -> bool {
    s.contains(SEPARATORS)
}

/// Validate structured query arguments against the allowed-database policy.
pub fn validate_structured(
    q: &StructuredQuery,
    allowed: &AllowedDatabases,
) -> Result<(), PolicyError> {
    if q.table.is_empty() {
        return Err(PolicyError::TableRequired);
    }
    let table = q.table.trim();
    if !allowed.is_table_allowed(table) {
        return Err(PolicyError::TableNotAllowed(allowed.names().join(", ")));
    }
    if contains_separator(table) {
        return Err(PolicyError::InvalidTableName);
    }
    for col in &q.columns {
        if col.is_empty() || contains_separator(col) {
            return Err(PolicyError::InvalidColumnName(col.clone()));
        }
    }
    if contains_separator(&q.where_clause) || contains_separator(&q.order_by) {
        return Err(PolicyError::InvalidClause);
    }
    if q.limit < 0 {
        return Err(PolicyError::NegativeLimit);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> AllowedDatabases {
        AllowedDatabases::new(&["system".to_string(), "models".to_string()])
    }

    #[test]
    fn test_valid_structured_query() {
        let q = StructuredQuery {
            table: "system.query_log".to_string(),
            columns: vec!["query".to_string(), "query_duration_ms".to_string()],
            where_clause: "query_duration_ms > 1000".to_string(),
            order_by: "query_duration_ms DESC".to_string(),
            limit: 10,
        };
        assert!(validate_structured(&q, &allowed()).is_ok());
    }

    #[test]
    fn test_valid_non_system_table() {
        let q = StructuredQuery {
            table: "models.predictions".to_string(),
            columns: vec!["id".to_string(), "score".to_string()],
            limit: 5,
            ..Default::default()
        };
        assert!(validate_structured(&q, &allowed()).is_ok());
    }

    #[test]
    fn test_empty_table() {
        let q = StructuredQuery {
            columns: vec!["col1".to_string()],
            ..Default::default()
        };
        assert_eq!(
            validate_structured(&q, &allowed()),
            Err(PolicyError::TableRequired)
        );
    }

    #[test]
    fn test_table_not_in_allowed_databases() {
        let q = StructuredQuery {
            table: "unauthorized.table".to_string(),
            ..Default::default()
        };
        let err = validate_structured(&q, &allowed()).unwrap_err();
        assert!(matches!(err, PolicyError::TableNotAllowed(_)));
        assert!(err.to_string().contains("allowed databases"));
    }

    #[test]
    fn test_table_with_semicolon() {
        let q = StructuredQuery {
            table: "system.query_log; DROP TABLE users".to_string(),
            ..Default::default()
        };
        let err = validate_structured(&q, &allowed()).unwrap_err();
        assert_eq!(err, PolicyError::InvalidTableName);
        assert!(err.to_string().contains("invalid table name"));
    }

    #[test]
    fn test_table_with_newline() {
        let q = StructuredQuery {
            table: "system.query_log\nDROP TABLE users".to_string(),
            ..Default::default()
        };
        assert_eq!(
            validate_structured(&q, &allowed()),
            Err(PolicyError::InvalidTableName)
        );
    }

    #[test]
    fn test_column_with_separator() {
        for bad in ["duration; DROP TABLE", "a\nb", "a\rb", "a\tb", ""] {
            let q = StructuredQuery {
                table: "system.query_log".to_string(),
                columns: vec!["query".to_string(), bad.to_string()],
                ..Default::default()
            };
            assert_eq!(
                validate_structured(&q, &allowed()),
                Err(PolicyError::InvalidColumnName(bad.to_string())),
                "column {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_where_clause_with_semicolon() {
        let q = StructuredQuery {
            table: "system.query_log".to_string(),
            where_clause: "duration > 1000; DROP TABLE users".to_string(),
            ..Default::default()
        };
        assert_eq!(
            validate_structured(&q, &allowed()),
            Err(PolicyError::InvalidClause)
        );
    }

    #[test]
    fn test_order_by_with_tab() {
        let q = StructuredQuery {
            table: "system.query_log".to_string(),
            order_by: "duration\tDESC".to_string(),
            ..Default::default()
        };
        assert_eq!(
            validate_structured(&q, &allowed()),
            Err(PolicyError::InvalidClause)
        );
    }

    #[test]
    fn test_negative_limit() {
        let q = StructuredQuery {
            table: "system.query_log".to_string(),
            limit: -1,
            ..Default::default()
        };
        assert_eq!(
            validate_structured(&q, &allowed()),
            Err(PolicyError::NegativeLimit)
        );
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let q = StructuredQuery {
            table: "system.query_log".to_string(),
            limit: 0,
            ..Default::default()
        };
        assert!(validate_structured(&q, &allowed()).is_ok());
    }
}
