//! Effective-SQL composition for structured query arguments.

use housekeeper_policy::StructuredQuery;

/// Build the SQL for a structured request.
///
/// Tables in the system database are wrapped in `clusterAllReplicas` for
/// cluster-wide visibility; tables in other allowed databases are queried
/// directly. Arguments must already have passed the policy check.
pub fn build_structured_sql(q: &StructuredQuery, cluster: &str, system_database: &str) -> String {
    let mut sql = String::from("SELECT ");
    if q.columns.is_empty() {
        sql.push('*');
    } else {
        sql.push_str(&q.columns.join(", "));
    }

    let table = q.table.trim();
    let fan_out = table
        .split_once('.')
        .map(|(db, _)| db.eq_ignore_ascii_case(system_database))
        .unwrap_or(false);
    if fan_out {
        sql.push_str(&format!(" FROM clusterAllReplicas({cluster}, {table})"));
    } else {
        sql.push_str(&format!(" FROM {table}"));
    }

    if !q.where_clause.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&q.where_clause);
    }
    if !q.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&q.order_by);
    }
    if q.limit > 0 {
        sql.push_str(&format!(" LIMIT {}", q.limit));
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_structured_query() {
        // The query shape the gateway sends for slow-query triage.
        let q = StructuredQuery {
            table: "system.query_log".to_string(),
            columns: vec!["query".to_string(), "query_duration_ms".to_string()],
            where_clause: "query_duration_ms>1000".to_string(),
            order_by: "query_duration_ms DESC".to_string(),
            limit: 2,
        };
        assert_eq!(
            build_structured_sql(&q, "default", "system"),
            "SELECT query, query_duration_ms \
             FROM clusterAllReplicas(default, system.query_log) \
             WHERE query_duration_ms>1000 ORDER BY query_duration_ms DESC LIMIT 2"
        );
    }

    #[test]
    fn test_empty_columns_select_star() {
        let q = StructuredQuery {
            table: "system.errors".to_string(),
            ..Default::default()
        };
        assert_eq!(
            build_structured_sql(&q, "default", "system"),
            "SELECT * FROM clusterAllReplicas(default, system.errors)"
        );
    }

    #[test]
    fn test_non_system_table_skips_fan_out() {
        let q = StructuredQuery {
            table: "models.predictions".to_string(),
            columns: vec!["id".to_string(), "score".to_string()],
            where_clause: "score > 0.5".to_string(),
            limit: 5,
            ..Default::default()
        };
        let sql = build_structured_sql(&q, "default", "system");
        assert!(sql.contains("FROM models.predictions"));
        assert!(!sql.contains("clusterAllReplicas"));
    }

    #[test]
    fn test_zero_limit_omitted() {
        let q = StructuredQuery {
            table: "system.one".to_string(),
            limit: 0,
            ..Default::default()
        };
        assert!(!build_structured_sql(&q, "default", "system").contains("LIMIT"));
    }

    #[test]
    fn test_fan_out_matches_database_case_insensitively() {
        let q = StructuredQuery {
            table: "SYSTEM.query_log".to_string(),
            ..Default::default()
        };
        assert!(build_structured_sql(&q, "c1", "system").contains("clusterAllReplicas(c1,"));
    }
}
