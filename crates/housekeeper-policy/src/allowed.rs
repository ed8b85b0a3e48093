//! The allowed-database set.

/// Process-wide set of database names queries may reference.
///
/// Immutable after config load. Matching is case-insensitive on the
/// `db.table` prefix; a bare table name without a database prefix never
/// matches.
#[derive(Debug, Clone)]
pub struct AllowedDatabases {
    names: Vec<String>,
}

impl AllowedDatabases {
    /// Build the set from configured names. An empty configuration falls
    /// back to the default `{"system"}`.
    pub fn new(names: &[String]) -> Self {
        let names: Vec<String> = names
            .iter()
            .map(|n| n.trim().to_ascii_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Self::default();
        }
        Self { names }
    }

    /// The database names in the set, lowercased.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether `table` (of the form `db.name`) references an allowed
    /// database.
    pub fn is_table_allowed(&self, table: &str) -> bool {
        let table = table.trim();
        let Some((db, rest)) = table.split_once('.') else {
            return false;
        };
        if rest.is_empty() {
            return false;
        }
        let db = db.to_ascii_lowercase();
        self.names.iter().any(|n| *n == db)
    }
}

impl Default for AllowedDatabases {
    fn default() -> Self {
        Self {
            names: vec!["system".to_string()],
        }
    }
}
