//! ClickHouse HTTP-interface client.
//!
//! One connection per query: each call builds a fresh HTTP client, runs the
//! statement with JSON output, and drops the connection when the result is
//! materialized. Correctness never depends on serial reuse.

use crate::error::ClickhouseError;
use crate::normalize::normalize_value;
use crate::types::ColumnType;
use housekeeper_core::config::ClickhouseConfig;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// An ordered mapping from column name to a JSON-safe value. Column order is
/// preserved from the result metadata.
pub type Row = serde_json::Map<String, Value>;

/// Per-call ClickHouse client. Holds only configuration; connections are
/// opened on demand and closed on completion.
#[derive(Debug, Clone)]
pub struct ClickhouseClient {
    cfg: ClickhouseConfig,
}

/// Column descriptor in the JSON result envelope.
#[derive(Debug, Deserialize)]
struct ResultColumn {
    name: String,
    #[serde(rename = "type")]
    column_type: String,
}

/// The `FORMAT JSON` result envelope.
#[derive(Debug, Deserialize)]
struct ResultSet {
    meta: Vec<ResultColumn>,
    data: Vec<serde_json::Map<String, Value>>,
}

impl ClickhouseClient {
    pub fn new(cfg: ClickhouseConfig) -> Self {
        Self { cfg }
    }

    fn base_url(&self) -> String {
        let scheme = if self.cfg.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}/", self.cfg.host, self.cfg.port)
    }

    /// Execute a statement and materialize the full result set as
    /// normalized rows. The statement must already have passed the policy
    /// check; row volume is bounded by the caller's `LIMIT`.
    pub async fn query(&self, sql: &str) -> Result<Vec<Row>, ClickhouseError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        let response = http
            .post(self.base_url())
            .query(&[
                ("database", self.cfg.database.as_str()),
                ("default_format", "JSON"),
                ("output_format_json_quote_64bit_integers", "0"),
            ])
            .header("X-ClickHouse-User", &self.cfg.user)
            .header("X-ClickHouse-Key", &self.cfg.password)
            .body(sql.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClickhouseError::from_body(body));
        }

        tracing::debug!(
            host = %self.cfg.host,
            port = self.cfg.port,
            database = %self.cfg.database,
            tls = self.cfg.tls,
            "connected to clickhouse"
        );

        let result: ResultSet = serde_json::from_slice(&response.bytes().await?)?;
        Ok(Self::normalize_result(result))
    }

    /// Assemble normalized rows, preserving the column order of the result
    /// metadata. The per-column type drives nullability and value shaping.
    fn normalize_result(result: ResultSet) -> Vec<Row> {
        let columns: Vec<(String, ColumnType)> = result
            .meta
            .iter()
            .map(|c| (c.name.clone(), ColumnType::parse(&c.column_type)))
            .collect();

        result
            .data
            .into_iter()
            .map(|raw| {
                let mut row = Row::new();
                for (name, column_type) in &columns {
                    let cell = raw.get(name).unwrap_or(&Value::Null);
                    row.insert(name.clone(), normalize_value(cell, column_type));
                }
                row
            })
            .collect()
    }
}
