//! Error types for the ClickHouse adapter.

use thiserror::Error;

/// Errors surfaced by the ClickHouse adapter. Upstream failures keep the
/// server's error code and message; the adapter never retries.
#[derive(Debug, Error)]
pub enum ClickhouseError {
    /// Failed to reach the server at all.
    #[error("clickhouse connection failed: {0}")]
    Connect(#[from] reqwest::Error),

    /// The server answered with an error.
    #[error("clickhouse error{}: {message}", code.map(|c| format!(" (code {c})")).unwrap_or_default())]
    Upstream {
        code: Option<i64>,
        message: String,
    },

    /// The response body was not the expected JSON shape.
    #[error("failed to decode clickhouse response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClickhouseError {
    /// Parse an HTTP error body into an upstream error, extracting the
    /// `Code: N` prefix ClickHouse puts on exception messages.
    pub(crate) fn from_body(body: String) -> Self {
        let code = body
            .split_once("Code:")
            .and_then(|(_, rest)| {
                rest.trim_start()
                    .split(|c: char| !c.is_ascii_digit())
                    .next()
                    .and_then(|digits| digits.parse::<i64>().ok())
            });
        ClickhouseError::Upstream {
            code,
            message: body.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_body_extracts_code() {
        let err = ClickhouseError::from_body(
            "Code: 62. DB::Exception: Syntax error: failed at position 8".to_string(),
        );
        match err {
            ClickhouseError::Upstream { code, message } => {
                assert_eq!(code, Some(62));
                assert!(message.contains("Syntax error"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_from_body_without_code() {
        let err = ClickhouseError::from_body("connection reset".to_string());
        match err {
            ClickhouseError::Upstream { code, message } => {
                assert_eq!(code, None);
                assert_eq!(message, "connection reset");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
