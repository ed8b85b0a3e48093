//! Prometheus / VictoriaMetrics HTTP API client.

use crate::error::MetricsError;
use crate::shape::shape_range_result;
use crate::timerange::{parse_step, validate_time_range};
use chrono::{SecondsFormat, Utc};
use housekeeper_core::config::PrometheusConfig;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Long-lived metrics client. The underlying `reqwest` client is safe for
/// concurrent use; callers share one instance.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    base_url: String,
    http: reqwest::Client,
}

/// Envelope of every Prometheus API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
}

impl PrometheusClient {
    /// Build the client from configuration. Cluster mode inserts the
    /// VictoriaMetrics `select/<tenant>/<prefix>` path segments.
    pub fn new(cfg: &PrometheusConfig) -> Result<Self, MetricsError> {
        let base_url = Self::base_url(cfg);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { base_url, http })
    }

    fn base_url(cfg: &PrometheusConfig) -> String {
        let mut base = format!("http://{}:{}", cfg.host, cfg.port);
        if cfg.vm_cluster_mode {
            let prefix = if cfg.vm_path_prefix.is_empty() {
                "prometheus"
            } else {
                cfg.vm_path_prefix.as_str()
            };
            base = format!("{base}/select/{}/{prefix}", cfg.vm_tenant_id);
        }
        base
    }

    /// Run a range query. Validates the time bounds and step, then shapes
    /// the result (`{ raw_result, last_values }` for matrices).
    pub async fn query_range(
        &self,
        query: &str,
        start: &str,
        end: &str,
        step: &str,
    ) -> Result<Value, MetricsError> {
        if query.trim().is_empty() {
            return Err(MetricsError::EmptyQuery);
        }
        let now = Utc::now();
        let (start, end) = validate_time_range(start, end, now)?;
        let step = parse_step(step)?;

        let url = format!("{}/api/v1/query_range", self.base_url);
        let start_param = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let end_param = end.to_rfc3339_opts(SecondsFormat::Secs, true);
        let step_param = format!("{}s", step.as_secs());
        let response = self
            .http
            .get(&url)
            .query(&[
                ("query", query),
                ("start", start_param.as_str()),
                ("end", end_param.as_str()),
                ("step", step_param.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let api: ApiResponse = serde_json::from_slice(&body).map_err(|e| {
            if status.is_success() {
                MetricsError::Decode(e)
            } else {
                MetricsError::Upstream(format!(
                    "HTTP {status}: {}",
                    String::from_utf8_lossy(&body)
                ))
            }
        })?;

        if api.status != "success" {
            return Err(MetricsError::Upstream(
                api.error.unwrap_or_else(|| format!("status {}", api.status)),
            ));
        }

        tracing::debug!(query, "prometheus range query completed");
        Ok(shape_range_result(&api.data))
    }
}
