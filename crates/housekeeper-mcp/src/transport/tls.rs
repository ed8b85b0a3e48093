//! TLS listener configuration.

use crate::error::McpError;
use axum_server::tls_rustls::RustlsConfig;
use housekeeper_core::config::TlsConfig;

/// Build the rustls configuration for the TLS listener.
///
/// Configured certificate files are authoritative: a file that fails to
/// load is a startup error, never silently replaced. With no files
/// configured, an in-memory self-signed certificate is generated for
/// development, with a conspicuous warning.
pub async fn rustls_config(cfg: &TlsConfig) -> Result<RustlsConfig, McpError> {
    let cert_file = cfg.cert_file.trim();
    let key_file = cfg.key_file.trim();

    if !cert_file.is_empty() && !key_file.is_empty() {
        return RustlsConfig::from_pem_file(cert_file, key_file)
            .await
            .map_err(|e| {
                McpError::StartupFailed(format!(
                    "failed to load TLS certificate {cert_file}: {e}"
                ))
            });
    }

    if !cfg.self_signed {
        tracing::warn!("no TLS certificate configured; generating a self-signed certificate");
    }
    tracing::warn!(
        "serving a SELF-SIGNED TLS certificate; do not use this outside development"
    );
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .map_err(|e| McpError::StartupFailed(format!("self-signed cert generation: {e}")))?;
    let cert_pem = certified.cert.pem();
    let key_pem = certified.key_pair.serialize_pem();
    RustlsConfig::from_pem(cert_pem.into_bytes(), key_pem.into_bytes())
        .await
        .map_err(|e| McpError::StartupFailed(format!("self-signed cert load: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_self_signed_generation() {
        let cfg = TlsConfig {
            enabled: true,
            self_signed: true,
            ..Default::default()
        };
        assert!(rustls_config(&cfg).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_cert_file_is_error_not_fallback() {
        // A configured file that fails to load must error even when
        // self_signed is also set.
        let cfg = TlsConfig {
            enabled: true,
            cert_file: "/nonexistent/cert.pem".to_string(),
            key_file: "/nonexistent/key.pem".to_string(),
            self_signed: true,
            ..Default::default()
        };
        assert!(rustls_config(&cfg).await.is_err());
    }

    #[tokio::test]
    async fn test_no_files_generates_self_signed() {
        let cfg = TlsConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(rustls_config(&cfg).await.is_ok());
    }
}
