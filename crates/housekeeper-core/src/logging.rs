//! Process-wide logging setup.
//!
//! Level and format come from the `log` configuration section. In stdio mode
//! standard output carries protocol frames, so all telemetry goes to stderr
//! unconditionally.

use crate::config::LogConfig;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber from the log configuration.
///
/// Calling this twice is a startup bug; the second call returns an error
/// from the subscriber and is surfaced as a fatal.
pub fn init_logging(cfg: &LogConfig) -> Result<(), String> {
    let filter = EnvFilter::try_new(&cfg.level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| e.to_string())?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if cfg.format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_accepts_default_config() {
        // The subscriber may already be installed by another test binary
        // section; either outcome exercises the level/format parsing.
        let _ = init_logging(&LogConfig::default());
    }

    #[test]
    fn test_init_logging_json_format() {
        let cfg = LogConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
        };
        let _ = init_logging(&cfg);
    }
}
