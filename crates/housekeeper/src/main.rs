//! Housekeeper: a read-only MCP query gateway for ClickHouse and
//! Prometheus.
//!
//! Runs MCP on stdio by default; `--sse` serves the HTTP + SSE transport
//! and `--tsnet` publishes the same surface onto the overlay network.

use clap::Parser;
use housekeeper_core::{init_logging, AppConfig};
use housekeeper_mcp::transport::{build_router, run_stdio, serve_http, serve_https, serve_overlay};
use housekeeper_mcp::tools::{clickhouse_query_tool, prometheus_query_tool};
use housekeeper_mcp::{McpServer, ToolRegistry};
use housekeeper_oauth::Authority;
use std::path::PathBuf;
use std::sync::Arc;

/// Read-only MCP query gateway for ClickHouse and Prometheus.
#[derive(Parser, Debug)]
#[command(name = "housekeeper", version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,

    /// Serve MCP over HTTP + SSE instead of stdio.
    #[arg(long)]
    sse: bool,

    /// Publish the MCP HTTP surface onto the overlay network.
    #[arg(long)]
    tsnet: bool,

    /// Run the error-analysis batch mode.
    #[arg(long)]
    analyze: bool,

    /// Run the performance-analysis batch mode.
    #[arg(long)]
    performance: bool,

    /// ClickHouse host.
    #[arg(long = "host", short = 'H')]
    ch_host: Option<String>,

    /// ClickHouse port.
    #[arg(long = "port", short = 'P')]
    ch_port: Option<u16>,

    /// ClickHouse user.
    #[arg(long, short = 'u')]
    user: Option<String>,

    /// ClickHouse password.
    #[arg(long, short = 'p')]
    password: Option<String>,

    /// ClickHouse default database.
    #[arg(long, short = 'd')]
    database: Option<String>,

    /// ClickHouse cluster name for fan-out.
    #[arg(long)]
    cluster: Option<String>,

    /// Comma-separated list of databases queries may reference.
    #[arg(long = "allowed-databases", value_name = "DBS")]
    allowed_databases: Option<String>,

    /// Prometheus / VictoriaMetrics host.
    #[arg(long = "prometheus-host")]
    prometheus_host: Option<String>,

    /// Prometheus / VictoriaMetrics port.
    #[arg(long = "prometheus-port")]
    prometheus_port: Option<u16>,

    /// Enable VictoriaMetrics cluster-mode URL layout.
    #[arg(long = "vm-cluster-mode")]
    vm_cluster_mode: bool,

    /// VictoriaMetrics tenant id.
    #[arg(long = "vm-tenant-id")]
    vm_tenant_id: Option<String>,

    /// VictoriaMetrics path prefix.
    #[arg(long = "vm-path-prefix")]
    vm_path_prefix: Option<String>,

    /// SSE listener port.
    #[arg(long = "sse-port")]
    sse_port: Option<u16>,
}

/// Merge command-line overrides into the loaded configuration.
fn apply_overrides(cfg: &mut AppConfig, args: &Args) {
    if let Some(v) = &args.ch_host {
        cfg.clickhouse.host = v.clone();
    }
    if let Some(v) = args.ch_port {
        cfg.clickhouse.port = v;
    }
    if let Some(v) = &args.user {
        cfg.clickhouse.user = v.clone();
    }
    if let Some(v) = &args.password {
        cfg.clickhouse.password = v.clone();
    }
    if let Some(v) = &args.database {
        cfg.clickhouse.database = v.clone();
    }
    if let Some(v) = &args.cluster {
        cfg.clickhouse.cluster = v.clone();
    }
    if let Some(v) = &args.allowed_databases {
        cfg.clickhouse.allowed_databases =
            v.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Some(v) = &args.prometheus_host {
        cfg.prometheus.host = v.clone();
    }
    if let Some(v) = args.prometheus_port {
        cfg.prometheus.port = v;
    }
    if args.vm_cluster_mode {
        cfg.prometheus.vm_cluster_mode = true;
    }
    if let Some(v) = &args.vm_tenant_id {
        cfg.prometheus.vm_tenant_id = v.clone();
    }
    if let Some(v) = &args.vm_path_prefix {
        cfg.prometheus.vm_path_prefix = v.clone();
    }
    if let Some(v) = args.sse_port {
        cfg.sse.port = v;
    }
    if args.tsnet {
        cfg.tsnet.enabled = true;
    }
}

fn fatal(message: &str) -> ! {
    tracing::error!(error = message, "fatal startup error");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut cfg = match AppConfig::load(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Logging is not configured yet; report on stderr and exit.
            eprintln!("fatal: {e}");
            std::process::exit(1);
        }
    };
    apply_overrides(&mut cfg, &args);

    if let Err(e) = init_logging(&cfg.log) {
        eprintln!("fatal: failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if args.analyze || args.performance {
        fatal("analysis batch modes are provided by the housekeeper-analyze companion binary");
    }

    // Tool registry: immutable for the process lifetime.
    let mut registry = ToolRegistry::new();
    registry.register(clickhouse_query_tool(cfg.clickhouse.clone()));
    match prometheus_query_tool(&cfg.prometheus) {
        Ok(tool) => registry.register(tool),
        Err(e) => tracing::error!(error = %e, "failed to initialize prometheus client"),
    }
    tracing::info!(tools = ?registry.names(), "MCP server initialized");
    let engine = Arc::new(McpServer::new(registry));

    let authority = if cfg.oauth.enabled {
        match Authority::new(cfg.oauth.clone()) {
            Ok(authority) => Some(Arc::new(authority)),
            Err(e) => fatal(&format!("failed to initialize OAuth authority: {e}")),
        }
    } else {
        tracing::info!("OAuth disabled (oauth.enabled=false)");
        None
    };

    let result = if cfg.tsnet.enabled {
        let app = build_router(engine, authority);
        serve_overlay(app, &cfg.tsnet).await
    } else if args.sse {
        let app = build_router(engine, authority);
        if cfg.sse.tls.enabled {
            let https_app = app.clone();
            let sse_cfg = cfg.sse.clone();
            tokio::select! {
                r = serve_http(app, cfg.sse.port) => r,
                r = serve_https(https_app, &sse_cfg) => r,
            }
        } else {
            serve_http(app, cfg.sse.port).await
        }
    } else {
        run_stdio(engine).await
    };

    if let Err(e) = result {
        fatal(&e.to_string());
    }
}
