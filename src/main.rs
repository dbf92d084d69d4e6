//! ClusterSync Operator
//!
//! Serves the ClusterSync configuration API and runs the DiskVolume
//! controller.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clustersync_operator::{
    controller, crd, metrics, ApiServer, ApiServerConfig, ClusterSyncStore, ControllerConfig,
    Error, InMemoryOperatorConfigRepository, KubeOperatorConfigRepository,
    OperatorConfigRepository, Result, StoreConfig,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// ClusterSync Operator - backup configuration API and DiskVolume controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// REST API bind address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8090")]
    api_addr: String,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: String,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: String,

    /// Name of the OperatorConfig singleton
    #[arg(long, env = "OPERATOR_CONFIG_NAME", default_value = crd::OPERATOR_CONFIG_NAME)]
    operator_config_name: String,

    /// Namespace of the OperatorConfig singleton
    #[arg(long, env = "OPERATOR_CONFIG_NAMESPACE", default_value = crd::OPERATOR_CONFIG_NAMESPACE)]
    operator_config_namespace: String,

    /// Parallel DiskVolume reconciles
    #[arg(long, env = "MAX_CONCURRENT_RECONCILES", default_value = "1")]
    max_concurrent_reconciles: u16,

    /// Attempts per OperatorConfig write on resourceVersion conflicts
    #[arg(long, env = "CONFLICT_RETRIES", default_value = "3")]
    conflict_retries: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Run in standalone mode (no Kubernetes, in-memory OperatorConfig)
    #[arg(long, env = "STANDALONE")]
    standalone: bool,

    /// Serve the API without the DiskVolume controller
    #[arg(long, env = "DISABLE_CONTROLLER")]
    disable_controller: bool,

    /// Print the CRDs as YAML and exit
    #[arg(long)]
    print_crds: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_crds {
        print!("{}", crd::crds_yaml()?);
        return Ok(());
    }

    // Initialize logging
    init_logging(&args);

    info!("Starting ClusterSync Operator");
    info!("  Version: {}", clustersync_operator::VERSION);
    info!("  REST API: {}", args.api_addr);
    info!(
        "  OperatorConfig: {}/{}",
        args.operator_config_namespace, args.operator_config_name
    );
    info!("  Standalone mode: {}", args.standalone);

    metrics::register();

    // Start health server
    let health_addr = args.health_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_health_server(&health_addr).await {
            error!("Health server error: {}", e);
        }
    });

    // Start metrics server
    let metrics_addr = args.metrics_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(&metrics_addr).await {
            error!("Metrics server error: {}", e);
        }
    });

    // OperatorConfig repository and DiskVolume controller
    let repo: Arc<dyn OperatorConfigRepository> = if args.standalone {
        warn!("Standalone mode: OperatorConfig is kept in memory and the controller is disabled");
        Arc::new(InMemoryOperatorConfigRepository::new())
    } else {
        let client = kube::Client::try_default().await?;

        if args.disable_controller {
            info!("DiskVolume controller disabled");
        } else {
            let controller_config = ControllerConfig {
                max_concurrent_reconciles: args.max_concurrent_reconciles,
                error_requeue: Duration::from_secs(5),
            };
            tokio::spawn(controller::run(client.clone(), controller_config));
        }

        Arc::new(KubeOperatorConfigRepository::new(
            client,
            &args.operator_config_namespace,
            &args.operator_config_name,
        ))
    };

    let store = ClusterSyncStore::new(
        repo,
        StoreConfig {
            name: args.operator_config_name.clone(),
            namespace: args.operator_config_namespace.clone(),
            conflict_retries: args.conflict_retries,
        },
    );

    // Create and run API server
    let api_config = ApiServerConfig {
        rest_addr: args.api_addr.parse().map_err(|e| {
            Error::Configuration(format!("Invalid REST API address: {}", e))
        })?,
        ..Default::default()
    };

    let api_server = ApiServer::new(api_config, store);

    let shutdown = api_server.shutdown_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        let _ = shutdown.send(());
    });

    api_server.run().await?;

    info!("Operator shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn", "tower_http=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Health Server
// =============================================================================

fn plain_response(status: hyper::StatusCode, body: &'static str) -> hyper::Response<hyper::Body> {
    let mut response = hyper::Response::new(hyper::Body::from(body));
    *response.status_mut() = status;
    response
}

async fn run_health_server(addr: &str) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Server, StatusCode};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let response = match req.uri().path() {
                "/healthz" | "/livez" | "/readyz" => plain_response(StatusCode::OK, "ok"),
                _ => plain_response(StatusCode::NOT_FOUND, "not found"),
            };
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    let addr: SocketAddr = addr.parse().map_err(|e| {
        Error::Configuration(format!("Invalid health server address: {}", e))
    })?;

    info!("Health server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Health server error: {}", e)))?;

    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let response = match req.uri().path() {
                "/metrics" => {
                    let mut response = Response::new(Body::from(metrics::render()));
                    if let Ok(value) = "text/plain; version=0.0.4".parse() {
                        response.headers_mut().insert(hyper::header::CONTENT_TYPE, value);
                    }
                    response
                }
                _ => plain_response(StatusCode::NOT_FOUND, "not found"),
            };
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    let addr: SocketAddr = addr.parse().map_err(|e| {
        Error::Configuration(format!("Invalid metrics server address: {}", e))
    })?;

    info!("Metrics server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
