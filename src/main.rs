mod config;
mod protocol;
mod report;
mod server;
mod upstream;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use config::Config;
use server::handlers::AppState;
use server::middleware::ApiAuth;
use upstream::{MachineTranslation, UpstreamConfig};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // Configure logging
    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt().json().init();
        }
        _ => {
            tracing_subscriber::fmt().init();
        }
    }

    let engines = config::parse_engine_list(&config.engines);
    if engines.is_empty() {
        error!("ENGINES must name at least one upstream engine");
        std::process::exit(1);
    }

    let upstream_api_key = match &config.upstream_api_key {
        Some(key) => key.clone(),
        None => {
            error!("UPSTREAM_API_KEY is required");
            std::process::exit(1);
        }
    };

    let auth = ApiAuth::new(config.api_master_key.clone());
    if !auth.enabled() {
        warn!("API_MASTER_KEY is unset — client authorization is disabled");
    }

    // Shared pooled client; every upstream call of every request goes
    // through it.
    let http_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .expect("failed to build HTTP client");

    let upstream = Arc::new(MachineTranslation::new(
        http_client,
        UpstreamConfig {
            api_base_url: config.upstream_api_url.clone(),
            socket_base_url: config.upstream_socket_url.clone(),
            api_key: upstream_api_key,
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
            engines: engines.clone(),
            scorer: config.scorer_model.clone(),
            best_model: config.best_model.clone(),
            session_timeout: Duration::from_secs(config.socket_timeout_secs),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
            settle_delay: Duration::from_secs(config.report_settle_secs),
        },
    ));

    let mut models = Vec::with_capacity(engines.len() + 1);
    models.push(config.best_model.clone());
    models.extend(engines);

    info!(
        api_url = %config.upstream_api_url,
        socket_url = %config.upstream_socket_url,
        models = models.len(),
        "using machinetranslation upstream"
    );

    let state = Arc::new(AppState {
        upstream,
        models,
        default_model: config.best_model.clone(),
    });

    let app = server::build_router(state, auth);

    let addr = normalize_addr(&config.addr);
    let listener = TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        error!(addr = addr, error = %e, "failed to bind");
        std::process::exit(1);
    });

    info!(addr = addr, "server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "server error");
            std::process::exit(1);
        });

    info!("server stopped");
}

/// Expand a bare ":8088" listen address to "0.0.0.0:8088".
fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
