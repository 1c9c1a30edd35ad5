use anyhow::Result;
use axum::serve;
use hotboard_core::{config::AppConfig, runtime::HotboardRuntime};
use server::{admin, router};
use std::net::SocketAddr;
use tokio::{signal, sync::broadcast};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins; otherwise the configured level applies to the workspace crates.
fn init_logging(config: &AppConfig) {
    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,hotboard_core={level},server={level}")));

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!("Starting hotboard server");
    debug!(
        bind_port = config.server.bind_port,
        cache_backend = ?config.cache.backend,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    let addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;
    let admin_addr = if config.admin.enabled {
        Some(config.admin_socket_addr().map_err(|e| anyhow::anyhow!(e))?)
    } else {
        None
    };

    let runtime = HotboardRuntime::builder()
        .with_config(config)
        .build()
        .await
        .map_err(|e| anyhow::anyhow!("Runtime initialization failed: {e}"))?;

    let shutdown_tx = runtime.shutdown_sender();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    let app = router::create_public_router(runtime.components().clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Gallery server listening");
    let public_server = serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(wait_for(runtime.shutdown_receiver()));

    if let Some(admin_addr) = admin_addr {
        let admin_app = admin::create_admin_router(admin::AdminState::new(runtime.components().clone()));
        let admin_listener = tokio::net::TcpListener::bind(admin_addr).await?;
        info!(address = %admin_addr, "Admin server listening");
        let admin_server =
            serve(admin_listener, admin_app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(wait_for(runtime.shutdown_receiver()));

        let (public_result, admin_result) = tokio::join!(public_server, admin_server);
        if let Err(e) = public_result {
            error!(error = %e, "Gallery server error occurred");
        }
        if let Err(e) = admin_result {
            error!(error = %e, "Admin server error occurred");
        }
    } else if let Err(e) = public_server.await {
        error!(error = %e, "Gallery server error occurred");
    }

    runtime.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn wait_for(mut shutdown_rx: broadcast::Receiver<()>) {
    let _ = shutdown_rx.recv().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
