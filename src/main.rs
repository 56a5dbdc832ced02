// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use statement_delivery::{
    api::router,
    auth::ApiKeys,
    config::{AppConfig, KeyDerivation, LogFormat, DEFAULT_LOG_FILTER},
    delivery::{DeliveryService, DerivedKeys, FileCipher, KeyResolver, StaticKey, SystemClock},
    state::AppState,
    storage::{self, StoragePaths},
};

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
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
    info!("Shutdown signal received");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Tracing is not up yet; the format itself comes from config.
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    let addr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "Invalid bind address");
            return ExitCode::FAILURE;
        }
    };

    let (file_storage, collaborators) = match storage::open(StoragePaths::new(&config.data_dir)) {
        Ok(opened) => opened,
        Err(e) => {
            error!(error = %e, data_dir = %config.data_dir.display(), "Failed to open storage");
            return ExitCode::FAILURE;
        }
    };

    let keys: Arc<dyn KeyResolver> = match config.key_derivation {
        KeyDerivation::Static => Arc::new(StaticKey::new(config.encryption_key.clone())),
        KeyDerivation::PerFile => Arc::new(DerivedKeys::new(config.encryption_key.clone())),
    };
    let delivery = DeliveryService::new(
        collaborators,
        FileCipher::new(keys),
        Arc::new(SystemClock),
        config.default_link_minutes,
    );

    let Some(api_keys) = ApiKeys::new(config.api_keys.iter()) else {
        error!("Failed to initialize API key verifier");
        return ExitCode::FAILURE;
    };
    info!(count = api_keys.len(), "API keys loaded");

    let state = AppState::new(delivery, file_storage, api_keys, config.public_base_url.clone());
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %addr, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    info!(
        %addr,
        public_base_url = %config.public_base_url,
        key_derivation = ?config.key_derivation,
        "Statement delivery server listening (docs at /docs)"
    );

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await;

    match served {
        Ok(()) => {
            info!("Server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
