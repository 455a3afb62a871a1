use tenantbind_core::dispatcher::{ConnectorPipeline, Dispatcher};
use tenantbind_core::metrics::Metrics;
use tenantbind_core::password::RandPasswordGenerator;
use tenantbind_core::secret_store::SecretStoreGateway;
use tenantbind_core::telemetry::{self, LogFormat};
use tenantbind_core::vault_http::VaultHttpBackend;
use tenantbind_keycloak::adapter::test_util::InMemoryKeycloak;
use tenantbind_keycloak::{KeycloakPipeline, KeycloakReconciler};
use tenantbind_postgres::adapter::test_util::InMemoryPostgres;
use tenantbind_postgres::{PostgresPipeline, PostgresReconciler};
use tenantbind_rabbit::adapter::test_util::InMemoryRabbit;
use tenantbind_rabbit::{RabbitPipeline, RabbitReconciler};
use tenantbind_sentry::adapter::test_util::InMemorySentry;
use tenantbind_sentry::{SentryPipeline, SentryReconciler};

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, Router};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use clap::{crate_description, crate_version, Parser};
use futures::StreamExt;
use kube::runtime::{watcher, WatchStreamExt};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustls::crypto::aws_lc_rs::default_provider;
use rustls::pki_types::CertificateDer;
use rustls::ServerConfig;
use tokio::signal::unix::{signal, SignalKind};

mod admission;
mod handlers;
mod state;

use state::WebhookState;

async fn livez() -> &'static str {
    "healthy"
}

static READYZ_READY: AtomicBool = AtomicBool::new(true);

async fn readyz() -> impl axum::response::IntoResponse {
    if READYZ_READY.load(Ordering::Relaxed) {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn load_tls_config(cert_path: &PathBuf, key_path: &PathBuf) -> anyhow::Result<ServerConfig> {
    let cert_file = File::open(cert_path)?;
    let key_file = File::open(key_path)?;

    let mut cert_reader = BufReader::new(cert_file);
    let mut key_reader = BufReader::new(key_file);

    let certs: Vec<CertificateDer> = rustls_pemfile::certs(&mut cert_reader).collect::<Result<Vec<_>, _>>()?;
    let key = rustls_pemfile::private_key(&mut key_reader)?
        .ok_or_else(|| anyhow::anyhow!("no private key found in key file"))?;

    let mut config = ServerConfig::builder().with_no_client_auth().with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}

async fn watch_tls_files(cert_path: PathBuf, key_path: PathBuf, rustls_config: RustlsConfig) {
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);

    let cert_path_clone = cert_path.clone();
    let key_path_clone = key_path.clone();

    tokio::task::spawn_blocking(move || {
        let rt = tokio::runtime::Handle::current();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    let _ = rt.block_on(tx.send(()));
                }
            }
        })
        .expect("failed to create file watcher");

        if let Some(cert_dir) = cert_path_clone.parent() {
            let _ = watcher.watch(cert_dir, RecursiveMode::NonRecursive);
        }
        if let Some(key_dir) = key_path_clone.parent() {
            if key_dir != cert_path_clone.parent().unwrap_or(Path::new("")) {
                let _ = watcher.watch(key_dir, RecursiveMode::NonRecursive);
            }
        }

        loop {
            std::thread::sleep(Duration::from_secs(1));
        }
    });

    while rx.recv().await.is_some() {
        tokio::time::sleep(Duration::from_secs(5)).await;

        match load_tls_config(&cert_path, &key_path) {
            Ok(new_config) => {
                rustls_config.reload_from_config(Arc::new(new_config));
                tracing::info!("reloaded TLS certificates");
            }
            Err(e) => {
                tracing::error!(msg = "failed to reload TLS config", %e);
            }
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "tenantbind-webhook",
    about = crate_description!(),
    version = crate_version!(),
)]
struct Args {
    /// Listen address (use "::" for IPv6, "0.0.0.0" for IPv4)
    #[arg(long, default_value = "0.0.0.0", env)]
    listen_address: String,

    /// Listen on given port
    #[arg(long, default_value_t = 8443, env)]
    port: u16,

    /// Filter for log messages
    #[arg(long, default_value = "info", env)]
    log_filter: String,

    /// Set log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env)]
    log_format: LogFormat,

    /// Path to TLS certificate file
    #[arg(long, env, required = true)]
    tls_cert: PathBuf,

    /// Path to TLS private key file
    #[arg(long, env, required = true)]
    tls_key: PathBuf,

    /// Vault server address
    #[arg(long, env)]
    vault_addr: String,

    /// Vault token used for every request
    #[arg(long, env)]
    vault_token: String,

    /// KV v2 mount holding every connector's admin and tenant credentials
    #[arg(long, default_value = "secret", env)]
    vault_mount: String,
}

const SUBSCRIBE_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    default_provider().install_default().unwrap();

    let args = Args::parse();
    telemetry::init(&args.log_filter, args.log_format);

    let client = kube::Client::try_default().await?;

    let (postgres_store, postgres_writer) = kube::runtime::reflector::store_shared(SUBSCRIBE_BUFFER_SIZE);
    let (rabbit_store, rabbit_writer) = kube::runtime::reflector::store_shared(SUBSCRIBE_BUFFER_SIZE);
    let (sentry_store, sentry_writer) = kube::runtime::reflector::store_shared(SUBSCRIBE_BUFFER_SIZE);
    let (keycloak_store, keycloak_writer) = kube::runtime::reflector::store_shared(SUBSCRIBE_BUFFER_SIZE);

    let postgres_api = kube::Api::<tenantbind_postgres::PostgresConnector>::all(client.clone());
    let rabbit_api = kube::Api::<tenantbind_rabbit::RabbitConnector>::all(client.clone());
    let sentry_api = kube::Api::<tenantbind_sentry::SentryConnector>::all(client.clone());
    let keycloak_api = kube::Api::<tenantbind_keycloak::KeycloakConnector>::all(client.clone());

    let postgres_watcher = watcher(postgres_api, watcher::Config::default())
        .default_backoff()
        .reflect_shared(postgres_writer)
        .for_each(|_| async {});
    let rabbit_watcher = watcher(rabbit_api, watcher::Config::default())
        .default_backoff()
        .reflect_shared(rabbit_writer)
        .for_each(|_| async {});
    let sentry_watcher = watcher(sentry_api, watcher::Config::default())
        .default_backoff()
        .reflect_shared(sentry_writer)
        .for_each(|_| async {});
    let keycloak_watcher = watcher(keycloak_api, watcher::Config::default())
        .default_backoff()
        .reflect_shared(keycloak_writer)
        .for_each(|_| async {});

    let mount = args.vault_mount.clone();
    let new_gateway = || {
        SecretStoreGateway::new(VaultHttpBackend::new(args.vault_addr.clone(), args.vault_token.clone()), mount.clone())
    };

    let pipelines: Vec<Box<dyn ConnectorPipeline>> = vec![
        Box::new(PostgresPipeline::new(
            PostgresReconciler::new(
                tenantbind_postgres::CrdRegistry::new(postgres_store),
                InMemoryPostgres::new(),
                RandPasswordGenerator::default(),
            ),
            new_gateway(),
        )),
        Box::new(RabbitPipeline::new(
            RabbitReconciler::new(
                tenantbind_rabbit::CrdRegistry::new(rabbit_store),
                InMemoryRabbit::new(),
                RandPasswordGenerator::default(),
            ),
            new_gateway(),
        )),
        Box::new(SentryPipeline::new(
            SentryReconciler::new(tenantbind_sentry::CrdRegistry::new(sentry_store), InMemorySentry::new()),
            new_gateway(),
        )),
        Box::new(KeycloakPipeline::new(
            KeycloakReconciler::new(tenantbind_keycloak::CrdRegistry::new(keycloak_store), InMemoryKeycloak::new()),
            new_gateway(),
        )),
    ];

    let metrics = Arc::new(Metrics::new());
    let dispatcher = Arc::new(Dispatcher::with_metrics(pipelines, metrics.clone()));
    let state = WebhookState::new(dispatcher, metrics);

    let app = Router::new()
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .route("/mutate-deployment", post(handlers::mutate_deployment))
        .route("/mutate-pod", post(handlers::mutate_pod))
        .with_state(state);

    let addr = format!("{}:{}", args.listen_address, args.port);
    let socket_addr: std::net::SocketAddr = addr.parse()?;

    tracing::info!(msg = "starting HTTPS server", addr = %socket_addr);
    let tls_config = load_tls_config(&args.tls_cert, &args.tls_key)?;
    let rustls_config = RustlsConfig::from_config(Arc::new(tls_config));

    let handle: Handle<std::net::SocketAddr> = Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown_signal().await;
        READYZ_READY.store(false, Ordering::Relaxed);
        tracing::info!("received shutdown signal, starting graceful shutdown");
        shutdown_handle.graceful_shutdown(Some(Duration::from_secs(30)));
    });

    let tls_watcher = watch_tls_files(args.tls_cert.clone(), args.tls_key.clone(), rustls_config.clone());

    let server = axum_server::bind_rustls(socket_addr, rustls_config)
        .handle(handle)
        .serve(app.into_make_service());

    tokio::select! {
        result = server => { result?; },
        _ = tls_watcher => {},
        _ = postgres_watcher => {},
        _ = rabbit_watcher => {},
        _ = sentry_watcher => {},
        _ = keycloak_watcher => {},
    }

    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM signal handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
    }
}
