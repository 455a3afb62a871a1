use tenantbind_core::dispatcher::{ConnectorPipeline, Dispatcher};
use tenantbind_core::error::Error;
use tenantbind_core::metrics::Metrics;
use tenantbind_core::password::RandPasswordGenerator;
use tenantbind_core::secret_store::SecretStoreGateway;
use tenantbind_core::telemetry::{self, LogFormat};
use tenantbind_core::vault_http::VaultHttpBackend;
use tenantbind_k8s_util::workload::WorkloadMeta;
use tenantbind_keycloak::adapter::test_util::InMemoryKeycloak;
use tenantbind_keycloak::{KeycloakConnector, KeycloakPipeline, KeycloakReconciler};
use tenantbind_postgres::adapter::test_util::InMemoryPostgres;
use tenantbind_postgres::{PostgresConnector, PostgresPipeline, PostgresReconciler};
use tenantbind_rabbit::adapter::test_util::InMemoryRabbit;
use tenantbind_rabbit::{RabbitConnector, RabbitPipeline, RabbitReconciler};
use tenantbind_sentry::adapter::test_util::InMemorySentry;
use tenantbind_sentry::{SentryConnector, SentryPipeline, SentryReconciler};

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, Router};
use clap::{crate_description, crate_version, Parser};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, ListParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::{reflector, watcher, WatchStreamExt};
use kube::{Client, Resource};
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::Duration;

const SUBSCRIBE_BUFFER_SIZE: usize = 256;

#[derive(Parser, Debug)]
#[command(
    name = "tenantbind-operator",
    about = crate_description!(),
    version = crate_version!(),
)]
struct Args {
    /// Listen on given port for /metrics and /health
    #[arg(long, default_value_t = 8080, env)]
    port: u16,

    /// Filter for log messages
    #[arg(long, default_value = "info", env)]
    log_filter: String,

    /// Set log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env)]
    log_format: LogFormat,

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

struct OperatorState {
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<Metrics>,
}

async fn metrics_handler(State(state): State<Arc<OperatorState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "application/openmetrics-text; version=1.0.0; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(msg = "failed to encode metrics", %e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health() -> impl IntoResponse {
    Json("healthy")
}

async fn check_api_queryable<K>(client: Client) -> Api<K>
where
    K: Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
    <K as Resource>::DynamicType: Default,
{
    let api = Api::<K>::all(client);
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        tracing::error!(msg = "custom resource is not queryable, check controller permissions", %e);
        std::process::exit(1);
    }
    api
}

async fn reconcile_deployment(deployment: Arc<Deployment>, ctx: Arc<OperatorState>) -> Result<Action, Error> {
    let meta = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.metadata.as_ref())
        .map(WorkloadMeta::from_object_meta)
        .unwrap_or_default();

    ctx.dispatcher.reconcile(&meta).await?;
    Ok(Action::requeue(Duration::from_secs(10 * 60)))
}

fn error_policy(_deployment: Arc<Deployment>, error: &Error, _ctx: Arc<OperatorState>) -> Action {
    tracing::warn!(msg = "reconciliation failed", %error);
    if error.is_transient() {
        Action::requeue(Duration::from_secs(30))
    } else {
        Action::requeue(Duration::from_secs(5 * 60))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init(&args.log_filter, args.log_format);

    let client = Client::try_default().await?;

    let postgres_crd = check_api_queryable::<PostgresConnector>(client.clone()).await;
    let rabbit_crd = check_api_queryable::<RabbitConnector>(client.clone()).await;
    let sentry_crd = check_api_queryable::<SentryConnector>(client.clone()).await;
    let keycloak_crd = check_api_queryable::<KeycloakConnector>(client.clone()).await;
    let deployments = check_api_queryable::<Deployment>(client.clone()).await;

    let (postgres_store, postgres_writer) = reflector::store_shared(SUBSCRIBE_BUFFER_SIZE);
    let (rabbit_store, rabbit_writer) = reflector::store_shared(SUBSCRIBE_BUFFER_SIZE);
    let (sentry_store, sentry_writer) = reflector::store_shared(SUBSCRIBE_BUFFER_SIZE);
    let (keycloak_store, keycloak_writer) = reflector::store_shared(SUBSCRIBE_BUFFER_SIZE);

    let postgres_watcher = watcher(postgres_crd, watcher::Config::default())
        .default_backoff()
        .reflect_shared(postgres_writer)
        .for_each(|_| async {});
    let rabbit_watcher = watcher(rabbit_crd, watcher::Config::default())
        .default_backoff()
        .reflect_shared(rabbit_writer)
        .for_each(|_| async {});
    let sentry_watcher = watcher(sentry_crd, watcher::Config::default())
        .default_backoff()
        .reflect_shared(sentry_writer)
        .for_each(|_| async {});
    let keycloak_watcher = watcher(keycloak_crd, watcher::Config::default())
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
    let state = Arc::new(OperatorState { dispatcher, metrics });

    let controller = Controller::new(deployments, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile_deployment, error_policy, state.clone())
        .for_each(|_| futures::future::ready(()));

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health))
        .with_state(state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    tokio::join!(controller, postgres_watcher, rabbit_watcher, sentry_watcher, keycloak_watcher, server).5?;
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM signal handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
    }
}
