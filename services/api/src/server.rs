use crate::cli::ServeArgs;
use crate::infra::{seed_candidates, AppState, InMemoryPresentationHost, InMemoryScoringBackend};
use crate::routes::with_review_routes;
use applicant_review::config::AppConfig;
use applicant_review::error::AppError;
use applicant_review::review::{OverrideController, ReviewState};
use applicant_review::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backend = Arc::new(InMemoryScoringBackend::default());
    let seeded = seed_candidates(&backend);
    let presentation = Arc::new(InMemoryPresentationHost::default());
    let controller = OverrideController::new(backend, presentation);
    let review_state = Arc::new(ReviewState::new(controller));

    let app = with_review_routes(review_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, seeded, "applicant review console ready");

    axum::serve(listener, app).await?;
    Ok(())
}
