use crate::cli::ServeArgs;
use crate::infra::{AppState, SessionRegistry};
use crate::routes::{wizard_router, WizardState};
use address_lookup::config::AppConfig;
use address_lookup::error::AppError;
use address_lookup::{telemetry, AddressCaptureFlow, HttpPostcodeClient};
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

    let client = HttpPostcodeClient::new(config.postcode_api.clone())?;
    let flow = Arc::new(AddressCaptureFlow::new(config.lookup.clone(), client));
    let wizard_state = WizardState {
        flow,
        sessions: SessionRegistry::default(),
    };

    let app = wizard_router(wizard_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "address capture wizard ready");

    axum::serve(listener, app).await?;
    Ok(())
}
