use std::collections::HashMap;
use std::sync::Arc;

use address_lookup::{AddressCaptureFlow, FlowAdvance, PostcodeClient, SubStep};
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Form, Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::infra::{AppState, SessionRegistry};

/// Shared state for the wizard routes: the flow itself plus the per-session
/// stores the host framework would normally own.
pub(crate) struct WizardState<C> {
    pub(crate) flow: Arc<AddressCaptureFlow<C>>,
    pub(crate) sessions: SessionRegistry,
}

impl<C> Clone for WizardState<C> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StepQuery {
    step: Option<String>,
}

pub(crate) fn wizard_router<C>(state: WizardState<C>) -> Router
where
    C: PostcodeClient + 'static,
{
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/wizard/:session_id/address",
            get(render_step::<C>).post(submit_step::<C>),
        )
        .route("/wizard/:session_id/summary", get(wizard_summary::<C>))
        .with_state(state)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// GET: render the sub-step selected by the `step` query parameter.
pub(crate) async fn render_step<C>(
    State(state): State<WizardState<C>>,
    Path(session_id): Path<String>,
    Query(query): Query<StepQuery>,
) -> Response
where
    C: PostcodeClient + 'static,
{
    let Some(step) = SubStep::parse(query.step.as_deref()) else {
        return unknown_step_response();
    };

    let session = state.sessions.store(&session_id);
    let view = state.flow.step_view(session.as_ref(), step);
    Json(view).into_response()
}

/// POST: process the sub-step's form submission. Field validation failures
/// are stashed and answered with a redirect back to the same sub-step so the
/// query string (and with it the user's place in the wizard) is preserved.
pub(crate) async fn submit_step<C>(
    State(state): State<WizardState<C>>,
    Path(session_id): Path<String>,
    Query(query): Query<StepQuery>,
    RawQuery(raw_query): RawQuery,
    Form(form): Form<HashMap<String, String>>,
) -> Response
where
    C: PostcodeClient + 'static,
{
    let Some(step) = SubStep::parse(query.step.as_deref()) else {
        return unknown_step_response();
    };

    let session = state.sessions.store(&session_id);
    let keys = state.flow.keys();
    let field = |name: &str| form.get(name).map(String::as_str).unwrap_or("");

    let outcome = match step {
        SubStep::Postcode => state
            .flow
            .submit_postcode(session.as_ref(), field(keys.postcode()))
            .await
            .map(FlowAdvance::Step),
        SubStep::Lookup => state
            .flow
            .select_address(session.as_ref(), field(keys.select()))
            .map(|_| FlowAdvance::Complete),
        SubStep::Address | SubStep::Manual => state
            .flow
            .submit_manual(session.as_ref(), field(keys.address()))
            .map(|_| FlowAdvance::Complete),
    };

    match outcome {
        Ok(FlowAdvance::Step(next)) => {
            Redirect::to(&step_location(&session_id, raw_query.as_deref(), next)).into_response()
        }
        Ok(FlowAdvance::Complete) => {
            Redirect::to(&format!("/wizard/{session_id}/summary")).into_response()
        }
        Err(failure) => {
            state.flow.stash_failure(session.as_ref(), &failure);
            Redirect::to(&same_location(&session_id, raw_query.as_deref())).into_response()
        }
    }
}

pub(crate) async fn wizard_summary<C>(
    State(state): State<WizardState<C>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: PostcodeClient + 'static,
{
    let session = state.sessions.store(&session_id);
    match state.flow.final_address(session.as_ref()) {
        Some(address) => Json(json!({ "address": address })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no address captured yet" })),
        )
            .into_response(),
    }
}

fn unknown_step_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "unknown sub-step" })),
    )
        .into_response()
}

/// Rewrite the `step` parameter while preserving the rest of the query
/// string, so unrelated wizard parameters survive the hop.
fn step_location(session_id: &str, raw_query: Option<&str>, next: SubStep) -> String {
    let mut params: Vec<String> = raw_query
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("step="))
        .map(str::to_string)
        .collect();
    params.push(format!("step={next}"));
    format!("/wizard/{session_id}/address?{}", params.join("&"))
}

fn same_location(session_id: &str, raw_query: Option<&str>) -> String {
    match raw_query {
        Some(query) if !query.is_empty() => format!("/wizard/{session_id}/address?{query}"),
        _ => format!("/wizard/{session_id}/address"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::CannedPostcodeClient;
    use address_lookup::AddressLookupConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn test_router() -> Router {
        let config = AddressLookupConfig::new("address-one")
            .expect("valid address key")
            .with_allowed_countries(["England"]);
        let state = WizardState {
            flow: Arc::new(AddressCaptureFlow::new(config, CannedPostcodeClient)),
            sessions: SessionRegistry::default(),
        };
        wizard_router(state)
    }

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .expect("location header present")
            .to_str()
            .expect("location header is ascii")
    }

    #[tokio::test]
    async fn successful_lookup_redirects_to_the_lookup_sub_step() {
        let app = test_router();
        let response = app
            .oneshot(form_post(
                "/wizard/s1/address?step=postcode",
                "address-one-postcode=CR0+2EU",
            ))
            .await
            .expect("request handled");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/wizard/s1/address?step=lookup");
    }

    #[tokio::test]
    async fn failed_lookup_redirects_to_the_address_sub_step() {
        let app = test_router();
        let response = app
            .oneshot(form_post(
                "/wizard/s1/address?step=postcode",
                "address-one-postcode=BN25+1XY",
            ))
            .await
            .expect("request handled");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/wizard/s1/address?step=address");
    }

    #[tokio::test]
    async fn invalid_postcode_redirects_back_preserving_the_query() {
        let app = test_router();
        let response = app
            .oneshot(form_post(
                "/wizard/s1/address?step=postcode&return=summary",
                "address-one-postcode=INVALID",
            ))
            .await
            .expect("request handled");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "/wizard/s1/address?step=postcode&return=summary"
        );
    }

    #[tokio::test]
    async fn unrelated_query_parameters_survive_the_step_rewrite() {
        let app = test_router();
        let response = app
            .oneshot(form_post(
                "/wizard/s1/address?return=summary&step=postcode",
                "address-one-postcode=CR0+2EU",
            ))
            .await
            .expect("request handled");

        assert_eq!(
            location(&response),
            "/wizard/s1/address?return=summary&step=lookup"
        );
    }

    #[tokio::test]
    async fn selection_completes_and_summary_returns_the_address() {
        let app = test_router();

        let response = app
            .clone()
            .oneshot(form_post(
                "/wizard/s1/address?step=postcode",
                "address-one-postcode=CR0+2EU",
            ))
            .await
            .expect("request handled");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = app
            .clone()
            .oneshot(form_post(
                "/wizard/s1/address?step=lookup",
                "address-one-select=1+Main+Street,+Croydon,+CR0+2EU",
            ))
            .await
            .expect("request handled");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/wizard/s1/summary");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/wizard/s1/summary")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("request handled");
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .expect("read body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(
            payload["address"],
            json!("1 Main Street\nCroydon\nCR0 2EU")
        );
    }

    #[tokio::test]
    async fn sentinel_selection_redirects_back_to_lookup() {
        let app = test_router();

        app.clone()
            .oneshot(form_post(
                "/wizard/s1/address?step=postcode",
                "address-one-postcode=CR0+2EU",
            ))
            .await
            .expect("request handled");

        let response = app
            .oneshot(form_post(
                "/wizard/s1/address?step=lookup",
                "address-one-select=-1",
            ))
            .await
            .expect("request handled");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/wizard/s1/address?step=lookup");
    }

    #[tokio::test]
    async fn manual_entry_completes_the_sub_flow() {
        let app = test_router();
        let response = app
            .oneshot(form_post(
                "/wizard/s1/address?step=manual",
                "address-one=4+High+Street",
            ))
            .await
            .expect("request handled");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/wizard/s1/summary");
    }

    #[tokio::test]
    async fn unknown_step_is_not_found() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/wizard/s1/address?step=confirm")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("request handled");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn render_defaults_to_the_postcode_step() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/wizard/s1/address")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("request handled");

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .expect("read body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(payload["step"], json!("postcode"));
        assert_eq!(payload["template"], json!("postcode"));
    }

    #[tokio::test]
    async fn summary_before_capture_is_not_found() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/wizard/s9/summary")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("request handled");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
