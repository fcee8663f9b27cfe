use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::State,
    http::{self, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use platform_authz::Role;
use products_hr::Actor;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    graphql::{RequestActor, SchemaType},
};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(Clone)]
pub struct AppState {
    pub schema: SchemaType,
    pub config: Arc<AppConfig>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "policy server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([
            http::header::CONTENT_TYPE,
            HeaderName::from_static(ACTOR_ID_HEADER),
            HeaderName::from_static(ACTOR_ROLE_HEADER),
        ])
        .allow_methods([Method::POST, Method::GET])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/graphql", post(graphql_handler))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> HttpResult<GraphQLResponse> {
    let mut req = request.into_inner();
    if let Some(actor) = actor_from_headers(&headers)? {
        debug!(actor = %actor.id, role = %actor.role, "graphql request");
        req = req.data(RequestActor(actor));
    }
    let response = state.schema.execute(req).await;
    Ok(GraphQLResponse::from(response))
}

/// Both actor headers or neither; a half-specified or malformed identity is
/// rejected rather than treated as anonymous.
fn actor_from_headers(headers: &HeaderMap) -> HttpResult<Option<Actor>> {
    let id = header_str(headers, ACTOR_ID_HEADER)?;
    let role = header_str(headers, ACTOR_ROLE_HEADER)?;
    match (id, role) {
        (None, None) => Ok(None),
        (Some(id), Some(role)) => {
            let id = Uuid::parse_str(id)
                .map_err(|_| HttpError::new(StatusCode::UNAUTHORIZED, "invalid actor id"))?;
            let role = role
                .parse::<Role>()
                .map_err(|_| HttpError::new(StatusCode::UNAUTHORIZED, "unknown actor role"))?;
            Ok(Some(Actor::new(id, role)))
        }
        _ => Err(HttpError::new(
            StatusCode::UNAUTHORIZED,
            "actor id and role must be sent together",
        )),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> HttpResult<Option<&'a str>> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::trim)
                .map_err(|_| HttpError::new(StatusCode::BAD_REQUEST, "malformed header"))
        })
        .transpose()
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::{GraphqlData, build_schema};
    use axum::body::Body;
    use http_body_util::BodyExt;
    use platform_authz::PolicyEngine;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn router() -> Router {
        let config = AppConfig {
            service_name: "test".into(),
            policy_file: None,
            cors_allowed_origins: vec!["http://localhost:5173".into()],
        };
        build_router(AppState {
            schema: build_schema(GraphqlData::new(PolicyEngine::default())),
            config: Arc::new(config),
        })
    }

    fn graphql_post() -> http::request::Builder {
        http::Request::builder()
            .method(Method::POST)
            .uri("/graphql")
            .header(http::header::CONTENT_TYPE, "application/json")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_version_and_request_id() {
        let response = router()
            .oneshot(
                http::Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn actor_headers_reach_the_schema() {
        let query = r#"mutation { submitApproval(input: {action: "LEAVE_REQUEST", summary: "dentist"}) { awaiting requesterRole } }"#;
        let request = graphql_post()
            .header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
            .header(ACTOR_ROLE_HEADER, "employee")
            .body(Body::from(json!({ "query": query }).to_string()))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["data"]["submitApproval"],
            json!({"awaiting": "SUPERVISOR", "requesterRole": "EMPLOYEE"})
        );
    }

    #[tokio::test]
    async fn half_identity_is_rejected() {
        let query = "{ health { ok } }";
        let request = graphql_post()
            .header(ACTOR_ROLE_HEADER, "DIRECTOR")
            .body(Body::from(json!({ "query": query }).to_string()))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_actor_role_is_rejected() {
        let query = "{ health { ok } }";
        let request = graphql_post()
            .header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
            .header(ACTOR_ROLE_HEADER, "CEO")
            .body(Body::from(json!({ "query": query }).to_string()))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
