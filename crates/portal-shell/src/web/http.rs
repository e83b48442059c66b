use std::net::SocketAddr;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{MethodFilter, get, on},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::{
    app::{API_PREFIX, APP_NAMESPACE, AppContext, PROCESS_ICONS},
    error::ShellError,
    i18n::{default_locale, normalize_locale_tag, translate_value},
    web::routes::{ArgBinding, RouteDescriptor},
};

#[derive(Clone)]
pub struct HttpState {
    pub ctx: AppContext,
}

#[derive(Debug)]
pub struct HttpServerHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl HttpServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<ShellError> for ApiError {
    fn from(err: ShellError) -> Self {
        match err {
            ShellError::ProcessNotFound { .. } | ShellError::IconNotFound { .. } => {
                ApiError::not_found(err.to_string())
            }
            ShellError::MissingField { .. }
            | ShellError::ParseSettingsToml { .. }
            | ShellError::ParseSettingsJson { .. }
            | ShellError::ParseLocale { .. }
            | ShellError::ParseLogin { .. } => ApiError::bad_request(err.to_string()),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ShellError>() {
            Ok(shell) => ApiError::from(shell),
            Err(other) => ApiError::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize, Default)]
struct LocaleQuery {
    locale: Option<String>,
}

/// Locale a request asks for: query param, then `Accept-Language`, then the
/// process default.
fn request_locale(query: &LocaleQuery, headers: &HeaderMap) -> String {
    if let Some(tag) = query.locale.as_deref().and_then(normalize_locale_tag) {
        return tag;
    }

    if let Some(value) = headers.get(header::ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()) {
        let first = value.split(',').next().unwrap_or("").split(';').next().unwrap_or("");
        if let Some(tag) = normalize_locale_tag(first) {
            return tag;
        }
    }

    default_locale()
}

/// Build the router from the exported route table plus the shell's fixed
/// asset and health routes.
pub fn build_router(state: HttpState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::ACCEPT_LANGUAGE])
        .allow_origin(Any);

    let mut router = Router::new().route("/api/health", get(get_health));

    for descriptor in state.ctx.routes.descriptors() {
        let filter = MethodFilter::try_from(descriptor.method.clone())
            .unwrap_or(MethodFilter::GET);
        let route_ctx = state.ctx.clone();
        let route_descriptor = descriptor.clone();
        let handler = move |Query(query): Query<LocaleQuery>, headers: HeaderMap| {
            let ctx = route_ctx.clone();
            let descriptor = route_descriptor.clone();
            async move { dispatch(&ctx, &descriptor, &query, &headers) }
        };
        router = router.route(&descriptor.path, on(filter, handler));
    }

    let icons_path = format!("/api/{API_PREFIX}/app/icons/:name");
    router = router.route(&icons_path, get(get_icon_asset));

    router.layer(cors).with_state(state)
}

/// Bind one route invocation to its target process.
fn dispatch(
    ctx: &AppContext,
    descriptor: &RouteDescriptor,
    query: &LocaleQuery,
    headers: &HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let locale = request_locale(query, headers);
    let args: Vec<Value> = match descriptor.binding {
        ArgBinding::None => Vec::new(),
        ArgBinding::Locale => vec![Value::String(locale.clone())],
    };

    let result = ctx.registry.invoke(&descriptor.process, &args)?;
    let result = if descriptor.translate_response {
        translate_value(&ctx.locales, &locale, APP_NAMESPACE, &result)
    } else {
        result
    };
    Ok(Json(result))
}

async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Serve icon bytes through the icons process, decoded back from its string
/// encoding.
async fn get_icon_asset(
    State(state): State<HttpState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let encoded = state.ctx.registry.invoke(PROCESS_ICONS, &[Value::String(name.clone())])?;
    let bytes = STANDARD
        .decode(encoded.as_str().unwrap_or_default())
        .map_err(|_| ApiError::internal("icon payload was not valid base64"))?;
    let content_type = icon_content_type(&name);
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

fn icon_content_type(name: &str) -> &'static str {
    match name.rsplit('.').next() {
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("svg") => "image/svg+xml",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

pub async fn spawn_http_server(state: HttpState, addr: SocketAddr) -> Result<HttpServerHandle> {
    let router = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("HTTP server listening on {}", local_addr);

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            error!("HTTP server terminated with error: {err}");
        }
    });

    Ok(HttpServerHandle { addr: local_addr, task })
}
