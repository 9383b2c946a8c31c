// crates/gatehouse-server/src/server.rs
// ============================================================================
// Module: Gateway HTTP Server
// Description: HTTP surface wiring the trust boundary primitives into routes.
// Purpose: Gate file reads, admin pages, and privileged outbound calls.
// Dependencies: gatehouse-core, gatehouse-config, axum, tokio
// ============================================================================

//! ## Overview
//! The server exposes the gateway's three boundaries over HTTP: the public
//! resource endpoint (sandboxed resolver), the session-gated admin surface
//! (session authenticator + role authorizer + credentialed proxy), and the
//! token-gated service surface. Boundary state is built once from validated
//! configuration and shared read-only across requests; the server holds no
//! session state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_DISPOSITION;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::COOKIE;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use gatehouse_config::GatewayConfig;
use gatehouse_config::OperatorConfig;
use gatehouse_config::load_signing_key;
use gatehouse_core::AccessAuditEvent;
use gatehouse_core::AccessAuditSink;
use gatehouse_core::Boundary;
use gatehouse_core::CallDescriptor;
use gatehouse_core::GatewayError;
use gatehouse_core::InternalApiClient;
use gatehouse_core::ProxyConfig;
use gatehouse_core::Role;
use gatehouse_core::RootRegistry;
use gatehouse_core::SessionAuthenticator;
use gatehouse_core::SessionClaims;
use gatehouse_core::StderrAuditSink;
use gatehouse_core::TokenGate;
use gatehouse_core::read_resource_limited;
use gatehouse_core::require_role;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Session cookie name.
const SESSION_COOKIE: &str = "gatehouse_session";

/// Outbound user agent for the credentialed proxy.
const PROXY_USER_AGENT: &str = "gatehouse-admin-client/0.1";

// ============================================================================
// SECTION: Server
// ============================================================================

/// Gateway HTTP server instance.
pub struct GatewayServer {
    /// Bind address for the HTTP listener.
    bind: String,
    /// Maximum accepted request body size.
    max_body_bytes: usize,
    /// Shared boundary state.
    state: Arc<AppState>,
}

/// Shared, read-only boundary state.
struct AppState {
    /// Service-to-service bearer gate.
    token_gate: TokenGate,
    /// Session token issuance and verification.
    sessions: SessionAuthenticator,
    /// Session TTL used for the cookie max-age.
    session_ttl_secs: i64,
    /// Configured operator allow-list.
    operators: Vec<OperatorConfig>,
    /// Sandboxed resource roots.
    roots: RootRegistry,
    /// Credentialed proxy to the internal origin.
    proxy: InternalApiClient,
    /// Maximum served file size in bytes.
    max_file_bytes: u64,
    /// Audit sink for boundary decisions.
    audit: Arc<dyn AccessAuditSink>,
}

impl GatewayServer {
    /// Builds a gateway server from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] when initialization fails.
    pub fn from_config(config: GatewayConfig) -> Result<Self, GatewayServerError> {
        Self::with_audit_sink(config, Arc::new(StderrAuditSink))
    }

    /// Builds a gateway server with an explicit audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] when initialization fails.
    pub fn with_audit_sink(
        config: GatewayConfig,
        audit: Arc<dyn AccessAuditSink>,
    ) -> Result<Self, GatewayServerError> {
        config.validate().map_err(|err| GatewayServerError::Config(err.to_string()))?;
        let signing_key = load_signing_key(FsPath::new(&config.session.signing_key_path))
            .map_err(|err| GatewayServerError::Init(err.to_string()))?;
        let sessions = SessionAuthenticator::new(signing_key, config.session.ttl_secs);
        let roots = RootRegistry::new(config.resources.root_paths())
            .map_err(|err| GatewayServerError::Init(err.to_string()))?;
        let origin = config
            .service
            .origin()
            .map_err(|err| GatewayServerError::Config(err.to_string()))?;
        let proxy = InternalApiClient::new(ProxyConfig {
            internal_origin: origin,
            credential: config.service.credential.clone(),
            connect_timeout_ms: config.service.connect_timeout_ms,
            timeout_ms: config.service.request_timeout_ms,
            max_redirects: config.service.max_redirects,
            max_response_bytes: config.service.max_response_bytes,
            user_agent: PROXY_USER_AGENT.to_string(),
        })
        .map_err(|err| GatewayServerError::Init(err.to_string()))?;
        let state = Arc::new(AppState {
            token_gate: TokenGate::new(config.service.credential.clone()),
            sessions,
            session_ttl_secs: config.session.ttl_secs,
            operators: config.session.operators.clone(),
            roots,
            proxy,
            max_file_bytes: config.resources.max_file_bytes,
            audit,
        });
        Ok(Self {
            bind: config.server.bind.clone(),
            max_body_bytes: config.server.max_body_bytes,
            state,
        })
    }

    /// Returns the axum router for this server.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/resource", get(get_resource))
            .route("/session", post(post_session))
            .route("/admin/{page}", get(get_admin_page))
            .route("/internal-call", post(post_internal_call))
            .route("/service/status", get(get_service_status))
            .route("/healthz", get(get_healthz))
            .fallback(fallback_not_found)
            .layer(DefaultBodyLimit::max(self.max_body_bytes))
            .with_state(Arc::clone(&self.state))
    }

    /// Serves requests on the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] when the server fails.
    pub async fn serve(self) -> Result<(), GatewayServerError> {
        let addr: SocketAddr = self
            .bind
            .parse()
            .map_err(|_| GatewayServerError::Config("invalid bind address".to_string()))?;
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| GatewayServerError::Transport("http bind failed".to_string()))?;
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|_| GatewayServerError::Transport("http server failed".to_string()))
    }
}

// ============================================================================
// SECTION: Request & Response Payloads
// ============================================================================

/// Query parameters for the resource endpoint.
#[derive(Debug, Deserialize)]
struct ResourceQuery {
    /// Logical path: `root/relative/path`.
    path: Option<String>,
}

/// Login request payload.
#[derive(Debug, Deserialize)]
struct LoginRequest {
    /// Operator username.
    username: String,
    /// Operator password.
    password: String,
}

/// Login success payload.
#[derive(Debug, Serialize)]
struct LoginResponse {
    /// Always true on success.
    success: bool,
}

/// Error payload returned to callers.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Caller-facing error message.
    error: String,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Serves a sandboxed resource by logical path.
async fn get_resource(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<ResourceQuery>,
) -> Response {
    let logical = query.path.unwrap_or_default();
    let resource = match state.roots.resolve(&logical) {
        Ok(resource) => resource,
        Err(err) => {
            state.audit.record(
                &AccessAuditEvent::denied(Boundary::Resource, &logical, &err)
                    .with_peer_ip(peer.ip().to_string()),
            );
            return error_response(&err);
        }
    };
    let max_bytes = state.max_file_bytes;
    let read_target = resource.clone();
    let read_result =
        tokio::task::spawn_blocking(move || read_resource_limited(&read_target, max_bytes)).await;
    let bytes = match read_result {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(err)) => {
            state.audit.record(
                &AccessAuditEvent::denied(Boundary::Resource, &logical, &err)
                    .with_peer_ip(peer.ip().to_string()),
            );
            return error_response(&err);
        }
        Err(_) => {
            let err = GatewayError::Internal {
                detail: "resource read task failed".to_string(),
            };
            return error_response(&err);
        }
    };
    state.audit.record(
        &AccessAuditEvent::allowed(Boundary::Resource, &logical)
            .with_peer_ip(peer.ip().to_string()),
    );
    // Only the resolved base name is reflected into headers, never the
    // caller-supplied path.
    let file_name: String =
        resource.file_name.chars().filter(|c| *c != '"' && !c.is_control()).collect();
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        bytes,
    )
        .into_response()
}

/// Issues a session cookie for a configured operator.
async fn post_session(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(login): Json<LoginRequest>,
) -> Response {
    let matched = state.operators.iter().find(|operator| {
        operator.username == login.username
            && gatehouse_core::constant_time_eq_str(&operator.password, &login.password)
    });
    let Some(operator) = matched else {
        let err = GatewayError::Unauthenticated("invalid credentials".to_string());
        state.audit.record(
            &AccessAuditEvent::denied(Boundary::Session, "/session", &err)
                .with_peer_ip(peer.ip().to_string()),
        );
        return error_response(&err);
    };
    let token = match state.sessions.issue(&operator.username, operator.role) {
        Ok(token) => token,
        Err(err) => return error_response(&err),
    };
    state.audit.record(
        &AccessAuditEvent::allowed(Boundary::Session, "/session")
            .with_subject(operator.username.clone())
            .with_peer_ip(peer.ip().to_string()),
    );
    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        state.session_ttl_secs
    );
    (
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            success: true,
        }),
    )
        .into_response()
}

/// Serves an admin page to a session-authenticated admin.
async fn get_admin_page(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(page): Path<String>,
    headers: HeaderMap,
) -> Response {
    let target = format!("/admin/{page}");
    let claims = match authorize_admin(&state, &headers) {
        Ok(claims) => claims,
        Err(err) => {
            state.audit.record(
                &AccessAuditEvent::denied(Boundary::Session, &target, &err)
                    .with_peer_ip(peer.ip().to_string()),
            );
            return error_response(&err);
        }
    };
    state.audit.record(
        &AccessAuditEvent::allowed(Boundary::Session, &target)
            .with_subject(claims.sub.clone())
            .with_peer_ip(peer.ip().to_string()),
    );
    match page.as_str() {
        "dashboard" => Json(serde_json::json!({
            "page": "dashboard",
            "subject": claims.sub,
            "role": claims.role.as_str(),
        }))
        .into_response(),
        "reports" => Json(serde_json::json!({
            "page": "reports",
            "roots": state.roots.root_names(),
        }))
        .into_response(),
        _ => error_response(&GatewayError::NotFound("page not found".to_string())),
    }
}

/// Dispatches a credentialed call to the internal origin.
async fn post_internal_call(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(descriptor): Json<CallDescriptor>,
) -> Response {
    let claims = match authorize_admin(&state, &headers) {
        Ok(claims) => claims,
        Err(err) => {
            state.audit.record(
                &AccessAuditEvent::denied(Boundary::Proxy, "/internal-call", &err)
                    .with_peer_ip(peer.ip().to_string()),
            );
            return error_response(&err);
        }
    };
    match state.proxy.call(&descriptor).await {
        Ok(upstream) => {
            state.audit.record(
                &AccessAuditEvent::allowed(Boundary::Proxy, "/internal-call")
                    .with_subject(claims.sub.clone())
                    .with_peer_ip(peer.ip().to_string()),
            );
            Json(upstream).into_response()
        }
        Err(err) => {
            state.audit.record(
                &AccessAuditEvent::denied(Boundary::Proxy, "/internal-call", &err)
                    .with_subject(claims.sub.clone())
                    .with_peer_ip(peer.ip().to_string()),
            );
            error_response(&err)
        }
    }
}

/// Reports gateway status to a credentialed service caller.
async fn get_service_status(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let auth_header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    if let Err(err) = state.token_gate.authorize(auth_header) {
        state.audit.record(
            &AccessAuditEvent::denied(Boundary::TokenGate, "/service/status", &err)
                .with_peer_ip(peer.ip().to_string()),
        );
        return error_response(&err);
    }
    state.audit.record(
        &AccessAuditEvent::allowed(Boundary::TokenGate, "/service/status")
            .with_peer_ip(peer.ip().to_string()),
    );
    Json(serde_json::json!({
        "status": "ok",
        "service": "gatehouse",
    }))
    .into_response()
}

/// Liveness endpoint; reports no secrets.
async fn get_healthz() -> Response {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "gatehouse",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

/// Uniform JSON 404 for unknown routes.
async fn fallback_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "not found".to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Verifies the session cookie and requires the admin role.
fn authorize_admin(state: &AppState, headers: &HeaderMap) -> Result<SessionClaims, GatewayError> {
    let token = session_cookie(headers)
        .ok_or_else(|| GatewayError::Unauthenticated("authentication required".to_string()))?;
    let claims = state.sessions.verify(&token)?;
    require_role(&claims, Role::Admin)?;
    Ok(claims)
}

/// Extracts the session token from the Cookie header.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(COOKIE) {
        let Ok(text) = value.to_str() else {
            continue;
        };
        for pair in text.split(';') {
            if let Some(token) =
                pair.trim().strip_prefix(SESSION_COOKIE).and_then(|rest| rest.strip_prefix('='))
            {
                return Some(token.to_string());
            }
        }
    }
    None
}

/// Maps a gateway error to its HTTP response.
fn error_response(error: &GatewayError) -> Response {
    let status = match error {
        GatewayError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
        GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
        GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::Upstream {
            ..
        } => StatusCode::BAD_GATEWAY,
        GatewayError::Internal {
            ..
        } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            // Display output for upstream/internal variants is generic; the
            // audit detail never reaches the caller.
            error: error.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway server errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
