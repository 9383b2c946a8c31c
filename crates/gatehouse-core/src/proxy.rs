// crates/gatehouse-core/src/proxy.rs
// ============================================================================
// Module: Credentialed Proxy
// Description: Forwards admin calls to the internal origin with a scoped credential.
// Purpose: Keep the service credential bound to the origin it was issued for.
// Dependencies: reqwest, url, serde
// ============================================================================

//! ## Overview
//! The proxy accepts an outbound call descriptor from an admin-authorized
//! caller and dispatches it against the fixed internal origin. The service
//! credential rides as a bearer header on the first hop only. Automatic
//! redirect following in the HTTP client is disabled; hops are walked
//! manually, and on each hop the credential is attached only when the hop's
//! origin (scheme, host, port) equals the internal origin. Cross-origin hops
//! are followed without any credential-bearing headers, and the default hop
//! limit of zero returns redirects to the caller verbatim.
//!
//! Upstream transport failures surface as a generic upstream error; the raw
//! error text stays in the audit detail.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::error::GatewayError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the credentialed proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Fixed internal origin; never caller-controlled.
    pub internal_origin: Url,
    /// Service credential attached to same-origin hops.
    pub credential: String,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Overall request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum manual redirect hops. Zero returns redirects verbatim.
    pub max_redirects: u32,
    /// Maximum upstream response size in bytes.
    pub max_response_bytes: usize,
    /// User agent for outbound requests.
    pub user_agent: String,
}

// ============================================================================
// SECTION: Call Descriptor
// ============================================================================

/// Outbound call descriptor supplied by an authenticated admin caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CallDescriptor {
    /// HTTP method; defaults to GET.
    pub method: Option<String>,
    /// Target path on the internal origin.
    pub path: Option<String>,
    /// Optional request body, sent on the first hop only.
    pub body: Option<String>,
}

/// Upstream response returned verbatim to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamResponse {
    /// Upstream status code.
    pub status: u16,
    /// Upstream response headers (UTF-8 values only).
    pub headers: BTreeMap<String, String>,
    /// Upstream response body.
    pub body: String,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// HTTP client for credentialed calls to the internal origin.
pub struct InternalApiClient {
    /// Proxy configuration, including origin and hop policy.
    config: ProxyConfig,
    /// Underlying HTTP client with automatic redirects disabled.
    client: Client,
}

impl InternalApiClient {
    /// Builds a client with bounded timeouts and redirects disabled.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: ProxyConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| GatewayError::Internal {
                detail: format!("proxy client build failed: {err}"),
            })?;
        Ok(Self {
            config,
            client,
        })
    }

    /// Dispatches a call descriptor against the internal origin.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BadRequest`] for malformed descriptors and
    /// [`GatewayError::Upstream`] when the internal call fails or times out.
    pub async fn call(&self, descriptor: &CallDescriptor) -> Result<UpstreamResponse, GatewayError> {
        let method = parse_method(descriptor.method.as_deref())?;
        let path = descriptor
            .path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .ok_or_else(|| GatewayError::BadRequest("target path required".to_string()))?;
        if !path.starts_with('/') {
            return Err(GatewayError::BadRequest("target path must be absolute".to_string()));
        }
        let url = self.config.internal_origin.join(path).map_err(|_| {
            GatewayError::BadRequest("invalid target path".to_string())
        })?;
        // A crafted path such as `//evil.example/x` re-targets the authority
        // during join; the first hop must stay on the internal origin.
        if !same_origin(&url, &self.config.internal_origin) {
            return Err(GatewayError::BadRequest("invalid target path".to_string()));
        }
        self.dispatch(method, url, descriptor.body.as_deref()).await
    }

    /// Walks the request and any manual redirect hops.
    async fn dispatch(
        &self,
        method: Method,
        first_url: Url,
        body: Option<&str>,
    ) -> Result<UpstreamResponse, GatewayError> {
        let mut url = first_url;
        let mut hop: u32 = 0;
        loop {
            let first_hop = hop == 0;
            let attach_credential = same_origin(&url, &self.config.internal_origin);
            let mut request = if first_hop {
                let mut request = self.client.request(method.clone(), url.clone());
                if let Some(body) = body {
                    request = request
                        .header(CONTENT_TYPE, "application/json")
                        .body(body.to_string());
                }
                request
            } else {
                // Redirect hops degrade to a bodiless GET.
                self.client.request(Method::GET, url.clone())
            };
            if attach_credential {
                request = request.bearer_auth(&self.config.credential);
            }
            let response = request.send().await.map_err(map_transport_error)?;

            let status = response.status();
            if status.is_redirection() && hop < self.config.max_redirects {
                if let Some(next) = redirect_target(&url, response.headers().get(LOCATION)) {
                    url = next;
                    hop += 1;
                    continue;
                }
            }

            let mut headers = BTreeMap::new();
            for (name, value) in response.headers() {
                if let Ok(value) = value.to_str() {
                    headers.insert(name.as_str().to_string(), value.to_string());
                }
            }
            let body = read_body_limited(response, self.config.max_response_bytes).await?;
            return Ok(UpstreamResponse {
                status: status.as_u16(),
                headers,
                body,
            });
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and restricts the descriptor method to known verbs.
fn parse_method(method: Option<&str>) -> Result<Method, GatewayError> {
    let label = method.map_or("GET", str::trim);
    match label.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        "PATCH" => Ok(Method::PATCH),
        "HEAD" => Ok(Method::HEAD),
        _ => Err(GatewayError::BadRequest("unsupported method".to_string())),
    }
}

/// Returns whether two URLs share scheme, host, and effective port.
fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Resolves the redirect target from a Location header value.
fn redirect_target(current: &Url, location: Option<&reqwest::header::HeaderValue>) -> Option<Url> {
    let location = location?.to_str().ok()?;
    current.join(location).ok()
}

/// Maps transport failures to the generic upstream error.
fn map_transport_error(err: reqwest::Error) -> GatewayError {
    let detail = if err.is_timeout() {
        "upstream timeout".to_string()
    } else {
        format!("upstream request failed: {err}")
    };
    GatewayError::Upstream {
        detail,
    }
}

/// Reads the response body while enforcing a byte limit.
async fn read_body_limited(
    mut response: reqwest::Response,
    max_bytes: usize,
) -> Result<String, GatewayError> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(map_transport_error)? {
        if buf.len().saturating_add(chunk.len()) > max_bytes {
            return Err(GatewayError::Upstream {
                detail: "upstream response exceeds size limit".to_string(),
            });
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf).map_err(|_| GatewayError::Upstream {
        detail: "upstream response is not utf-8".to_string(),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
