//! HTTP transport implementation using reqwest

use crate::executor::transport::{InvocationTransport, TransportError};
use crate::registry::record::ResolvedRoute;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum response size (10MB)
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("modelroute/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP transport with connection pooling
#[derive(Clone)]
pub struct HttpTransport {
    client: Arc<Client>,
}

impl HttpTransport {
    /// Create a transport with default pooling and timeouts
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(Duration::from_secs(10), 10)
    }

    /// Create a transport with custom connect timeout and pool size.
    /// Per-attempt request timeouts come from the caller on each invoke.
    pub fn with_config(
        connect_timeout: Duration,
        max_idle_per_host: usize,
    ) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| TransportError::Network {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Merge route extra parameters into the payload. Caller-supplied
    /// payload fields win; extra parameters never overwrite them.
    fn build_body(route: &ResolvedRoute, payload: &Value) -> Value {
        let mut body = serde_json::Map::new();
        body.insert("model".to_string(), Value::String(route.model.clone()));
        for (key, value) in &route.extra_params {
            body.insert(key.clone(), value.clone());
        }
        if let Value::Object(fields) = payload {
            for (key, value) in fields {
                body.insert(key.clone(), value.clone());
            }
        } else if !payload.is_null() {
            body.insert("input".to_string(), payload.clone());
        }
        Value::Object(body)
    }
}

/// Map an HTTP status code to a transport error
pub fn error_from_status(status: u16, body: Option<&str>) -> TransportError {
    match status {
        401 | 403 => TransportError::Auth,
        429 => TransportError::RateLimited {
            retry_after: parse_retry_after(body),
        },
        408 | 504 => TransportError::Timeout,
        400..=499 => TransportError::InvalidRequest {
            message: body.unwrap_or("bad request").to_string(),
        },
        500..=599 => TransportError::Server {
            status,
            message: body.unwrap_or("internal server error").to_string(),
        },
        _ => TransportError::Network {
            message: format!("unexpected status {}", status),
        },
    }
}

/// Pull a retry-after value (in seconds) out of an error body
fn parse_retry_after(body: Option<&str>) -> Option<Duration> {
    let body = body?;
    if !body.contains("retry_after") && !body.contains("retry-after") {
        return None;
    }
    for part in body.split(|c: char| !c.is_ascii_digit()) {
        if let Ok(seconds) = part.parse::<u64>() {
            if seconds > 0 && seconds < 3_600 {
                return Some(Duration::from_secs(seconds));
            }
        }
    }
    None
}

#[async_trait]
impl InvocationTransport for HttpTransport {
    async fn invoke(
        &self,
        route: &ResolvedRoute,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        let body = Self::build_body(route, payload);
        debug!(provider_id = %route.provider_id, endpoint = %route.endpoint, "invoking backend");

        let mut request = self
            .client
            .post(&route.endpoint)
            .timeout(timeout)
            .json(&body);
        if !route.credential.is_empty() {
            request = request.bearer_auth(route.credential.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        if let Some(length) = response.content_length() {
            if length > MAX_RESPONSE_SIZE {
                return Err(TransportError::Network {
                    message: format!("response size {} exceeds maximum {}", length, MAX_RESPONSE_SIZE),
                });
            }
        }

        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            warn!(provider_id = %route.provider_id, status, "backend returned error status");
            return Err(error_from_status(status, Some(&body)));
        }

        response.json().await.map_err(|e| TransportError::Network {
            message: format!("invalid response body: {}", e),
        })
    }
}
