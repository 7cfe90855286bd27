//! Invocation transport seam
//!
//! The engine never talks to a backend directly; it hands a resolved
//! route and payload to an `InvocationTransport`. Transport errors carry
//! the transient/fatal distinction the retry loop keys on.

use crate::registry::record::ResolvedRoute;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Errors a transport can produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransportError {
    /// Rate limit exceeded, retry after the hinted duration
    RateLimited { retry_after: Option<Duration> },

    /// Attempt timed out
    Timeout,

    /// Temporary server error (5xx)
    Server { status: u16, message: String },

    /// Generic network failure
    Network { message: String },

    /// Authentication failure; never retried
    Auth,

    /// Malformed request (4xx); never retried
    InvalidRequest { message: String },

    /// Caller cancelled the attempt; counts toward nothing
    Cancelled,
}

impl TransportError {
    /// Whether the retry loop may try again after this error
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Timeout => true,
            Self::Server { .. } => true,
            Self::Network { .. } => true,
            Self::Auth => false,
            Self::InvalidRequest { .. } => false,
            Self::Cancelled => false,
        }
    }

    /// Server-suggested delay before the next attempt
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited { retry_after } => match retry_after {
                Some(delay) => write!(f, "rate limited, retry after {:?}", delay),
                None => write!(f, "rate limited"),
            },
            Self::Timeout => write!(f, "attempt timed out"),
            Self::Server { status, message } => write!(f, "server error ({}): {}", status, message),
            Self::Network { message } => write!(f, "network error: {}", message),
            Self::Auth => write!(f, "authentication failed"),
            Self::InvalidRequest { message } => write!(f, "invalid request: {}", message),
            Self::Cancelled => write!(f, "cancelled by caller"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Performs the actual model invocation for a resolved route
#[async_trait]
pub trait InvocationTransport: Send + Sync {
    /// Invoke the backend behind `route` with `payload`. `timeout`
    /// bounds this single attempt; an elapsed timeout surfaces as
    /// `TransportError::Timeout` and is treated as transient.
    async fn invoke(
        &self,
        route: &ResolvedRoute,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::Timeout.is_transient());
        assert!(TransportError::RateLimited { retry_after: None }.is_transient());
        assert!(TransportError::Server {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());
        assert!(TransportError::Network {
            message: "reset".into()
        }
        .is_transient());

        assert!(!TransportError::Auth.is_transient());
        assert!(!TransportError::InvalidRequest {
            message: "bad".into()
        }
        .is_transient());
        assert!(!TransportError::Cancelled.is_transient());
    }

    #[test]
    fn test_retry_hint_only_from_rate_limit() {
        let hinted = TransportError::RateLimited {
            retry_after: Some(Duration::from_secs(5)),
        };
        assert_eq!(hinted.retry_hint(), Some(Duration::from_secs(5)));
        assert_eq!(TransportError::Timeout.retry_hint(), None);
    }
}
