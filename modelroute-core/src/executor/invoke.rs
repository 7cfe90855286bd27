//! Fallback executor: bounded retries and a single fallback swap
//!
//! Wraps an invocation attempt against a resolved route. Transient
//! failures retry on the original provider up to `max_retries` extra
//! attempts; exhaustion swaps to the configured fallback provider for
//! exactly one attempt. Fatal failures and cancellation short-circuit
//! everything.

use crate::executor::retry::RetryPolicy;
use crate::executor::transport::{InvocationTransport, TransportError};
use crate::registry::record::ResolvedRoute;
use crate::registry::store::ProviderRegistry;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Runtime fallback configuration for one invocation pass
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    /// Whether the fallback swap is allowed at all
    pub enabled: bool,

    /// Provider substituted after primary exhaustion
    pub provider_id: Option<String>,

    /// Retries on the primary after the initial attempt
    pub max_retries: u32,

    /// Pacing between primary attempts
    pub retry: RetryPolicy,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            provider_id: None,
            max_retries: 3,
            retry: RetryPolicy::default(),
        }
    }
}

/// One attempt in the failure chain
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider_id: String,
    pub error: TransportError,
}

impl fmt::Display for ProviderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider_id, self.error)
    }
}

/// Terminal failure of an invocation pass
#[derive(Debug)]
pub enum InvocationError {
    /// The caller cancelled the in-flight attempt. Counts toward
    /// nothing and never triggers the fallback swap.
    Cancelled,

    /// Every allowed attempt failed
    Failed {
        /// Ordered chain of attempts, one entry per attempt made
        attempts: Vec<ProviderAttempt>,
        /// Whether the fallback path was attempted
        fallback_attempted: bool,
    },
}

impl InvocationError {
    /// Distinct provider ids in attempt order
    pub fn attempted_providers(&self) -> Vec<String> {
        match self {
            Self::Cancelled => Vec::new(),
            Self::Failed { attempts, .. } => {
                let mut ids = Vec::new();
                for attempt in attempts {
                    if !ids.contains(&attempt.provider_id) {
                        ids.push(attempt.provider_id.clone());
                    }
                }
                ids
            }
        }
    }
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "invocation cancelled by caller"),
            Self::Failed {
                attempts,
                fallback_attempted,
            } => {
                write!(
                    f,
                    "invocation failed after {} attempts (fallback attempted: {}): ",
                    attempts.len(),
                    fallback_attempted
                )?;
                for (i, attempt) in attempts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", attempt)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for InvocationError {}

/// Successful invocation result with routing metadata
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    /// Backend response
    pub response: Value,

    /// Provider that ultimately served the call
    pub provider_id: String,

    /// Whether the fallback provider served it
    pub used_fallback: bool,

    /// Total attempts made, fallback included
    pub attempts: u32,
}

/// Executes invocations with bounded retries and fallback
pub struct FallbackExecutor {
    transport: Arc<dyn InvocationTransport>,
    registry: Arc<ProviderRegistry>,
}

impl FallbackExecutor {
    /// Create an executor over a transport and the registry
    pub fn new(transport: Arc<dyn InvocationTransport>, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            transport,
            registry,
        }
    }

    /// Run one invocation pass for `route`.
    ///
    /// At most `max_retries + 1` attempts hit the primary provider and
    /// at most one attempt hits the fallback, for any failure pattern.
    pub async fn invoke(
        &self,
        route: &ResolvedRoute,
        payload: &Value,
        timeout: Duration,
        policy: &FallbackPolicy,
    ) -> Result<InvocationOutcome, InvocationError> {
        let mut attempts: Vec<ProviderAttempt> = Vec::new();

        let max_primary_attempts = policy.max_retries + 1;
        for attempt in 0..max_primary_attempts {
            match self.attempt(route, payload, timeout).await {
                Ok(response) => {
                    return Ok(InvocationOutcome {
                        response,
                        provider_id: route.provider_id.clone(),
                        used_fallback: false,
                        attempts: attempt + 1,
                    });
                }
                Err(TransportError::Cancelled) => return Err(InvocationError::Cancelled),
                Err(error) => {
                    debug!(
                        provider_id = %route.provider_id,
                        attempt = attempt + 1,
                        %error,
                        "invocation attempt failed"
                    );
                    let transient = error.is_transient();
                    attempts.push(ProviderAttempt {
                        provider_id: route.provider_id.clone(),
                        error: error.clone(),
                    });

                    if !transient {
                        // Auth failures and malformed requests propagate
                        // immediately; the fallback swap must not fire.
                        return Err(InvocationError::Failed {
                            attempts,
                            fallback_attempted: false,
                        });
                    }

                    if attempt + 1 < max_primary_attempts {
                        let delay = policy.retry.delay_for(attempt, &error);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        // Primary exhausted on transient failures; one fallback attempt.
        if policy.enabled {
            if let Some(fallback_route) = self.fallback_route(route, policy) {
                warn!(
                    primary = %route.provider_id,
                    fallback = %fallback_route.provider_id,
                    "primary exhausted, swapping to fallback provider"
                );
                match self.attempt(&fallback_route, payload, timeout).await {
                    Ok(response) => {
                        return Ok(InvocationOutcome {
                            response,
                            provider_id: fallback_route.provider_id.clone(),
                            used_fallback: true,
                            attempts: max_primary_attempts + 1,
                        });
                    }
                    Err(TransportError::Cancelled) => return Err(InvocationError::Cancelled),
                    Err(error) => {
                        attempts.push(ProviderAttempt {
                            provider_id: fallback_route.provider_id.clone(),
                            error,
                        });
                        return Err(InvocationError::Failed {
                            attempts,
                            fallback_attempted: true,
                        });
                    }
                }
            }
        }

        Err(InvocationError::Failed {
            attempts,
            fallback_attempted: false,
        })
    }

    /// One attempt, bounded by the caller-supplied timeout. An elapsed
    /// timeout surfaces as transient `Timeout` even when the transport
    /// does not enforce it itself.
    async fn attempt(
        &self,
        route: &ResolvedRoute,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        match tokio::time::timeout(timeout, self.transport.invoke(route, payload, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// Resolve the fallback provider to a route, preserving the
    /// original tier and degradation flag
    fn fallback_route(
        &self,
        original: &ResolvedRoute,
        policy: &FallbackPolicy,
    ) -> Option<ResolvedRoute> {
        let id = policy.provider_id.as_deref()?;
        let record = self.registry.get(id)?;
        if !record.is_valid {
            warn!(fallback = %id, "configured fallback provider is not valid; skipping swap");
            return None;
        }
        let mut route = ResolvedRoute::from_record(&record, original.cost_tier);
        route.degraded = original.degraded;
        Some(route)
    }
}
