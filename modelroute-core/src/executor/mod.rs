//! Invocation execution: transport seam, retry pacing, fallback swap

pub mod http;
pub mod invoke;
pub mod retry;
pub mod transport;

pub use http::HttpTransport;
pub use invoke::{
    FallbackExecutor, FallbackPolicy, InvocationError, InvocationOutcome, ProviderAttempt,
};
pub use retry::RetryPolicy;
pub use transport::{InvocationTransport, TransportError};
