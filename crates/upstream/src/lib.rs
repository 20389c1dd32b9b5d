mod client;
mod error;
mod fake;
mod http;
mod normalize;
mod retry;

pub use client::UpstreamClient;
pub use error::{Result, UpstreamError};
pub use fake::InMemoryUpstream;
pub use http::{ReportApiClient, ReportApiConfig};
pub use retry::RetryPolicy;
