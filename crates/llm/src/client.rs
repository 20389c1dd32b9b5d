use async_trait::async_trait;
use futures::stream::BoxStream;
use runsight_protocol::IntentClassification;

use crate::error::Result;
use crate::prompt::Prompt;

/// Incremental completion output, one item per model token boundary.
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Language model adapter consumed by the core.
///
/// Implementations carry their own bounded timeout; callers treat a timeout
/// as upstream unavailability, never as partial output.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Full completion in one round trip.
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    /// Streaming completion; chunk boundaries align with the provider's
    /// token boundaries and are passed through verbatim.
    async fn complete_streaming(&self, prompt: &Prompt) -> Result<TokenStream>;

    /// Classify a natural-language question into intent + raw filters with a
    /// confidence score. `context` carries a rendering of the session's last
    /// structured query, when one exists.
    async fn classify_intent(
        &self,
        text: &str,
        context: Option<&str>,
    ) -> Result<IntentClassification>;
}
