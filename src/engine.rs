use crate::error::CompletionError;
use async_trait::async_trait;

/// A text-completion capability: one prompt in, the first candidate's text out.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
