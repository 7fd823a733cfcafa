mod client;
mod error;

pub use client::GeminiClient;
pub use error::GenerationError;

use async_trait::async_trait;

/// External image-editing model. `images` is ordered: the first entry is the
/// base to edit, any further entries are reference material.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, images: &[Vec<u8>]) -> Result<Vec<u8>, GenerationError>;
}
