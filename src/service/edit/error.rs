use crate::service::generation::GenerationError;
use crate::service::session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("No images uploaded yet")]
    NoImages,
    #[error("A generation is already in progress")]
    Busy,
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}
