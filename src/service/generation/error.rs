#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("No image returned by model (blocked/empty output)")]
    EmptyOutput,
    #[error("Image service request timed out")]
    Timeout,
    #[error("Image service request failed: {0}")]
    Http(reqwest::Error),
    #[error("Image service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Unexpected image service response: {0}")]
    InvalidResponse(String),
    #[error("Invalid image payload in response: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl From<reqwest::Error> for GenerationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Http(error)
        }
    }
}
