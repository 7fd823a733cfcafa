#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Max {max} images reached")]
    LimitExceeded { max: usize },
}
