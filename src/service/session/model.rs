/// Working set for one user: uploaded image bytes plus the pending prompt.
///
/// Lives only in process memory. Created lazily on first touch, dropped on
/// /clear or after a successful generation.
#[derive(Debug, Clone, Default)]
pub struct UserSession {
    pub images: Vec<Vec<u8>>,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub images: usize,
    pub max_images: usize,
    pub prompt: Option<String>,
}
