mod error;
mod model;

pub use error::SessionError;
pub use model::{SessionStatus, UserSession};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use teloxide::types::UserId;

/// Per-user upload state and the per-user generation lock.
///
/// All operations are synchronous map mutations; no shard lock is ever held
/// across an await point.
#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<DashMap<UserId, UserSession>>,
    locks: Arc<DashMap<UserId, ()>>,
    max_images: usize,
}

impl SessionService {
    pub fn new(max_images: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            locks: Arc::new(DashMap::new()),
            max_images,
        }
    }

    pub fn max_images(&self) -> usize {
        self.max_images
    }

    /// Appends an image and returns its 1-based position. An upload beyond
    /// the cap is rejected, never truncated.
    pub fn add_image(&self, user_id: UserId, bytes: Vec<u8>) -> Result<usize, SessionError> {
        let mut session = self.sessions.entry(user_id).or_default();

        if session.images.len() >= self.max_images {
            return Err(SessionError::LimitExceeded { max: self.max_images });
        }

        session.images.push(bytes);
        Ok(session.images.len())
    }

    pub fn set_prompt(&self, user_id: UserId, prompt: &str) {
        self.sessions.entry(user_id).or_default().prompt = Some(prompt.to_string());
    }

    /// Cloned view of the session, decoupled from later writes.
    pub fn snapshot(&self, user_id: UserId) -> UserSession {
        self.sessions
            .get(&user_id)
            .map(|session| session.clone())
            .unwrap_or_default()
    }

    pub fn image_count(&self, user_id: UserId) -> usize {
        self.sessions.get(&user_id).map(|session| session.images.len()).unwrap_or(0)
    }

    pub fn status(&self, user_id: UserId) -> SessionStatus {
        let session = self.snapshot(user_id);
        SessionStatus {
            images: session.images.len(),
            max_images: self.max_images,
            prompt: session.prompt,
        }
    }

    pub fn reset(&self, user_id: UserId) {
        self.sessions.remove(&user_id);
    }

    /// Non-blocking acquire of the per-user generation lock. Returns `None`
    /// when a generation is already running for this user; the caller must
    /// reject, not queue.
    pub fn try_begin_generation(&self, user_id: UserId) -> Option<GenerationGuard> {
        match self.locks.entry(user_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(GenerationGuard {
                    locks: Arc::clone(&self.locks),
                    user_id,
                })
            }
        }
    }

    pub fn is_generating(&self, user_id: UserId) -> bool {
        self.locks.contains_key(&user_id)
    }
}

/// Holds the generation lock for one user; releases it on drop, so the lock
/// cannot leak on early returns or generator failures.
pub struct GenerationGuard {
    locks: Arc<DashMap<UserId, ()>>,
    user_id: UserId,
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.locks.remove(&self.user_id);
    }
}
