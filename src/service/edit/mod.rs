mod error;

pub use error::EditError;

use std::sync::Arc;

use teloxide::types::UserId;

use crate::service::generation::ImageGenerator;
use crate::service::session::{GenerationGuard, SessionService, SessionStatus};
use crate::utils::image::downscale_to_fit;

/// Drives the upload-then-prompt protocol: collect images, accept a prompt,
/// call the generator, deliver or fail. The session resets once the result
/// is confirmed delivered; failures keep it so the user can retry without
/// re-uploading.
#[derive(Clone)]
pub struct EditService {
    session: SessionService,
    generator: Arc<dyn ImageGenerator>,
    max_image_side: u32,
}

impl EditService {
    pub fn new(session: SessionService, generator: Arc<dyn ImageGenerator>, max_image_side: u32) -> Self {
        Self {
            session,
            generator,
            max_image_side,
        }
    }

    pub fn max_images(&self) -> usize {
        self.session.max_images()
    }

    pub fn add_image(&self, user_id: UserId, bytes: Vec<u8>) -> Result<usize, EditError> {
        Ok(self.session.add_image(user_id, bytes)?)
    }

    pub fn status(&self, user_id: UserId) -> SessionStatus {
        self.session.status(user_id)
    }

    pub fn clear(&self, user_id: UserId) {
        self.session.reset(user_id);
    }

    pub fn is_generating(&self, user_id: UserId) -> bool {
        self.session.is_generating(user_id)
    }

    /// Runs one generation for the user. The per-user lock is acquired here
    /// and released on every exit path; on success it travels with the
    /// returned [`CompletedEdit`] so the generate-deliver-reset sequence
    /// stays exclusive.
    ///
    /// A rejected attempt (`NoImages`, `Busy`) leaves the session untouched;
    /// in particular a `Busy` rejection does not overwrite the prompt of the
    /// generation already in flight. A generator failure keeps the session
    /// for a retry.
    pub async fn submit_prompt(&self, user_id: UserId, prompt: &str) -> Result<CompletedEdit, EditError> {
        if self.session.image_count(user_id) == 0 {
            return Err(EditError::NoImages);
        }

        let guard = match self.session.try_begin_generation(user_id) {
            Some(guard) => guard,
            None => return Err(EditError::Busy),
        };

        self.session.set_prompt(user_id, prompt);
        let snapshot = self.session.snapshot(user_id);

        // The session may have been cleared between the count check and the
        // lock acquisition.
        if snapshot.images.is_empty() {
            return Err(EditError::NoImages);
        }

        let images: Vec<Vec<u8>> = snapshot
            .images
            .iter()
            .map(|bytes| downscale_to_fit(bytes, self.max_image_side).unwrap_or_else(|| bytes.clone()))
            .collect();

        let output = self.generator.generate(prompt, &images).await?;

        Ok(CompletedEdit {
            session: self.session.clone(),
            user_id,
            output,
            _guard: guard,
        })
    }
}

/// A finished generation whose result has not reached the user yet.
///
/// The session is cleared only by [`CompletedEdit::confirm_delivered`];
/// dropping the value instead keeps images and prompt, so a failed delivery
/// still allows a retry without re-uploading. The per-user lock is released
/// either way.
pub struct CompletedEdit {
    session: SessionService,
    user_id: UserId,
    pub output: Vec<u8>,
    _guard: GenerationGuard,
}

impl CompletedEdit {
    /// Marks the result as delivered and resets the session.
    pub fn confirm_delivered(self) {
        self.session.reset(self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::generation::GenerationError;
    use crate::service::session::SessionError;

    use async_trait::async_trait;
    use image::{GenericImageView, ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    const USER: UserId = UserId(77);

    fn encoded_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([80, 140, 20]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    struct StaticGenerator(Vec<u8>);

    #[async_trait]
    impl ImageGenerator for StaticGenerator {
        async fn generate(&self, _prompt: &str, _images: &[Vec<u8>]) -> Result<Vec<u8>, GenerationError> {
            Ok(self.0.clone())
        }
    }

    struct FlakyGenerator {
        failures_left: AtomicUsize,
        output: Vec<u8>,
    }

    #[async_trait]
    impl ImageGenerator for FlakyGenerator {
        async fn generate(&self, _prompt: &str, _images: &[Vec<u8>]) -> Result<Vec<u8>, GenerationError> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(GenerationError::EmptyOutput);
            }
            Ok(self.output.clone())
        }
    }

    struct BlockingGenerator {
        release: Arc<Notify>,
        output: Vec<u8>,
    }

    #[async_trait]
    impl ImageGenerator for BlockingGenerator {
        async fn generate(&self, _prompt: &str, _images: &[Vec<u8>]) -> Result<Vec<u8>, GenerationError> {
            self.release.notified().await;
            Ok(self.output.clone())
        }
    }

    #[derive(Default)]
    struct CapturingGenerator {
        seen: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl ImageGenerator for CapturingGenerator {
        async fn generate(&self, _prompt: &str, images: &[Vec<u8>]) -> Result<Vec<u8>, GenerationError> {
            self.seen.lock().unwrap().extend(images.iter().cloned());
            Ok(vec![0xAA])
        }
    }

    fn service_with(generator: Arc<dyn ImageGenerator>) -> (SessionService, EditService) {
        let session = SessionService::new(3);
        let edit = EditService::new(session.clone(), generator, 1536);
        (session, edit)
    }

    #[tokio::test]
    async fn prompt_without_images_is_rejected_and_session_untouched() {
        let (session, edit) = service_with(Arc::new(StaticGenerator(vec![1])));

        let result = edit.submit_prompt(USER, "make it blue").await;

        assert!(matches!(result, Err(EditError::NoImages)));
        let snapshot = session.snapshot(USER);
        assert!(snapshot.images.is_empty());
        assert_eq!(snapshot.prompt, None);
        assert!(!session.is_generating(USER));
    }

    #[tokio::test]
    async fn confirmed_delivery_resets_the_session() {
        let (session, edit) = service_with(Arc::new(StaticGenerator(vec![9, 9, 9])));
        edit.add_image(USER, encoded_png(32, 32)).unwrap();

        let done = edit.submit_prompt(USER, "add sunglasses").await.unwrap();
        assert_eq!(done.output, vec![9, 9, 9]);

        // session and lock are held until delivery is confirmed
        assert_eq!(session.image_count(USER), 1);
        assert!(session.is_generating(USER));

        done.confirm_delivered();

        let status = edit.status(USER);
        assert_eq!(status.images, 0);
        assert_eq!(status.prompt, None);
        assert!(!session.is_generating(USER));
    }

    #[tokio::test]
    async fn undelivered_result_keeps_session_for_retry() {
        let (session, edit) = service_with(Arc::new(StaticGenerator(vec![1, 2])));
        edit.add_image(USER, encoded_png(32, 32)).unwrap();

        let done = edit.submit_prompt(USER, "warmer light").await.unwrap();
        drop(done);

        assert_eq!(session.image_count(USER), 1);
        assert_eq!(session.snapshot(USER).prompt.as_deref(), Some("warmer light"));
        assert!(!session.is_generating(USER));

        let retry = edit.submit_prompt(USER, "warmer light").await.unwrap();
        retry.confirm_delivered();
        assert_eq!(session.image_count(USER), 0);
    }

    #[tokio::test]
    async fn failure_keeps_session_and_allows_retry_without_reupload() {
        let (session, edit) = service_with(Arc::new(FlakyGenerator {
            failures_left: AtomicUsize::new(1),
            output: vec![4, 2],
        }));
        edit.add_image(USER, encoded_png(32, 32)).unwrap();

        let first = edit.submit_prompt(USER, "remove background").await;
        assert!(matches!(
            first,
            Err(EditError::Generation(GenerationError::EmptyOutput))
        ));

        // session retained, lock free
        assert_eq!(session.image_count(USER), 1);
        assert_eq!(session.snapshot(USER).prompt.as_deref(), Some("remove background"));
        assert!(!session.is_generating(USER));

        let second = edit.submit_prompt(USER, "remove background").await.unwrap();
        assert_eq!(second.output, vec![4, 2]);
        second.confirm_delivered();
        assert_eq!(session.image_count(USER), 0);
    }

    #[tokio::test]
    async fn concurrent_submission_is_rejected_while_generating() {
        let release = Arc::new(Notify::new());
        let (session, edit) = service_with(Arc::new(BlockingGenerator {
            release: Arc::clone(&release),
            output: vec![7],
        }));
        edit.add_image(USER, encoded_png(32, 32)).unwrap();

        let running = edit.clone();
        let first = tokio::spawn(async move { running.submit_prompt(USER, "first prompt").await });

        while !session.is_generating(USER) {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let second = edit.submit_prompt(USER, "second prompt").await;
        assert!(matches!(second, Err(EditError::Busy)));

        // the rejected attempt must not disturb the run in flight
        let snapshot = session.snapshot(USER);
        assert_eq!(snapshot.images.len(), 1);
        assert_eq!(snapshot.prompt.as_deref(), Some("first prompt"));

        release.notify_one();
        let done = first.await.unwrap().unwrap();
        assert_eq!(done.output, vec![7]);
        assert!(session.is_generating(USER));

        done.confirm_delivered();
        assert_eq!(session.image_count(USER), 0);
        assert!(!session.is_generating(USER));
    }

    #[tokio::test]
    async fn fourth_image_is_rejected_and_status_unchanged() {
        let (_, edit) = service_with(Arc::new(StaticGenerator(vec![1])));
        for _ in 0..3 {
            edit.add_image(USER, encoded_png(8, 8)).unwrap();
        }

        let rejected = edit.add_image(USER, encoded_png(8, 8));
        assert!(matches!(
            rejected,
            Err(EditError::Session(SessionError::LimitExceeded { max: 3 }))
        ));

        let status = edit.status(USER);
        assert_eq!(status.images, 3);
        assert_eq!(status.max_images, 3);
    }

    #[tokio::test]
    async fn oversized_images_are_downscaled_before_generation() {
        let generator = Arc::new(CapturingGenerator::default());
        let (_, edit) = service_with(generator.clone());
        edit.add_image(USER, encoded_png(2000, 500)).unwrap();

        edit.submit_prompt(USER, "crop tighter").await.unwrap();

        let seen = generator.seen.lock().unwrap();
        let sent = image::load_from_memory(&seen[0]).unwrap();
        assert_eq!(sent.dimensions(), (1536, 384));
    }

    #[tokio::test]
    async fn small_images_are_passed_through_unchanged() {
        let generator = Arc::new(CapturingGenerator::default());
        let (_, edit) = service_with(generator.clone());
        let original = encoded_png(64, 48);
        edit.add_image(USER, original.clone()).unwrap();

        edit.submit_prompt(USER, "sharpen").await.unwrap();

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen[0], original);
    }

    #[tokio::test]
    async fn images_reach_the_generator_in_upload_order() {
        let generator = Arc::new(CapturingGenerator::default());
        let (_, edit) = service_with(generator.clone());
        for side in [10, 20, 30] {
            edit.add_image(USER, encoded_png(side, side)).unwrap();
        }

        edit.submit_prompt(USER, "blend them").await.unwrap();

        let seen = generator.seen.lock().unwrap();
        let sides: Vec<u32> = seen
            .iter()
            .map(|bytes| image::load_from_memory(bytes).unwrap().dimensions().0)
            .collect();
        assert_eq!(sides, vec![10, 20, 30]);
    }
}
