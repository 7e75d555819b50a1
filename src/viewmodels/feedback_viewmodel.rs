// ============================================================================
// FEEDBACK VIEWMODEL - Borrador, imágenes y envío
// ============================================================================

use std::cell::{Cell, RefCell};

use async_trait::async_trait;

use crate::config::{FeedbackLimits, CONFIG};
use crate::errors::{AppError, AppResult};
use crate::models::feedback::{check_image, FeedbackDraft, FeedbackSubmission, FeedbackType, ImageMeta};
use crate::services::api_client::ApiClient;

#[async_trait(?Send)]
pub trait FeedbackGateway {
    type Image;
    /// Nombre asignado por el servidor
    async fn upload_image(&self, image: &Self::Image) -> AppResult<String>;
    async fn submit(&self, submission: &FeedbackSubmission) -> AppResult<Option<String>>;
}

#[async_trait(?Send)]
impl FeedbackGateway for ApiClient {
    type Image = web_sys::File;

    async fn upload_image(&self, image: &web_sys::File) -> AppResult<String> {
        self.upload_feedback_image(image).await
    }

    async fn submit(&self, submission: &FeedbackSubmission) -> AppResult<Option<String>> {
        self.submit_feedback(submission).await
    }
}

pub struct FeedbackViewModel<G: FeedbackGateway> {
    gateway: G,
    limits: FeedbackLimits,
    draft: RefCell<FeedbackDraft>,
    images: RefCell<Vec<(ImageMeta, G::Image)>>,
    submitting: Cell<bool>,
}

impl<G: FeedbackGateway> FeedbackViewModel<G> {
    pub fn new(gateway: G) -> Self {
        Self::with_limits(gateway, CONFIG.feedback)
    }

    pub fn with_limits(gateway: G, limits: FeedbackLimits) -> Self {
        Self {
            gateway,
            limits,
            draft: RefCell::new(FeedbackDraft::default()),
            images: RefCell::new(Vec::new()),
            submitting: Cell::new(false),
        }
    }

    pub fn limits(&self) -> FeedbackLimits {
        self.limits
    }

    pub fn set_rating(&self, rating: u8) {
        self.draft.borrow_mut().rating = rating.min(5);
    }

    pub fn set_type(&self, code: &str) {
        self.draft.borrow_mut().feedback_type = FeedbackType::from_code(code);
    }

    /// Devuelve la longitud para el contador en vivo
    pub fn set_content(&self, content: &str) -> usize {
        let mut draft = self.draft.borrow_mut();
        draft.content = content.to_string();
        draft.content_len()
    }

    pub fn set_contact(&self, contact: &str) {
        self.draft.borrow_mut().contact = contact.to_string();
    }

    pub fn draft(&self) -> FeedbackDraft {
        self.draft.borrow().clone()
    }

    // ---- Imágenes ----

    pub fn add_image(&self, meta: ImageMeta, image: G::Image) -> AppResult<()> {
        let count = self.images.borrow().len();
        if let Err(err) = check_image(&meta, count, &self.limits) {
            log::warn!("⚠️ [FEEDBACK] Imagen '{}' rechazada: {}", meta.name, err);
            return Err(err);
        }
        self.images.borrow_mut().push((meta, image));
        Ok(())
    }

    pub fn remove_image(&self, index: usize) {
        let mut images = self.images.borrow_mut();
        if index < images.len() {
            images.remove(index);
        }
    }

    pub fn image_names(&self) -> Vec<String> {
        self.images.borrow().iter().map(|(meta, _)| meta.name.clone()).collect()
    }

    // ---- Envío ----

    /// Valida antes de tocar la red; las imágenes que fallen se omiten
    pub async fn submit(&self, user_id: Option<String>) -> AppResult<Option<String>> {
        if self.submitting.get() {
            return Err(AppError::Validation("submitting"));
        }
        let draft = self.draft();
        if let Some(err) = draft.first_error(&self.limits) {
            return Err(err);
        }

        self.submitting.set(true);
        let result = self.upload_and_submit(&draft, user_id).await;
        self.submitting.set(false);

        match &result {
            Ok(_) => {
                log::info!("✅ [FEEDBACK] Opinión enviada");
                *self.draft.borrow_mut() = FeedbackDraft::default();
                self.images.borrow_mut().clear();
            }
            Err(err) => log::error!("❌ [FEEDBACK] Envío fallido: {}", err),
        }
        result
    }

    async fn upload_and_submit(&self, draft: &FeedbackDraft, user_id: Option<String>) -> AppResult<Option<String>> {
        let mut uploaded = Vec::new();
        let images = self.images.borrow();
        for (meta, image) in images.iter() {
            match self.gateway.upload_image(image).await {
                Ok(name) => uploaded.push(name),
                Err(err) => log::warn!("⚠️ [FEEDBACK] Imagen '{}' omitida: {}", meta.name, err),
            }
        }
        drop(images);

        let submission = FeedbackSubmission::from_draft(draft, uploaded, user_id, &self.limits)?;
        self.gateway.submit(&submission).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    /// Las imágenes de prueba son su propio nombre; "bad" falla al subir
    #[derive(Default)]
    struct FakeGateway {
        submitted: RefCell<Vec<FeedbackSubmission>>,
    }

    #[async_trait(?Send)]
    impl FeedbackGateway for FakeGateway {
        type Image = String;

        async fn upload_image(&self, image: &String) -> AppResult<String> {
            if image == "bad" {
                Err(AppError::Network("reset".into()))
            } else {
                Ok(format!("srv_{}", image))
            }
        }

        async fn submit(&self, submission: &FeedbackSubmission) -> AppResult<Option<String>> {
            self.submitted.borrow_mut().push(submission.clone());
            Ok(None)
        }
    }

    fn meta(name: &str) -> ImageMeta {
        ImageMeta { name: name.into(), mime_type: "image/png".into(), size: 1024.0 }
    }

    fn filled(vm: &FeedbackViewModel<FakeGateway>) {
        vm.set_rating(4);
        vm.set_type("suggestion");
        vm.set_content("希望增加导出功能");
        vm.set_contact("13800138000");
    }

    #[test]
    fn test_validation_runs_before_network() {
        let vm = FeedbackViewModel::with_limits(FakeGateway::default(), FeedbackLimits::default());
        vm.set_type("bug");
        vm.set_content("按钮无反应");

        assert_eq!(block_on(vm.submit(None)), Err(AppError::Validation("rating_required")));
        assert!(vm.gateway.submitted.borrow().is_empty());
    }

    #[test]
    fn test_failed_uploads_are_skipped() {
        let vm = FeedbackViewModel::with_limits(FakeGateway::default(), FeedbackLimits::default());
        filled(&vm);
        vm.add_image(meta("a.png"), "a".to_string()).unwrap();
        vm.add_image(meta("b.png"), "bad".to_string()).unwrap();

        block_on(vm.submit(Some("device_x".into()))).unwrap();

        let sent = vm.gateway.submitted.borrow();
        assert_eq!(sent[0].images, vec!["srv_a".to_string()]);
        assert_eq!(sent[0].feedback_type, FeedbackType::Suggestion);
        assert_eq!(sent[0].user_id.as_deref(), Some("device_x"));
        // Formulario vacío tras enviar
        assert_eq!(vm.draft(), FeedbackDraft::default());
        assert!(vm.image_names().is_empty());
    }

    #[test]
    fn test_image_limits() {
        let vm = FeedbackViewModel::with_limits(FakeGateway::default(), FeedbackLimits::default());
        for i in 0..3 {
            vm.add_image(meta(&format!("{}.png", i)), i.to_string()).unwrap();
        }
        assert_eq!(vm.add_image(meta("4.png"), "4".into()), Err(AppError::Validation("too_many_images")));

        vm.remove_image(0);
        let pdf = ImageMeta { name: "doc.pdf".into(), mime_type: "application/pdf".into(), size: 10.0 };
        assert_eq!(vm.add_image(pdf, "pdf".into()), Err(AppError::Validation("image_not_image")));
        let huge = ImageMeta { size: 6.0 * 1024.0 * 1024.0, ..meta("huge.png") };
        assert_eq!(vm.add_image(huge, "huge".into()), Err(AppError::Validation("image_too_large")));
        assert_eq!(vm.image_names().len(), 2);
    }

    #[test]
    fn test_content_counter() {
        let vm = FeedbackViewModel::with_limits(FakeGateway::default(), FeedbackLimits::default());
        assert_eq!(vm.set_content("你好 world"), 8);
    }
}
