// ============================================================================
// FEEDBACK - Formulario de opinión y su validación
// ============================================================================

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::FeedbackLimits;
use crate::errors::AppError;

lazy_static::lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex");
    static ref PHONE_RE: Regex = Regex::new(r"^1[3-9]\d{9}$").expect("Invalid phone regex");
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Bug,
    Suggestion,
    Praise,
    Other,
}

impl FeedbackType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "bug" => Some(FeedbackType::Bug),
            "suggestion" => Some(FeedbackType::Suggestion),
            "praise" => Some(FeedbackType::Praise),
            "other" => Some(FeedbackType::Other),
            _ => None,
        }
    }
}

/// Email o móvil de China continental
pub fn is_valid_contact(contact: &str) -> bool {
    let contact = contact.trim();
    EMAIL_RE.is_match(contact) || PHONE_RE.is_match(contact)
}

/// Metadatos de una imagen elegida (antes de subirla)
#[derive(Clone, PartialEq, Debug)]
pub struct ImageMeta {
    pub name: String,
    pub mime_type: String,
    pub size: f64,
}

/// Comprobar una imagen candidata contra los límites y las ya seleccionadas
pub fn check_image(meta: &ImageMeta, already_selected: usize, limits: &FeedbackLimits) -> Result<(), AppError> {
    if already_selected >= limits.max_images {
        return Err(AppError::Validation("too_many_images"));
    }
    if !meta.mime_type.starts_with("image/") {
        return Err(AppError::Validation("image_not_image"));
    }
    if meta.size > limits.max_image_bytes {
        return Err(AppError::Validation("image_too_large"));
    }
    Ok(())
}

/// Estado editable del formulario
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FeedbackDraft {
    /// 0 = sin valorar
    pub rating: u8,
    pub feedback_type: Option<FeedbackType>,
    pub content: String,
    pub contact: String,
}

impl FeedbackDraft {
    /// Todos los errores en orden; la UI muestra el primero
    pub fn validate(&self, limits: &FeedbackLimits) -> Vec<AppError> {
        let mut errors = Vec::new();
        if !(1..=5).contains(&self.rating) {
            errors.push(AppError::Validation("rating_required"));
        }
        if self.feedback_type.is_none() {
            errors.push(AppError::Validation("type_required"));
        }
        if self.content.trim().is_empty() {
            errors.push(AppError::Validation("content_required"));
        } else if self.content.chars().count() > limits.max_content_chars {
            errors.push(AppError::Validation("content_too_long"));
        }
        if !self.contact.trim().is_empty() && !is_valid_contact(&self.contact) {
            errors.push(AppError::Validation("contact_invalid"));
        }
        errors
    }

    pub fn first_error(&self, limits: &FeedbackLimits) -> Option<AppError> {
        self.validate(limits).into_iter().next()
    }

    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Cuerpo de `POST /api/feedback/submit`
#[derive(Clone, Debug, Serialize)]
pub struct FeedbackSubmission {
    pub rating: u8,
    pub feedback_type: FeedbackType,
    pub content: String,
    pub contact_info: String,
    pub images: Vec<String>,
    pub user_id: Option<String>,
}

impl FeedbackSubmission {
    /// Solo se construye a partir de un borrador válido
    pub fn from_draft(
        draft: &FeedbackDraft,
        images: Vec<String>,
        user_id: Option<String>,
        limits: &FeedbackLimits,
    ) -> Result<Self, AppError> {
        if let Some(err) = draft.first_error(limits) {
            return Err(err);
        }
        let feedback_type = draft.feedback_type.ok_or(AppError::Validation("type_required"))?;
        Ok(Self {
            rating: draft.rating,
            feedback_type,
            content: draft.content.trim().to_string(),
            contact_info: draft.contact.trim().to_string(),
            images,
            user_id,
        })
    }
}

/// `data` de `/api/feedback/upload`
#[derive(Clone, Debug, Deserialize)]
pub struct UploadedImage {
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> FeedbackDraft {
        FeedbackDraft {
            rating: 4,
            feedback_type: Some(FeedbackType::Suggestion),
            content: "希望增加课程提醒".to_string(),
            contact: String::new(),
        }
    }

    #[test]
    fn test_contact_formats() {
        assert!(is_valid_contact("student@szu.edu.cn"));
        assert!(is_valid_contact("13812345678"));
        assert!(!is_valid_contact("12812345678"));
        assert!(!is_valid_contact("not an email"));
        assert!(!is_valid_contact("a@b"));
    }

    #[test]
    fn test_first_error_order() {
        let limits = FeedbackLimits::default();
        let empty = FeedbackDraft::default();
        assert_eq!(empty.first_error(&limits), Some(AppError::Validation("rating_required")));
        assert_eq!(empty.validate(&limits).len(), 3);
        assert!(valid_draft().validate(&limits).is_empty());
    }

    #[test]
    fn test_content_limit_counts_characters() {
        let limits = FeedbackLimits::default();
        let mut draft = valid_draft();
        draft.content = "好".repeat(500);
        assert!(draft.validate(&limits).is_empty());
        draft.content.push('!');
        assert_eq!(draft.first_error(&limits), Some(AppError::Validation("content_too_long")));
    }

    #[test]
    fn test_invalid_contact_blocks_submission() {
        let limits = FeedbackLimits::default();
        let mut draft = valid_draft();
        draft.contact = "123".to_string();
        assert!(FeedbackSubmission::from_draft(&draft, vec![], None, &limits).is_err());
        draft.contact = "13912345678".to_string();
        let sub = FeedbackSubmission::from_draft(&draft, vec!["a.png".into()], None, &limits).unwrap();
        assert_eq!(sub.contact_info, "13912345678");
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["feedback_type"], "suggestion");
    }

    #[test]
    fn test_image_checks() {
        let limits = FeedbackLimits::default();
        let ok = ImageMeta { name: "a.png".into(), mime_type: "image/png".into(), size: 1024.0 };
        assert!(check_image(&ok, 0, &limits).is_ok());
        assert_eq!(check_image(&ok, 3, &limits), Err(AppError::Validation("too_many_images")));
        let pdf = ImageMeta { mime_type: "application/pdf".into(), ..ok.clone() };
        assert_eq!(check_image(&pdf, 0, &limits), Err(AppError::Validation("image_not_image")));
        let big = ImageMeta { size: 6.0 * 1024.0 * 1024.0, ..ok };
        assert_eq!(check_image(&big, 0, &limits), Err(AppError::Validation("image_too_large")));
    }
}
