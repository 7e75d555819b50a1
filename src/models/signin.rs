// ============================================================================
// SIGN-IN - Formulario de firma en clase
// ============================================================================

use serde::Serialize;

use crate::errors::AppError;
use crate::models::building::BuildingResolution;
use crate::models::location::LocationSample;
use crate::models::user::UserInfo;
use crate::utils::i18n::Language;

/// Foto elegida: data URL (input HTML) o localId del bridge
#[derive(Clone, PartialEq, Debug)]
pub enum PhotoRef {
    DataUrl(String),
    LocalId(String),
}

impl PhotoRef {
    pub fn from_raw(raw: &str) -> Self {
        if raw.starts_with("data:image/") {
            PhotoRef::DataUrl(raw.to_string())
        } else {
            PhotoRef::LocalId(raw.to_string())
        }
    }

    /// Valor para `<img src>`
    pub fn preview_src(&self) -> &str {
        match self {
            PhotoRef::DataUrl(s) | PhotoRef::LocalId(s) => s,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct SignInForm {
    pub photo: Option<PhotoRef>,
    pub course_name: String,
    pub classroom: String,
}

impl SignInForm {
    /// Botón de envío habilitado
    pub fn is_complete(&self) -> bool {
        self.first_error().is_none()
    }

    pub fn first_error(&self) -> Option<AppError> {
        if self.photo.is_none() {
            Some(AppError::Validation("photo_required"))
        } else if self.course_name.trim().is_empty() {
            Some(AppError::Validation("course_required"))
        } else if self.classroom.trim().is_empty() {
            Some(AppError::Validation("classroom_required"))
        } else {
            None
        }
    }
}

/// Cuerpo de `POST /signin`
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SignInRequest {
    pub student_id: String,
    pub name: String,
    pub course_name: String,
    pub classroom: String,
    pub photo: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_address: Option<String>,
    pub wechat_userid: String,
    /// ISO 8601
    pub timestamp: String,
}

impl SignInRequest {
    pub fn build(
        user: &UserInfo,
        form: &SignInForm,
        photo: String,
        location: Option<&LocationSample>,
        building: Option<&BuildingResolution>,
        timestamp: String,
    ) -> Self {
        Self {
            student_id: user.student_id.clone(),
            name: user.name.clone(),
            course_name: form.course_name.trim().to_string(),
            classroom: form.classroom.trim().to_string(),
            photo,
            latitude: location.map(|l| l.latitude),
            longitude: location.map(|l| l.longitude),
            location_address: building
                .and_then(|b| b.building_name(Language::Chinese))
                .map(|s| s.to_string()),
            wechat_userid: user.wechat_userid.clone(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_kind_detection() {
        assert!(matches!(PhotoRef::from_raw("data:image/jpeg;base64,AAA"), PhotoRef::DataUrl(_)));
        assert!(matches!(PhotoRef::from_raw("wxLocalResource://abc"), PhotoRef::LocalId(_)));
    }

    #[test]
    fn test_form_requires_all_fields_in_order() {
        let mut form = SignInForm::default();
        assert_eq!(form.first_error(), Some(AppError::Validation("photo_required")));
        form.photo = Some(PhotoRef::from_raw("data:image/png;base64,AA"));
        assert_eq!(form.first_error(), Some(AppError::Validation("course_required")));
        form.course_name = "操作系统".into();
        form.classroom = "   ".into();
        assert_eq!(form.first_error(), Some(AppError::Validation("classroom_required")));
        form.classroom = "A101".into();
        assert!(form.is_complete());
    }

    #[test]
    fn test_request_without_location() {
        let user = UserInfo {
            student_id: "2021150001".into(),
            name: "李华".into(),
            wechat_userid: "lihua".into(),
            department: String::new(),
        };
        let form = SignInForm {
            photo: Some(PhotoRef::from_raw("media-id")),
            course_name: " 操作系统 ".into(),
            classroom: "A101".into(),
        };
        let req = SignInRequest::build(&user, &form, "server-id".into(), None, None, "2024-03-14T02:00:00Z".into());
        assert_eq!(req.course_name, "操作系统");
        assert!(req.latitude.is_none());
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["photo"], "server-id");
        assert!(json["location_address"].is_null());
    }
}
