// ============================================================================
// SIGN-IN VIEWMODEL - Lógica de la página de firma
// ============================================================================
// Devuelve valores; la vista decide cómo mostrarlos.
// ============================================================================

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;

use crate::errors::{AppError, AppResult};
use crate::models::building::BuildingResolution;
use crate::models::signin::{PhotoRef, SignInForm, SignInRequest};
use crate::services::api_client::ApiClient;
use crate::services::bridge::PlatformBridge;
use crate::state::app_state::{AppState, BUILDING_CACHE_KEY};

/// Envío de la firma al backend
#[async_trait(?Send)]
pub trait SignInGateway {
    async fn submit(&self, request: &SignInRequest) -> AppResult<Option<String>>;
}

#[async_trait(?Send)]
impl SignInGateway for ApiClient {
    async fn submit(&self, request: &SignInRequest) -> AppResult<Option<String>> {
        self.sign_in(request).await
    }
}

pub struct SignInViewModel<B, G> {
    state: AppState,
    bridge: B,
    gateway: G,
    submitting: Rc<Cell<bool>>,
}

impl<B: PlatformBridge, G: SignInGateway> SignInViewModel<B, G> {
    pub fn new(state: AppState, bridge: B, gateway: G) -> Self {
        Self { state, bridge, gateway, submitting: Rc::new(Cell::new(false)) }
    }

    /// Botón de firma habilitado solo con identidad completa
    pub fn can_sign_in(&self) -> bool {
        self.state.complete_user().is_some()
    }

    /// Abrir el modal: identidad completa y ningún envío en curso
    pub fn open_form(&self) -> AppResult<()> {
        if self.submitting.get() {
            return Err(AppError::Validation("signin_in_progress"));
        }
        if !self.can_sign_in() {
            log::warn!("⚠️ [SIGNIN] Modal bloqueado: identidad incompleta");
            return Err(AppError::Validation("user_info_missing"));
        }
        Ok(())
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.get()
    }

    /// La cámara del bridge solo se usa si está listo; si no, input HTML
    pub fn bridge_camera_available(&self) -> bool {
        self.bridge.is_ready()
    }

    pub async fn choose_photo(&self) -> AppResult<PhotoRef> {
        let local_id = self.bridge.choose_image().await?;
        log::info!("📸 [SIGNIN] Foto elegida");
        Ok(PhotoRef::LocalId(local_id))
    }

    /// Valor final del campo `photo`: data URL tal cual, localId → serverId
    async fn photo_value(&self, photo: &PhotoRef) -> AppResult<String> {
        match photo {
            PhotoRef::DataUrl(url) => Ok(url.clone()),
            PhotoRef::LocalId(local_id) => {
                let server_id = self.bridge.upload_image(local_id).await?;
                log::info!("✅ [SIGNIN] Foto subida: {}", server_id);
                Ok(server_id)
            }
        }
    }

    /// Envía la firma; un segundo envío mientras hay uno en curso se rechaza
    pub async fn submit(&self, form: &SignInForm, timestamp: String) -> AppResult<Option<String>> {
        if self.submitting.get() {
            log::warn!("⚠️ [SIGNIN] Envío ya en curso");
            return Err(AppError::Validation("signin_in_progress"));
        }
        let user = self.state.complete_user().ok_or(AppError::Validation("user_info_missing"))?;
        if let Some(err) = form.first_error() {
            return Err(err);
        }
        let Some(photo) = form.photo.as_ref() else {
            return Err(AppError::Validation("photo_required"));
        };

        self.submitting.set(true);
        let result = async {
            let photo = self.photo_value(photo).await?;
            let location = self.state.location();
            let building = self.state.cache_get::<BuildingResolution>(BUILDING_CACHE_KEY);
            let request = SignInRequest::build(&user, form, photo, location.as_ref(), building.as_ref(), timestamp);
            self.gateway.submit(&request).await
        }
        .await;
        self.submitting.set(false);

        match &result {
            Ok(_) => log::info!("✅ [SIGNIN] Firma registrada: {}", user.student_id),
            Err(err) if err.is_auth_expired() => {
                log::warn!("🔐 [SIGNIN] Sesión caducada al firmar");
                self.state.clear_user();
            }
            Err(err) => log::error!("❌ [SIGNIN] Firma fallida: {}", err),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::location::LocationSample;
    use crate::models::user::UserInfo;
    use crate::utils::i18n::Language;
    use futures::executor::block_on;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeBridge {
        uploads: RefCell<Vec<String>>,
    }

    #[async_trait(?Send)]
    impl PlatformBridge for FakeBridge {
        fn is_ready(&self) -> bool {
            true
        }
        async fn get_location(&self) -> AppResult<LocationSample> {
            Err(AppError::Unavailable)
        }
        async fn choose_image(&self) -> AppResult<String> {
            Ok("wxLocalResource://photo1".to_string())
        }
        async fn upload_image(&self, local_id: &str) -> AppResult<String> {
            self.uploads.borrow_mut().push(local_id.to_string());
            Ok("media_001".to_string())
        }
        async fn scan_code(&self) -> AppResult<String> {
            Err(AppError::Unavailable)
        }
    }

    #[derive(Default)]
    struct RecordingGateway {
        requests: RefCell<Vec<SignInRequest>>,
        fail_with: Option<AppError>,
    }

    #[async_trait(?Send)]
    impl SignInGateway for RecordingGateway {
        async fn submit(&self, request: &SignInRequest) -> AppResult<Option<String>> {
            self.requests.borrow_mut().push(request.clone());
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(Some("签到成功".to_string())),
            }
        }
    }

    fn signed_in_state() -> AppState {
        let state = AppState::with_language(Language::Chinese);
        state.set_user(UserInfo {
            student_id: "2021150001".into(),
            name: "张三".into(),
            wechat_userid: "zhangsan".into(),
            department: String::new(),
        });
        state
    }

    fn form(photo: &str) -> SignInForm {
        SignInForm {
            photo: Some(PhotoRef::from_raw(photo)),
            course_name: " 操作系统 ".into(),
            classroom: "A101".into(),
        }
    }

    #[test]
    fn test_local_photo_is_uploaded_before_submit() {
        let state = signed_in_state();
        state.set_location(LocationSample::new(22.53, 113.93, Some(10.0), 0));
        let vm = SignInViewModel::new(state, FakeBridge::default(), RecordingGateway::default());

        let photo = block_on(vm.choose_photo()).unwrap();
        let mut f = form("x");
        f.photo = Some(photo);
        block_on(vm.submit(&f, "2024-03-05T08:00:00".into())).unwrap();

        assert_eq!(*vm.bridge.uploads.borrow(), vec!["wxLocalResource://photo1".to_string()]);
        let sent = vm.gateway.requests.borrow();
        assert_eq!(sent[0].photo, "media_001");
        assert_eq!(sent[0].course_name, "操作系统");
        assert_eq!(sent[0].latitude, Some(22.53));
        assert!(!vm.is_submitting());
    }

    #[test]
    fn test_data_url_photo_is_sent_as_is() {
        let vm = SignInViewModel::new(signed_in_state(), FakeBridge::default(), RecordingGateway::default());
        block_on(vm.submit(&form("data:image/jpeg;base64,AAAA"), "t".into())).unwrap();

        assert!(vm.bridge.uploads.borrow().is_empty());
        assert_eq!(vm.gateway.requests.borrow()[0].photo, "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn test_incomplete_form_never_reaches_network() {
        let vm = SignInViewModel::new(signed_in_state(), FakeBridge::default(), RecordingGateway::default());
        let f = SignInForm { course_name: "操作系统".into(), ..Default::default() };

        assert_eq!(block_on(vm.submit(&f, "t".into())), Err(AppError::Validation("photo_required")));
        assert!(vm.gateway.requests.borrow().is_empty());
    }

    #[test]
    fn test_sign_in_disabled_without_identity() {
        let vm = SignInViewModel::new(
            AppState::with_language(Language::Chinese),
            FakeBridge::default(),
            RecordingGateway::default(),
        );
        assert!(!vm.can_sign_in());
        assert_eq!(
            block_on(vm.submit(&form("data:image/png;base64,A"), "t".into())),
            Err(AppError::Validation("user_info_missing"))
        );
    }

    #[test]
    fn test_in_flight_submission_is_rejected() {
        let vm = SignInViewModel::new(signed_in_state(), FakeBridge::default(), RecordingGateway::default());
        vm.submitting.set(true);

        assert_eq!(
            block_on(vm.submit(&form("data:image/png;base64,A"), "t".into())),
            Err(AppError::Validation("signin_in_progress"))
        );
        assert!(vm.gateway.requests.borrow().is_empty());
    }

    #[test]
    fn test_expired_session_clears_identity() {
        let state = signed_in_state();
        let gateway = RecordingGateway { fail_with: Some(AppError::AuthExpired), ..Default::default() };
        let vm = SignInViewModel::new(state.clone(), FakeBridge::default(), gateway);

        assert_eq!(block_on(vm.submit(&form("data:image/png;base64,A"), "t".into())), Err(AppError::AuthExpired));
        assert!(state.user().is_none());
        assert!(!vm.is_submitting());
    }

    #[test]
    fn test_form_opens_only_with_complete_identity() {
        let state = AppState::with_language(Language::Chinese);
        let vm = SignInViewModel::new(state.clone(), FakeBridge::default(), RecordingGateway::default());
        assert_eq!(vm.open_form(), Err(AppError::Validation("user_info_missing")));

        state.set_user(UserInfo {
            student_id: "2021150001".into(),
            name: String::new(),
            wechat_userid: "zhangsan".into(),
            department: String::new(),
        });
        assert_eq!(vm.open_form(), Err(AppError::Validation("user_info_missing")));

        let vm = SignInViewModel::new(signed_in_state(), FakeBridge::default(), RecordingGateway::default());
        assert_eq!(vm.open_form(), Ok(()));
    }
}
