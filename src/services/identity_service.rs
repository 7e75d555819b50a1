// ============================================================================
// IDENTITY SERVICE - Identidad del usuario con reintentos acotados
// ============================================================================
// El contador de intentos vive en sessionStorage: sobrevive a recargas de la
// pestaña (p.ej. redirecciones OAuth) pero no se comparte entre pestañas.
// ============================================================================

use async_trait::async_trait;

use crate::config::CONFIG;
use crate::errors::{AppError, AppResult};
use crate::models::user::UserInfo;
use crate::services::api_client::ApiClient;
use crate::state::AppState;
use crate::utils::{device, storage};

pub const SIGNIN_RETRY_KEY: &str = "signin_userinfo_retry_count";
pub const RECORDS_RETRY_KEY: &str = "records_userinfo_retry_count";
pub const STATISTICS_RETRY_KEY: &str = "statistics_userinfo_retry_count";

/// Contadores de intentos por operación
pub trait RetryCounterStore {
    fn get(&self, key: &str) -> u32;
    fn set(&self, key: &str, value: u32);
    fn clear(&self, key: &str);
}

/// sessionStorage de la pestaña
#[derive(Clone, Copy, Default)]
pub struct SessionCounterStore;

impl RetryCounterStore for SessionCounterStore {
    fn get(&self, key: &str) -> u32 {
        storage::load_from_session::<u32>(key).unwrap_or(0)
    }

    fn set(&self, key: &str, value: u32) {
        if let Err(e) = storage::save_to_session(key, &value) {
            log::warn!("⚠️ [IDENTITY] {}", e);
        }
    }

    fn clear(&self, key: &str) {
        storage::remove_from_session(key);
    }
}

/// Origen remoto de la identidad
#[async_trait(?Send)]
pub trait IdentitySource {
    async fn fetch(&self) -> AppResult<UserInfo>;
}

// ============================================================================
// ORIGEN REAL: OAuth de WeCom o CAS
// ============================================================================

#[derive(Clone)]
pub struct WeComIdentitySource {
    api: ApiClient,
    state: AppState,
}

impl WeComIdentitySource {
    pub fn new(api: ApiClient, state: AppState) -> Self {
        Self { api, state }
    }

    async fn from_cas(&self) -> AppResult<UserInfo> {
        let status = self.api.cas_status().await?;
        if let (true, Some(user)) = (status.logged_in, status.user) {
            log::info!("✅ [IDENTITY] Sesión CAS activa");
            return Ok(UserInfo::from(user));
        }

        let login = self.api.cas_login().await?;
        match login.login_url {
            Some(url) if login.success => {
                log::info!("🔐 [IDENTITY] Redirigiendo a CAS");
                redirect(&url);
                Err(AppError::Other("redirecting to CAS login".to_string()))
            }
            _ => Err(AppError::Server {
                status: 200,
                message: login.message.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait(?Send)]
impl IdentitySource for WeComIdentitySource {
    async fn fetch(&self) -> AppResult<UserInfo> {
        let href = current_href();

        if let Some(code) = query_param(&href, "code") {
            log::info!("🔑 [IDENTITY] Intercambiando código OAuth");
            return match self.api.wechat_userinfo(&code).await {
                Ok(user) => Ok(user),
                Err(AppError::AuthExpired) => {
                    // El código ya se usó: volver a autorizar
                    self.state.clear_user();
                    redirect(&oauth_authorize_url(&CONFIG.wechat_corp_id, &encoded_redirect(&href)));
                    Err(AppError::AuthExpired)
                }
                Err(e) => Err(e),
            };
        }

        if device::is_in_wecom() {
            log::info!("🔐 [IDENTITY] Sin código, solicitando autorización");
            redirect(&oauth_authorize_url(&CONFIG.wechat_corp_id, &encoded_redirect(&href)));
            return Err(AppError::Other("redirecting to OAuth".to_string()));
        }

        self.from_cas().await
    }
}

// ============================================================================
// REINTENTOS ACOTADOS
// ============================================================================

pub struct BoundedIdentityFetch<S, C> {
    source: S,
    counters: C,
    key: &'static str,
    cap: u32,
}

impl<S: IdentitySource, C: RetryCounterStore> BoundedIdentityFetch<S, C> {
    pub fn new(source: S, counters: C, key: &'static str) -> Self {
        Self { source, counters, key, cap: CONFIG.retry.identity_max_retries }
    }

    #[cfg(test)]
    pub fn with_cap(mut self, cap: u32) -> Self {
        self.cap = cap;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.counters.get(self.key)
    }

    /// Identidad completa o `None` ("no disponible")
    ///
    /// Alcanzado el techo ya no se llama al origen remoto.
    pub async fn fetch(&self) -> Option<UserInfo> {
        let count = self.counters.get(self.key);
        if count >= self.cap {
            log::warn!("🛑 [IDENTITY] {} intentos fallidos, no se reintenta", count);
            return None;
        }

        match self.source.fetch().await {
            Ok(user) if user.is_complete() => {
                log::info!("✅ [IDENTITY] Usuario: {} ({})", user.name, user.student_id);
                self.counters.clear(self.key);
                Some(user)
            }
            Ok(_) => {
                log::warn!("⚠️ [IDENTITY] Identidad incompleta (intento {})", count + 1);
                self.counters.set(self.key, count + 1);
                None
            }
            Err(err) => {
                log::error!("❌ [IDENTITY] Error obteniendo usuario (intento {}): {}", count + 1, err);
                self.counters.set(self.key, count + 1);
                None
            }
        }
    }

    /// Usa la identidad de la sesión si existe; si no, la obtiene y la guarda
    pub async fn load_into(&self, state: &AppState) -> Option<UserInfo> {
        if let Some(user) = state.complete_user() {
            return Some(user);
        }
        let user = self.fetch().await?;
        state.set_user(user.clone());
        Some(user)
    }

    /// Tras una sesión caducada: el usuario debe poder reintentar desde cero
    pub fn reset(&self) {
        self.counters.clear(self.key);
    }
}

/// Fetch acotado de la página con los componentes reales
pub fn page_identity(
    api: ApiClient,
    state: AppState,
    key: &'static str,
) -> BoundedIdentityFetch<WeComIdentitySource, SessionCounterStore> {
    BoundedIdentityFetch::new(WeComIdentitySource::new(api, state), SessionCounterStore, key)
}

// ============================================================================
// URLS
// ============================================================================

fn current_href() -> String {
    web_sys::window()
        .and_then(|w| w.location().href().ok())
        .unwrap_or_default()
}

fn redirect(url: &str) {
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.location().set_href(url) {
            log::error!("❌ [IDENTITY] Redirección fallida: {:?}", e);
        }
    }
}

/// URL actual sin `code`/`state`, codificada para `redirect_uri`
fn encoded_redirect(href: &str) -> String {
    let base = strip_oauth_params(href);
    String::from(js_sys::encode_uri_component(&base))
}

/// Valor de un parámetro de la query string
pub fn query_param(href: &str, name: &str) -> Option<String> {
    let query = href.split('#').next()?.split_once('?')?.1;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}

pub fn strip_oauth_params(href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();
    let Some((base, query)) = href.split_once('?') else {
        return href.to_string();
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            !key.is_empty() && key != "code" && key != "state"
        })
        .collect();
    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, kept.join("&"))
    }
}

pub fn oauth_authorize_url(corp_id: &str, encoded_redirect_uri: &str) -> String {
    format!(
        "https://open.weixin.qq.com/connect/oauth2/authorize?appid={}&redirect_uri={}&response_type=code&scope=snsapi_base&state=attendance#wechat_redirect",
        corp_id, encoded_redirect_uri
    )
}
