// ============================================================================
// PLATFORM BRIDGE - WeCom JS-SDK como operaciones async
// ============================================================================
// Las APIs de callbacks (success / fail / cancel) se envuelven en una Promise
// y se esperan con JsFuture. Los fallos se clasifican en AppError aquí mismo.
// ============================================================================

use async_trait::async_trait;
use serde::Serialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use crate::config::CONFIG;
use crate::errors::{classify_geolocation_code, AppError, AppResult};
use crate::models::location::LocationSample;
use crate::models::wecom::signable_url;
use crate::services::api_client::ApiClient;
use crate::state::AppState;
use crate::utils::wecom_ffi;

const WX_JS_API_LIST: &[&str] = &["getLocation", "chooseImage", "uploadImage", "scanQRCode"];

/// Capacidades del bridge consumidas por la app
#[async_trait(?Send)]
pub trait PlatformBridge {
    /// Handshake de configuración completado
    fn is_ready(&self) -> bool;

    async fn get_location(&self) -> AppResult<LocationSample>;

    /// Devuelve el localId de la imagen elegida
    async fn choose_image(&self) -> AppResult<String>;

    /// Sube un localId y devuelve el serverId
    async fn upload_image(&self, local_id: &str) -> AppResult<String>;

    /// Resultado crudo del escaneo
    async fn scan_code(&self) -> AppResult<String>;
}

// ============================================================================
// HELPERS JS
// ============================================================================

/// Serializa a objeto JS plano (vía JSON)
pub fn to_js_object<T: Serialize>(value: &T) -> AppResult<JsValue> {
    let json = serde_json::to_string(value)?;
    js_sys::JSON::parse(&json).map_err(|e| AppError::from_js(&e))
}

fn get_prop(target: &JsValue, key: &str) -> JsValue {
    js_sys::Reflect::get(target, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

fn set_prop(target: &JsValue, key: &str, value: &JsValue) -> AppResult<()> {
    js_sys::Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|e| AppError::from_js(&e))
}

/// Ejecuta una API de callbacks del SDK y espera su resultado
///
/// `options` recibe `success`, `fail` y `cancel`; `invoke` hace la llamada.
async fn call_with_callbacks<F>(api: &'static str, options: JsValue, invoke: F) -> AppResult<JsValue>
where
    F: FnOnce(&JsValue) -> Result<(), JsValue>,
{
    let mut invoke = Some(invoke);
    let mut setup_error: Option<AppError> = None;

    let promise = js_sys::Promise::new(&mut |resolve: js_sys::Function, reject: js_sys::Function| {
        let Some(invoke) = invoke.take() else { return };

        let on_success = Closure::once_into_js(move |res: JsValue| {
            let _ = resolve.call1(&JsValue::NULL, &res);
        });
        let reject_fail = reject.clone();
        let on_fail = Closure::once_into_js(move |res: JsValue| {
            let _ = reject_fail.call1(&JsValue::NULL, &res);
        });
        let reject_cancel = reject.clone();
        let on_cancel = Closure::once_into_js(move |_res: JsValue| {
            let cancel = js_sys::Object::new();
            let _ = js_sys::Reflect::set(&cancel, &"errMsg".into(), &format!("{}:cancel", api).into());
            let _ = reject_cancel.call1(&JsValue::NULL, &cancel);
        });

        let wired = set_prop(&options, "success", &on_success)
            .and_then(|_| set_prop(&options, "fail", &on_fail))
            .and_then(|_| set_prop(&options, "cancel", &on_cancel));
        if let Err(e) = wired {
            setup_error = Some(e);
            return;
        }

        // El SDK puede no estar cargado: la excepción rechaza la promesa
        if let Err(e) = invoke(&options) {
            let _ = reject.call1(&JsValue::NULL, &e);
        }
    });

    if let Some(err) = setup_error {
        return Err(err);
    }

    JsFuture::from(promise).await.map_err(|e| {
        let err = AppError::from_js(&e);
        log::warn!("⚠️ [BRIDGE] {} falló: {}", api, err);
        err
    })
}

/// `navigator.geolocation` como alternativa cuando wx.getLocation falla
async fn browser_geolocation() -> AppResult<LocationSample> {
    let window = web_sys::window().ok_or(AppError::Unavailable)?;
    let geolocation = get_prop(&window.navigator(), "geolocation");
    if geolocation.is_undefined() || geolocation.is_null() {
        return Err(AppError::Unavailable);
    }

    let promise = js_sys::Promise::new(&mut |resolve: js_sys::Function, reject: js_sys::Function| {
        let options = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&options, &"enableHighAccuracy".into(), &JsValue::TRUE);
        let _ = js_sys::Reflect::set(&options, &"timeout".into(), &JsValue::from_f64(10_000.0));
        let _ = js_sys::Reflect::set(&options, &"maximumAge".into(), &JsValue::from_f64(60_000.0));

        let get_current = get_prop(&geolocation, "getCurrentPosition");
        let Some(get_current) = get_current.dyn_ref::<js_sys::Function>() else {
            let _ = reject.call1(&JsValue::NULL, &JsValue::from_f64(2.0));
            return;
        };
        let on_ok = Closure::once_into_js(move |pos: JsValue| {
            let _ = resolve.call1(&JsValue::NULL, &pos);
        });
        let reject_err = reject.clone();
        let on_err = Closure::once_into_js(move |err: JsValue| {
            let _ = reject_err.call1(&JsValue::NULL, &get_prop(&err, "code"));
        });
        if let Err(e) = get_current.call3(&geolocation, &on_ok, &on_err, &options) {
            let _ = reject.call1(&JsValue::NULL, &e);
        }
    });

    let position = JsFuture::from(promise).await.map_err(|code| {
        code.as_f64()
            .map(|c| classify_geolocation_code(c as u16))
            .unwrap_or_else(|| AppError::from_js(&code))
    })?;

    let coords = get_prop(&position, "coords");
    sample_from_js(&coords)
}

/// Una negativa explícita del usuario no se salta con el navegador
fn should_fallback_to_browser(err: &AppError) -> bool {
    !matches!(err, AppError::PermissionDenied | AppError::Cancelled)
}

fn sample_from_js(source: &JsValue) -> AppResult<LocationSample> {
    let latitude = get_prop(source, "latitude").as_f64();
    let longitude = get_prop(source, "longitude").as_f64();
    let accuracy = get_prop(source, "accuracy").as_f64();
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => {
            let sample = LocationSample::new(lat, lon, accuracy, js_sys::Date::now() as i64);
            if sample.is_valid() {
                Ok(sample)
            } else {
                Err(AppError::Parse(format!("coordenadas fuera de rango: {}, {}", lat, lon)))
            }
        }
        _ => Err(AppError::Parse("respuesta de ubicación sin coordenadas".to_string())),
    }
}

fn current_href() -> String {
    web_sys::window()
        .and_then(|w| w.location().href().ok())
        .unwrap_or_default()
}

// ============================================================================
// wx (páginas de asistencia)
// ============================================================================

/// Bridge basado en `wx.*`; la disponibilidad se guarda en AppState
#[derive(Clone)]
pub struct WxBridge {
    state: AppState,
}

impl WxBridge {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Handshake `wx.config` → `wx.ready` / `wx.error`
    pub async fn configure(&self, api: &ApiClient) -> AppResult<()> {
        if !wecom_ffi::sdk_loaded("wx") {
            log::warn!("⚠️ [BRIDGE] JS-SDK no cargado");
            return Err(AppError::Unavailable);
        }

        let config = api.wechat_config(&signable_url(&current_href())).await?;
        let options = to_js_object(&serde_json::json!({
            "beta": true,
            "debug": false,
            "appId": config.corp_id.clone().unwrap_or_else(|| CONFIG.wechat_corp_id.clone()),
            "timestamp": config.timestamp,
            "nonceStr": config.nonce_str,
            "signature": config.signature,
            "jsApiList": WX_JS_API_LIST,
        }))?;

        let mut setup: Option<JsValue> = None;
        let promise = js_sys::Promise::new(&mut |resolve: js_sys::Function, reject: js_sys::Function| {
            let call = wecom_ffi::wx_config(&options).and_then(|_| {
                let on_ready = Closure::once_into_js(move || {
                    let _ = resolve.call0(&JsValue::NULL);
                });
                let on_error = Closure::once_into_js(move |res: JsValue| {
                    let _ = reject.call1(&JsValue::NULL, &res);
                });
                wecom_ffi::wx_ready(on_ready.unchecked_ref())?;
                wecom_ffi::wx_error(on_error.unchecked_ref())
            });
            if let Err(e) = call {
                setup = Some(e);
            }
        });
        if let Some(e) = setup {
            return Err(AppError::from_js(&e));
        }

        match JsFuture::from(promise).await {
            Ok(_) => {
                self.state.set_bridge_ready(true);
                log::info!("✅ [BRIDGE] JS-SDK listo");
                Ok(())
            }
            Err(e) => {
                self.state.set_bridge_ready(false);
                log::error!("❌ [BRIDGE] wx.config rechazado: {:?}", e);
                // Firma inválida = dependencia sin inicializar
                Err(AppError::BridgeNotReady)
            }
        }
    }

    fn ensure_ready(&self) -> AppResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(AppError::BridgeNotReady)
        }
    }
}

#[async_trait(?Send)]
impl PlatformBridge for WxBridge {
    fn is_ready(&self) -> bool {
        self.state.is_bridge_ready()
    }

    async fn get_location(&self) -> AppResult<LocationSample> {
        self.ensure_ready()?;
        let options = to_js_object(&serde_json::json!({ "type": "gcj02" }))?;
        match call_with_callbacks("getLocation", options, wecom_ffi::wx_get_location).await {
            Ok(res) => sample_from_js(&res),
            Err(bridge_err) if !should_fallback_to_browser(&bridge_err) => {
                log::warn!("⚠️ [BRIDGE] getLocation: {}, sin alternativa", bridge_err);
                Err(bridge_err)
            }
            Err(bridge_err) => {
                log::info!("📍 [BRIDGE] Probando geolocalización del navegador");
                browser_geolocation().await.map_err(|browser_err| {
                    log::warn!("⚠️ [BRIDGE] Geolocalización del navegador: {}", browser_err);
                    bridge_err
                })
            }
        }
    }

    async fn choose_image(&self) -> AppResult<String> {
        self.ensure_ready()?;
        let options = to_js_object(&serde_json::json!({
            "count": 1,
            "sizeType": ["compressed"],
            "sourceType": ["camera", "album"],
        }))?;
        let res = call_with_callbacks("chooseImage", options, wecom_ffi::wx_choose_image).await?;
        let ids = js_sys::Array::from(&get_prop(&res, "localIds"));
        ids.get(0)
            .as_string()
            .ok_or_else(|| AppError::Parse("chooseImage sin localIds".to_string()))
    }

    async fn upload_image(&self, local_id: &str) -> AppResult<String> {
        self.ensure_ready()?;
        let options = to_js_object(&serde_json::json!({ "localId": local_id, "isShowProgressTips": 1 }))?;
        let res = call_with_callbacks("uploadImage", options, wecom_ffi::wx_upload_image).await?;
        get_prop(&res, "serverId")
            .as_string()
            .ok_or_else(|| AppError::Parse("uploadImage sin serverId".to_string()))
    }

    async fn scan_code(&self) -> AppResult<String> {
        self.ensure_ready()?;
        let options = to_js_object(&serde_json::json!({ "needResult": 1, "scanType": ["qrCode", "barCode"] }))?;
        let res = call_with_callbacks("scanQRCode", options, wecom_ffi::wx_scan_qr_code).await?;
        get_prop(&res, "resultStr")
            .as_string()
            .ok_or_else(|| AppError::Parse("scanQRCode sin resultStr".to_string()))
    }
}

// ============================================================================
// ww (mini-app de registro): solo escaneo
// ============================================================================

#[derive(Clone)]
pub struct WwScanBridge {
    ready: std::rc::Rc<std::cell::Cell<bool>>,
}

impl Default for WwScanBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl WwScanBridge {
    pub fn new() -> Self {
        Self { ready: std::rc::Rc::new(std::cell::Cell::new(false)) }
    }

    /// `ww.register` con firma obtenida bajo demanda
    pub fn register(&self, api: ApiClient) -> AppResult<()> {
        if !wecom_ffi::sdk_loaded("ww") {
            log::error!("❌ [BRIDGE] wecom-jssdk no cargado");
            return Err(AppError::Unavailable);
        }

        let get_signature = Closure::wrap(Box::new(move |url: JsValue| -> js_sys::Promise {
            let api = api.clone();
            let url = url.as_string().unwrap_or_else(|| signable_url(&current_href()));
            future_to_promise(async move {
                log::info!("🔏 [BRIDGE] Firma ww para {}", url);
                let signature = api.wework_signature(&url).await.map_err(JsValue::from)?;
                to_js_object(&signature).map_err(JsValue::from)
            })
        }) as Box<dyn FnMut(JsValue) -> js_sys::Promise>);

        let options = to_js_object(&serde_json::json!({
            "corpId": CONFIG.wechat_corp_id,
            "agentId": CONFIG.wechat_agent_id.parse::<u64>().unwrap_or_default(),
            "jsApiList": ["scanQRCode"],
        }))?;
        set_prop(&options, "getConfigSignature", get_signature.as_ref())?;
        // Vive mientras viva la página
        get_signature.forget();

        wecom_ffi::ww_register(&options).map_err(|e| {
            log::error!("❌ [BRIDGE] ww.register falló: {:?}", e);
            AppError::BridgeNotReady
        })?;
        self.ready.set(true);
        log::info!("✅ [BRIDGE] ww registrado");
        Ok(())
    }
}

#[async_trait(?Send)]
impl PlatformBridge for WwScanBridge {
    fn is_ready(&self) -> bool {
        self.ready.get()
    }

    async fn get_location(&self) -> AppResult<LocationSample> {
        Err(AppError::Unavailable)
    }

    async fn choose_image(&self) -> AppResult<String> {
        Err(AppError::Unavailable)
    }

    async fn upload_image(&self, _local_id: &str) -> AppResult<String> {
        Err(AppError::Unavailable)
    }

    async fn scan_code(&self) -> AppResult<String> {
        if !self.is_ready() {
            return Err(AppError::BridgeNotReady);
        }
        let options = to_js_object(&serde_json::json!({ "needResult": 1, "scanType": ["qrCode", "barCode"] }))?;
        let res = call_with_callbacks("scanQRCode", options, wecom_ffi::ww_scan_qr_code).await?;
        get_prop(&res, "resultStr")
            .as_string()
            .ok_or_else(|| AppError::Parse("scanQRCode sin resultStr".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_refusal_skips_browser_fallback() {
        assert!(!should_fallback_to_browser(&AppError::PermissionDenied));
        assert!(!should_fallback_to_browser(&AppError::Cancelled));
        assert!(should_fallback_to_browser(&AppError::Timeout));
        assert!(should_fallback_to_browser(&AppError::Unavailable));
        assert!(should_fallback_to_browser(&AppError::Other("getLocation:fail".to_string())));
    }
}
