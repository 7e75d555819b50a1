// ============================================================================
// WECOM JS-SDK FFI - Foreign Function Interface para JavaScript
// ============================================================================
// Wrappers para `wx.*` (JS-SDK clásico, páginas de asistencia) y `ww.*`
// (SDK nuevo, mini-app de registro). Sin estado, sin lógica: todas las
// llamadas usan `catch` porque el SDK puede no estar cargado.
// ============================================================================

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    // ---- wx (jweixin) ----
    #[wasm_bindgen(catch, js_namespace = wx, js_name = config)]
    pub fn wx_config(options: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = wx, js_name = ready)]
    pub fn wx_ready(callback: &js_sys::Function) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = wx, js_name = error)]
    pub fn wx_error(callback: &js_sys::Function) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = wx, js_name = getLocation)]
    pub fn wx_get_location(options: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = wx, js_name = chooseImage)]
    pub fn wx_choose_image(options: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = wx, js_name = uploadImage)]
    pub fn wx_upload_image(options: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = wx, js_name = scanQRCode)]
    pub fn wx_scan_qr_code(options: &JsValue) -> Result<(), JsValue>;

    // ---- ww (wecom-jssdk) ----
    #[wasm_bindgen(catch, js_namespace = ww, js_name = register)]
    pub fn ww_register(options: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = ww, js_name = scanQRCode)]
    pub fn ww_scan_qr_code(options: &JsValue) -> Result<(), JsValue>;
}

/// `true` si el objeto global `name` (wx / ww) existe
pub fn sdk_loaded(name: &str) -> bool {
    js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str(name))
        .map(|v| !v.is_undefined() && !v.is_null())
        .unwrap_or(false)
}
