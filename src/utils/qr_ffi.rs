// ============================================================================
// jsQR FFI - decodificador de códigos QR (librería externa)
// ============================================================================

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    /// `jsQR(data, width, height, options)` → `{ data, ... } | null`
    #[wasm_bindgen(catch, js_name = jsQR)]
    pub fn js_qr(
        data: &js_sys::Uint8ClampedArray,
        width: u32,
        height: u32,
        options: &JsValue,
    ) -> Result<JsValue, JsValue>;
}

pub fn js_qr_loaded() -> bool {
    crate::utils::wecom_ffi::sdk_loaded("jsQR")
}
