// ============================================================================
// ERRORES - Clasificación estructurada en la frontera bridge / HTTP
// ============================================================================
// Los mensajes crudos del bridge (errMsg), los códigos de geolocalización y
// los nombres de DOMException se clasifican UNA sola vez aquí. El resto del
// código hace match sobre el tipo, nunca sobre el texto.
// ============================================================================

use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::utils::i18n::{t, Language};

pub type AppResult<T> = Result<T, AppError>;

/// Error de dominio de la app
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("platform bridge not ready")]
    BridgeNotReady,

    #[error("permission denied")]
    PermissionDenied,

    #[error("operation timed out")]
    Timeout,

    #[error("capability unavailable")]
    Unavailable,

    #[error("cancelled by user")]
    Cancelled,

    #[error("network error: {0}")]
    Network(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Clave i18n del mensaje de validación
    #[error("validation failed: {0}")]
    Validation(&'static str),

    #[error("authorization expired")]
    AuthExpired,

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// Taxonomía de alto nivel usada por la UI para decidir la reacción
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Dependencia sin inicializar: fallo inmediato, acción deshabilitada
    NotReady,
    /// Red / servidor / dispositivo: reintentable
    Transient,
    /// Formulario inválido, nunca se reintenta
    Validation,
    /// Sesión caducada: limpiar identidad y ofrecer re-login
    Authorization,
    Other,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::BridgeNotReady => ErrorKind::NotReady,
            AppError::Network(_)
            | AppError::Server { .. }
            | AppError::Timeout
            | AppError::Unavailable => ErrorKind::Transient,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::AuthExpired => ErrorKind::Authorization,
            AppError::PermissionDenied
            | AppError::Cancelled
            | AppError::Parse(_)
            | AppError::Other(_) => ErrorKind::Other,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        self.kind() == ErrorKind::Authorization
    }

    /// Mensaje bilingüe para mostrar al usuario
    pub fn user_message(&self, lang: Language) -> String {
        match self {
            AppError::BridgeNotReady => t("bridge_not_ready", lang),
            AppError::PermissionDenied => t("location_permission_denied", lang),
            AppError::Timeout => t("location_timeout", lang),
            AppError::Unavailable => t("location_unavailable", lang),
            AppError::Network(_) => t("network_error", lang),
            AppError::Server { message, .. } if !message.trim().is_empty() => message.clone(),
            AppError::Server { .. } => t("server_error", lang),
            AppError::Validation(key) => t(key, lang),
            AppError::AuthExpired => t("auth_expired", lang),
            AppError::Cancelled | AppError::Parse(_) | AppError::Other(_) => t("error", lang),
        }
    }

    /// Convierte un error JS arbitrario (promesa rechazada, excepción) en AppError
    pub fn from_js(value: &JsValue) -> Self {
        if let Some(text) = value.as_string() {
            return classify_bridge_error(&text);
        }
        let message = js_sys::Reflect::get(value, &JsValue::from_str("errMsg"))
            .ok()
            .and_then(|v| v.as_string())
            .or_else(|| {
                js_sys::Reflect::get(value, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|v| v.as_string())
            })
            .unwrap_or_else(|| format!("{:?}", value));
        classify_bridge_error(&message)
    }
}

impl From<gloo_net::Error> for AppError {
    fn from(err: gloo_net::Error) -> Self {
        match err {
            gloo_net::Error::SerdeError(e) => AppError::Parse(e.to_string()),
            other => AppError::Network(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<AppError> for JsValue {
    fn from(err: AppError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

// ============================================================================
// CLASIFICADORES (puros, testeables sin navegador)
// ============================================================================

/// Clasificar el `errMsg` de un callback `fail` del JS-SDK
///
/// Formato típico: `"getLocation:fail auth deny"`, `"chooseImage:cancel"`.
pub fn classify_bridge_error(err_msg: &str) -> AppError {
    let msg = err_msg.to_lowercase();

    if msg.contains("cancel") {
        AppError::Cancelled
    } else if msg.contains("auth deny")
        || msg.contains("denied")
        || msg.contains("permission")
        || msg.contains("no permission")
    {
        AppError::PermissionDenied
    } else if msg.contains("timeout") || msg.contains("timed out") {
        AppError::Timeout
    } else if msg.contains("invalid signature") || msg.contains("not ready") || msg.contains("config:") {
        AppError::BridgeNotReady
    } else if msg.contains("function_not_exist")
        || msg.contains("unavailable")
        || msg.contains("not support")
    {
        AppError::Unavailable
    } else {
        AppError::Other(err_msg.to_string())
    }
}

/// Códigos W3C de `GeolocationPositionError`
pub fn classify_geolocation_code(code: u16) -> AppError {
    match code {
        1 => AppError::PermissionDenied,
        2 => AppError::Unavailable,
        3 => AppError::Timeout,
        other => AppError::Other(format!("geolocation error code {}", other)),
    }
}

/// Patrones con los que el backend señala credenciales caducadas
pub fn is_auth_expired_message(message: &str) -> bool {
    message.contains("Invalid authorization code")
        || message.contains("授权码过期")
        || message.contains("授权码已失效")
        || message.contains("401")
        || message.contains("403")
}

/// Clasificar una respuesta HTTP fallida (status + mensaje del envelope)
pub fn classify_http_failure(status: u16, message: &str) -> AppError {
    if status == 401 || status == 403 || is_auth_expired_message(message) {
        AppError::AuthExpired
    } else {
        AppError::Server {
            status,
            message: message.to_string(),
        }
    }
}

// ============================================================================
// CÁMARA - getUserMedia
// ============================================================================

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    NotAllowed,
    #[error("no camera found")]
    NotFound,
    #[error("camera busy")]
    NotReadable,
    #[error("camera constraints not satisfiable")]
    Overconstrained,
    #[error("insecure context")]
    Security,
    #[error("camera start timed out")]
    Timeout,
    #[error("getUserMedia not supported")]
    Unsupported,
    #[error("camera error")]
    Other,
}

impl CameraError {
    /// A partir de `DOMException.name`
    pub fn from_dom_name(name: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => CameraError::NotAllowed,
            "NotFoundError" | "DevicesNotFoundError" => CameraError::NotFound,
            "NotReadableError" | "TrackStartError" => CameraError::NotReadable,
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => CameraError::Overconstrained,
            "SecurityError" => CameraError::Security,
            "TimeoutError" => CameraError::Timeout,
            _ => CameraError::Other,
        }
    }

    /// Solo estos errores justifican probar con otra cámara
    pub fn allows_fallback(&self) -> bool {
        matches!(self, CameraError::NotFound | CameraError::Overconstrained | CameraError::NotReadable)
    }

    pub fn user_message(&self, lang: Language) -> String {
        let key = match self {
            CameraError::NotAllowed => "camera_denied",
            CameraError::NotFound => "camera_not_found",
            CameraError::NotReadable => "camera_busy",
            CameraError::Overconstrained => "camera_overconstrained",
            CameraError::Security => "camera_insecure",
            CameraError::Timeout => "camera_timeout",
            CameraError::Unsupported => "camera_unsupported",
            CameraError::Other => "camera_error",
        };
        t(key, lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_messages_are_classified_once() {
        assert_eq!(classify_bridge_error("getLocation:fail auth deny"), AppError::PermissionDenied);
        assert_eq!(classify_bridge_error("getLocation:fail timeout"), AppError::Timeout);
        assert_eq!(classify_bridge_error("chooseImage:cancel"), AppError::Cancelled);
        assert_eq!(classify_bridge_error("config:invalid signature"), AppError::BridgeNotReady);
        assert_eq!(classify_bridge_error("scanQRCode:fail function_not_exist"), AppError::Unavailable);
        assert_eq!(
            classify_bridge_error("getLocation:fail weird"),
            AppError::Other("getLocation:fail weird".to_string())
        );
    }

    #[test]
    fn test_geolocation_codes() {
        assert_eq!(classify_geolocation_code(1), AppError::PermissionDenied);
        assert_eq!(classify_geolocation_code(2), AppError::Unavailable);
        assert_eq!(classify_geolocation_code(3), AppError::Timeout);
    }

    #[test]
    fn test_http_auth_failures() {
        assert_eq!(classify_http_failure(401, ""), AppError::AuthExpired);
        assert_eq!(classify_http_failure(200, "Invalid authorization code"), AppError::AuthExpired);
        assert_eq!(classify_http_failure(400, "授权码过期"), AppError::AuthExpired);
        assert!(matches!(classify_http_failure(500, "boom"), AppError::Server { status: 500, .. }));
    }

    #[test]
    fn test_kinds_follow_taxonomy() {
        assert_eq!(AppError::BridgeNotReady.kind(), ErrorKind::NotReady);
        assert_eq!(AppError::Network("x".into()).kind(), ErrorKind::Transient);
        assert_eq!(AppError::Validation("photo_required").kind(), ErrorKind::Validation);
        assert!(AppError::AuthExpired.is_auth_expired());
    }

    #[test]
    fn test_unclassified_errors_use_generic_message() {
        let err = AppError::Other("¿?".to_string());
        assert_eq!(err.user_message(Language::English), "Operation failed");
        assert_eq!(err.user_message(Language::Chinese), "操作失败");
    }

    #[test]
    fn test_server_message_is_shown_when_present() {
        let err = AppError::Server { status: 400, message: "今日已签到".to_string() };
        assert_eq!(err.user_message(Language::English), "今日已签到");
        let empty = AppError::Server { status: 500, message: String::new() };
        assert_eq!(empty.user_message(Language::English), "Server error, please try again later");
    }

    #[test]
    fn test_camera_errors() {
        assert_eq!(CameraError::from_dom_name("NotAllowedError"), CameraError::NotAllowed);
        assert_eq!(CameraError::from_dom_name("OverconstrainedError"), CameraError::Overconstrained);
        assert!(CameraError::NotFound.allows_fallback());
        assert!(!CameraError::NotAllowed.allows_fallback());
        assert_eq!(CameraError::Security.user_message(Language::English), "Security error: please use HTTPS");
    }
}
