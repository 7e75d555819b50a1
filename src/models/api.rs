use serde::{Deserialize, Serialize};

use crate::errors::{classify_http_failure, AppError, AppResult};

/// Envelope JSON del backend de asistencia: `{ success, data?, message? }`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// `data` obligatorio cuando `success == true`
    pub fn into_data(self) -> AppResult<T> {
        if !self.success {
            return Err(classify_http_failure(200, self.message.as_deref().unwrap_or_default()));
        }
        self.data.ok_or_else(|| AppError::Parse("respuesta sin campo data".to_string()))
    }

    /// Solo interesa el flag `success`
    pub fn into_unit(self) -> AppResult<Option<String>> {
        if self.success {
            Ok(self.message)
        } else {
            Err(classify_http_failure(200, self.message.as_deref().unwrap_or_default()))
        }
    }
}

/// Envelope del mini-app de registro: `{ code, msg, data? }` con code 200 = OK
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodeEnvelope<T> {
    pub code: i32,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> CodeEnvelope<T> {
    pub fn is_ok(&self) -> bool {
        self.code == 200
    }

    pub fn into_data(self) -> AppResult<T> {
        if !self.is_ok() {
            let status = u16::try_from(self.code).unwrap_or(500);
            return Err(classify_http_failure(status, self.msg.as_deref().unwrap_or_default()));
        }
        self.data.ok_or_else(|| AppError::Parse("respuesta sin campo data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_yields_data() {
        let env: ApiEnvelope<u32> = serde_json::from_str(r#"{"success":true,"data":7}"#).unwrap();
        assert_eq!(env.into_data().unwrap(), 7);
    }

    #[test]
    fn test_failed_envelope_keeps_message() {
        let env: ApiEnvelope<u32> =
            serde_json::from_str(r#"{"success":false,"message":"课程不存在"}"#).unwrap();
        assert_eq!(
            env.into_data(),
            Err(AppError::Server { status: 200, message: "课程不存在".to_string() })
        );
    }

    #[test]
    fn test_expired_code_is_authorization_error() {
        let env: ApiEnvelope<u32> =
            serde_json::from_str(r#"{"success":false,"message":"Invalid authorization code"}"#).unwrap();
        assert_eq!(env.into_data(), Err(AppError::AuthExpired));
    }

    #[test]
    fn test_code_envelope() {
        let ok: CodeEnvelope<String> = serde_json::from_str(r#"{"code":200,"data":"x"}"#).unwrap();
        assert_eq!(ok.into_data().unwrap(), "x");
        let denied: CodeEnvelope<String> = serde_json::from_str(r#"{"code":403,"msg":"无权限"}"#).unwrap();
        assert_eq!(denied.into_data(), Err(AppError::AuthExpired));
    }
}
