// ============================================================================
// API CLIENT - SOLO COMUNICACIÓN HTTP (Stateless)
// ============================================================================
// NO tiene lógica de negocio, solo hace requests HTTP y clasifica los
// fallos en AppError en la propia frontera.
// ============================================================================

use gloo_net::http::{Request, Response};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::CONFIG;
use crate::errors::{classify_http_failure, AppError, AppResult};
use crate::models::api::{ApiEnvelope, CodeEnvelope};
use crate::models::attendance::{AttendanceStats, RawAttendanceRecord, RecordsPayload, TimeRange, RECORDS_FETCH_LIMIT};
use crate::models::building::{LocationInfo, LocationInfoRequest};
use crate::models::feedback::{FeedbackSubmission, UploadedImage};
use crate::models::material::{
    ConfirmReceiveRequest, CurrentUser, HandlerStat, ManualLookupRequest, RecentRecord, ScanRequest, StudentLookup,
};
use crate::models::signin::SignInRequest;
use crate::models::user::{CasLogin, CasStatus, UserInfo};
use crate::models::wecom::{ConfigRequest, WeChatConfig, WeWorkSignature};

/// Filtro temporal de `/api/attendance/statistics`
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StatsQuery {
    Range(TimeRange),
    Month { year: i32, month: u32 },
}

/// Cliente API - SOLO comunicación HTTP (stateless)
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            base_url: CONFIG.api_base_url.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> AppResult<T> {
        let url = self.url(path);
        let response = Request::get(&url)
            .header("Accept", "application/json")
            .query(query.iter().map(|(k, v)| (*k, v.as_str())))
            .send()
            .await
            .map_err(|e| {
                log::error!("❌ [API] GET {} falló: {}", path, e);
                AppError::from(e)
            })?;
        Self::decode(path, response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<T> {
        let url = self.url(path);
        let response = Request::post(&url)
            .json(body)?
            .send()
            .await
            .map_err(|e| {
                log::error!("❌ [API] POST {} falló: {}", path, e);
                AppError::from(e)
            })?;
        Self::decode(path, response).await
    }

    /// Respuestas no-2xx: se extrae `message`/`msg` del cuerpo si existe
    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> AppResult<T> {
        let status = response.status();
        if response.ok() {
            return response.json::<T>().await.map_err(|e| {
                log::error!("❌ [API] {}: respuesta ilegible: {}", path, e);
                AppError::from(e)
            });
        }

        let status_text = response.status_text();
        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body).unwrap_or_else(|| format!("HTTP {}: {}", status, status_text));
        log::error!("❌ [API] {} → HTTP {}: {}", path, status, message);
        Err(classify_http_failure(status, &message))
    }

    /// Para endpoints que devuelven `{code, msg, ...}` también con status de error
    async fn post_lenient<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<T> {
        let url = self.url(path);
        let response = Request::post(&url).json(body)?.send().await?;
        let status = response.status();
        let text = response.text().await?;
        serde_json::from_str::<T>(&text).map_err(|e| {
            log::error!("❌ [API] {} → HTTP {}: cuerpo inesperado ({})", path, status, e);
            if (200..300).contains(&status) {
                AppError::from(e)
            } else {
                classify_http_failure(status, &extract_message(&text).unwrap_or_default())
            }
        })
    }

    // ========================================================================
    // PLATAFORMA / IDENTIDAD
    // ========================================================================

    /// Firma para `wx.config`
    pub async fn wechat_config(&self, url: &str) -> AppResult<WeChatConfig> {
        log::info!("🔏 [API] Solicitando firma JS-SDK");
        self.post_json("/api/wechat/config", &ConfigRequest { url: url.to_string(), kind: None })
            .await
    }

    /// Intercambio del `code` OAuth por la identidad
    pub async fn wechat_userinfo(&self, code: &str) -> AppResult<UserInfo> {
        let envelope: ApiEnvelope<UserInfo> = self
            .post_json("/api/wechat/userinfo", &serde_json::json!({ "code": code }))
            .await?;
        envelope.into_data()
    }

    pub async fn cas_status(&self) -> AppResult<CasStatus> {
        self.get_json("/cas/status", &[]).await
    }

    pub async fn cas_login(&self) -> AppResult<CasLogin> {
        self.get_json("/cas/login", &[]).await
    }

    // ========================================================================
    // ASISTENCIA
    // ========================================================================

    pub async fn location_info(&self, request: &LocationInfoRequest) -> AppResult<LocationInfo> {
        let envelope: ApiEnvelope<LocationInfo> = self
            .post_json("/api/attendance/location-info", request)
            .await?;
        envelope.into_data()
    }

    pub async fn sign_in(&self, request: &SignInRequest) -> AppResult<Option<String>> {
        log::info!("📝 [API] Enviando firma de {} ({})", request.student_id, request.course_name);
        let envelope: ApiEnvelope<serde_json::Value> = self.post_json("/signin", request).await?;
        envelope.into_unit()
    }

    pub async fn attendance_records(
        &self,
        student_id: &str,
        range: Option<TimeRange>,
    ) -> AppResult<Vec<RawAttendanceRecord>> {
        let mut query = vec![
            ("student_id", student_id.to_string()),
            ("per_page", RECORDS_FETCH_LIMIT.to_string()),
        ];
        if let Some(range) = range {
            query.push(("time_range", range.code().to_string()));
        }
        let envelope: ApiEnvelope<RecordsPayload> = self.get_json("/api/attendance/records", &query).await?;
        Ok(envelope.into_data()?.records)
    }

    pub async fn attendance_statistics(&self, student_id: &str, filter: StatsQuery) -> AppResult<AttendanceStats> {
        let mut query = vec![("student_id", student_id.to_string())];
        match filter {
            StatsQuery::Range(range) => query.push(("time_range", range.code().to_string())),
            StatsQuery::Month { year, month } => {
                query.push(("year", year.to_string()));
                query.push(("month", month.to_string()));
            }
        }
        let envelope: ApiEnvelope<AttendanceStats> = self.get_json("/api/attendance/statistics", &query).await?;
        envelope.into_data()
    }

    // ========================================================================
    // FEEDBACK
    // ========================================================================

    /// Sube una imagen (multipart) y devuelve el nombre asignado por el servidor
    pub async fn upload_feedback_image(&self, file: &web_sys::File) -> AppResult<String> {
        let form = web_sys::FormData::new().map_err(|e| AppError::from_js(&e))?;
        form.append_with_blob_and_filename("file", file, &file.name())
            .map_err(|e| AppError::from_js(&e))?;

        let url = self.url("/api/feedback/upload");
        let response = Request::post(&url).body(form)?.send().await?;
        let envelope: ApiEnvelope<UploadedImage> = Self::decode("/api/feedback/upload", response).await?;
        Ok(envelope.into_data()?.filename)
    }

    pub async fn submit_feedback(&self, submission: &FeedbackSubmission) -> AppResult<Option<String>> {
        let envelope: ApiEnvelope<serde_json::Value> = self.post_json("/api/feedback/submit", submission).await?;
        envelope.into_unit()
    }

    // ========================================================================
    // MINI-APP DE REGISTRO
    // ========================================================================

    pub async fn current_user(&self) -> AppResult<CurrentUser> {
        let envelope: CodeEnvelope<CurrentUser> = self.get_json("/api/current-user", &[]).await?;
        envelope.into_data()
    }

    pub async fn recent_records(&self) -> AppResult<Vec<RecentRecord>> {
        let envelope: CodeEnvelope<Vec<RecentRecord>> = self.get_json("/api/my-recent-records", &[]).await?;
        match envelope.into_data() {
            // Sin registros el backend omite `data`
            Err(AppError::Parse(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    pub async fn scan_qrcode(&self, request: &ScanRequest) -> AppResult<StudentLookup> {
        self.post_lenient("/api/scan-qrcode", request).await
    }

    pub async fn manual_lookup(&self, request: &ManualLookupRequest) -> AppResult<StudentLookup> {
        self.post_lenient("/api/manual-lookup", request).await
    }

    pub async fn confirm_receive(&self, request: &ConfirmReceiveRequest) -> AppResult<Option<String>> {
        let envelope: CodeEnvelope<serde_json::Value> = self.post_lenient("/api/confirm-receive", request).await?;
        if envelope.is_ok() {
            Ok(envelope.msg)
        } else {
            Err(classify_http_failure(
                u16::try_from(envelope.code).unwrap_or(500),
                envelope.msg.as_deref().unwrap_or_default(),
            ))
        }
    }

    pub async fn handler_stats(&self) -> AppResult<Vec<HandlerStat>> {
        let envelope: CodeEnvelope<Vec<HandlerStat>> = self.get_json("/api/admin/handler-stats", &[]).await?;
        envelope.into_data()
    }

    pub async fn wework_signature(&self, url: &str) -> AppResult<WeWorkSignature> {
        let envelope: CodeEnvelope<WeWorkSignature> = self
            .post_json(
                "/api/wework-config-signature",
                &ConfigRequest { url: url.to_string(), kind: Some("config".to_string()) },
            )
            .await?;
        envelope.into_data()
    }
}

/// `message` o `msg` de un cuerpo JSON de error
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("msg"))
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(|m| m.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_from_error_body() {
        assert_eq!(extract_message(r#"{"success":false,"message":"学生不存在"}"#).as_deref(), Some("学生不存在"));
        assert_eq!(extract_message(r#"{"code":401,"msg":"未登录"}"#).as_deref(), Some("未登录"));
        assert_eq!(extract_message("<html>502</html>"), None);
        assert_eq!(extract_message(r#"{"message":""}"#), None);
    }
}
