// ============================================================================
// MINI-APP DE REGISTRO DE NUEVOS ESTUDIANTES
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const MIN_CARD_NUMBER_LEN: usize = 6;

/// `data` de `/api/current-user`
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug, Default)]
pub struct CurrentUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub org_dn: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
}

impl CurrentUser {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}

/// Registro reciente (`/api/my-recent-records`)
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct RecentRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dept: String,
    #[serde(default)]
    pub received_at: String,
}

/// Respuesta de `/api/scan-qrcode` y `/api/manual-lookup` (campos en la raíz)
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct StudentLookup {
    pub code: i32,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub credential_no: String,
    #[serde(default)]
    pub dept: String,
    #[serde(default)]
    pub has_received: bool,
}

impl StudentLookup {
    pub fn is_ok(&self) -> bool {
        self.code == 200
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ScanRequest {
    pub qr_code: String,
    pub device_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ManualLookupRequest {
    pub card_number: String,
}

impl ManualLookupRequest {
    /// Número obligatorio, al menos 6 caracteres
    pub fn new(card_number: &str) -> Result<Self, AppError> {
        let card_number = card_number.trim();
        if card_number.is_empty() {
            return Err(AppError::Validation("card_number_required"));
        }
        if card_number.chars().count() < MIN_CARD_NUMBER_LEN {
            return Err(AppError::Validation("card_number_too_short"));
        }
        Ok(Self { card_number: card_number.to_string() })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ConfirmReceiveRequest {
    pub card_number: String,
    pub name: String,
    pub dept: String,
}

impl From<&StudentLookup> for ConfirmReceiveRequest {
    fn from(student: &StudentLookup) -> Self {
        Self {
            card_number: student.credential_no.clone(),
            name: student.name.clone(),
            dept: student.dept.clone(),
        }
    }
}

/// Fila de `/api/admin/handler-stats`
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct HandlerStat {
    #[serde(default)]
    pub handle_student_id: String,
    #[serde(default)]
    pub handle_name: String,
    #[serde(default)]
    pub count: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct HandlerOverview {
    pub total_handlers: usize,
    pub total_records: u32,
    /// Redondeado
    pub average: u32,
}

impl HandlerOverview {
    pub fn from_stats(stats: &[HandlerStat]) -> Self {
        let total_handlers = stats.len();
        let total_records: u32 = stats.iter().map(|s| s.count).sum();
        let average = if total_handlers == 0 {
            0
        } else {
            (total_records as f64 / total_handlers as f64).round() as u32
        };
        Self { total_handlers, total_records, average }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_lookup_validation() {
        assert_eq!(ManualLookupRequest::new("  ").unwrap_err(), AppError::Validation("card_number_required"));
        assert_eq!(ManualLookupRequest::new("12345").unwrap_err(), AppError::Validation("card_number_too_short"));
        assert_eq!(ManualLookupRequest::new(" 2024123456 ").unwrap().card_number, "2024123456");
    }

    #[test]
    fn test_lookup_response_fields_are_top_level() {
        let res: StudentLookup = serde_json::from_str(
            r#"{"code":200,"msg":"ok","name":"张三","credential_no":"2024123456","dept":"医学部","has_received":true}"#,
        )
        .unwrap();
        assert!(res.is_ok());
        assert!(res.has_received);
        let confirm = ConfirmReceiveRequest::from(&res);
        assert_eq!(confirm.card_number, "2024123456");
    }

    #[test]
    fn test_current_user_display_name() {
        let user: CurrentUser = serde_json::from_str(r#"{"username":"2024123456","name":"","org_dn":"医学部"}"#).unwrap();
        assert_eq!(user.display_name(), "2024123456");
    }

    #[test]
    fn test_handler_overview() {
        let stats = vec![
            HandlerStat { handle_student_id: "a".into(), handle_name: "A".into(), count: 10 },
            HandlerStat { handle_student_id: "b".into(), handle_name: "B".into(), count: 5 },
        ];
        let overview = HandlerOverview::from_stats(&stats);
        assert_eq!(overview.total_handlers, 2);
        assert_eq!(overview.total_records, 15);
        assert_eq!(overview.average, 8);
        assert_eq!(HandlerOverview::from_stats(&[]).average, 0);
    }
}
