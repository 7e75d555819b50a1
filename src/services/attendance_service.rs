// ============================================================================
// ATTENDANCE SERVICE - Registros y estadísticas normalizados
// ============================================================================

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::attendance::{AttendanceRecord, AttendanceStats, TimeRange};
use crate::services::api_client::{ApiClient, StatsQuery};

#[async_trait(?Send)]
pub trait AttendanceGateway {
    async fn records(&self, student_id: &str, range: Option<TimeRange>) -> AppResult<Vec<AttendanceRecord>>;
    async fn statistics(&self, student_id: &str, query: StatsQuery) -> AppResult<AttendanceStats>;
}

#[async_trait(?Send)]
impl AttendanceGateway for ApiClient {
    async fn records(&self, student_id: &str, range: Option<TimeRange>) -> AppResult<Vec<AttendanceRecord>> {
        let raw = self.attendance_records(student_id, range).await?;
        log::info!("📋 [ATTENDANCE] {} registros recibidos", raw.len());
        Ok(raw.into_iter().map(AttendanceRecord::from).collect())
    }

    async fn statistics(&self, student_id: &str, query: StatsQuery) -> AppResult<AttendanceStats> {
        self.attendance_statistics(student_id, query).await
    }
}
