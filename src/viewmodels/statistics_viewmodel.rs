// ============================================================================
// STATISTICS VIEWMODEL - Calendario mensual y resumen de asistencia
// ============================================================================

use std::cell::RefCell;

use chrono::{Datelike, NaiveDate};

use crate::errors::{AppError, AppResult};
use crate::models::attendance::{AttendanceRecord, AttendanceStats};
use crate::models::calendar::{build_month, day_statuses, summarize, CalendarCell, MonthSummary};
use crate::services::api_client::StatsQuery;
use crate::services::attendance_service::AttendanceGateway;
use crate::state::app_state::AppState;
use crate::utils::i18n::t;

/// Todo lo que la vista necesita para pintar un mes
#[derive(Clone, Debug, PartialEq)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<CalendarCell>,
    pub summary: MonthSummary,
}

/// Detalle de un día pulsado
#[derive(Clone, Debug, PartialEq)]
pub struct DayDetail {
    pub record: AttendanceRecord,
    /// Edificio del propio registro o "ubicación desconocida"
    pub building: String,
}

pub struct StatisticsViewModel<G> {
    state: AppState,
    gateway: G,
    records: RefCell<Vec<AttendanceRecord>>,
}

impl<G: AttendanceGateway> StatisticsViewModel<G> {
    pub fn new(state: AppState, gateway: G) -> Self {
        Self { state, gateway, records: RefCell::new(Vec::new()) }
    }

    pub async fn load_month(&self, year: i32, month: u32, today: NaiveDate) -> AppResult<MonthView> {
        let user = self.state.complete_user().ok_or(AppError::Validation("user_info_missing"))?;
        log::info!("📅 [STATISTICS] Cargando {}-{:02}", year, month);

        let records = match self.gateway.records(&user.student_id, None).await {
            Ok(records) => records,
            Err(err) => return Err(self.fail(err)),
        };
        let month_records: Vec<AttendanceRecord> = records
            .into_iter()
            .filter(|r| r.date().is_some_and(|d| d.year() == year && d.month() == month))
            .collect();

        let server_stats = match self.gateway.statistics(&user.student_id, StatsQuery::Month { year, month }).await {
            Ok(stats) => Some(stats),
            Err(err) if err.is_auth_expired() => return Err(self.fail(err)),
            Err(err) => {
                log::warn!("⚠️ [STATISTICS] Estadísticas del servidor no disponibles: {}", err);
                None
            }
        };

        let statuses = day_statuses(&month_records, year, month);
        let summary = server_stats
            .filter(|s| s.total_days > 0)
            .map(summary_from_stats)
            .unwrap_or_else(|| summarize(&statuses));
        let cells = build_month(year, month, today, &statuses);

        *self.records.borrow_mut() = month_records;
        Ok(MonthView { year, month, cells, summary })
    }

    /// Último registro del día, si existe
    pub fn day_detail(&self, date: NaiveDate) -> Option<DayDetail> {
        let lang = self.state.lang();
        let record = self
            .records
            .borrow()
            .iter()
            .filter(|r| r.date() == Some(date))
            .max_by_key(|r| r.signed_at)
            .cloned()?;
        let building = record.building.clone().unwrap_or_else(|| t("unknown_location", lang));
        Some(DayDetail { record, building })
    }

    fn fail(&self, err: AppError) -> AppError {
        if err.is_auth_expired() {
            log::warn!("🔐 [STATISTICS] Autorización caducada");
            self.state.clear_user();
        } else {
            log::error!("❌ [STATISTICS] {}", err);
        }
        err
    }
}

fn summary_from_stats(stats: AttendanceStats) -> MonthSummary {
    MonthSummary {
        attended_days: stats.attended_days + stats.late_days,
        missed_days: stats.absent_days,
        attendance_rate: stats.attendance_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance::{AttendanceStatus, TimeRange};
    use crate::models::building::{BuildingResolution, LocationInfo};
    use crate::state::app_state::BUILDING_CACHE_KEY;
    use crate::models::calendar::{DayStatus, CALENDAR_CELLS};
    use crate::models::user::UserInfo;
    use crate::utils::format::parse_server_datetime;
    use crate::utils::i18n::Language;
    use async_trait::async_trait;
    use futures::executor::block_on;

    struct FakeGateway {
        records: Vec<AttendanceRecord>,
        stats: AppResult<AttendanceStats>,
    }

    #[async_trait(?Send)]
    impl AttendanceGateway for FakeGateway {
        async fn records(&self, _student_id: &str, _range: Option<TimeRange>) -> AppResult<Vec<AttendanceRecord>> {
            Ok(self.records.clone())
        }
        async fn statistics(&self, _student_id: &str, _query: StatsQuery) -> AppResult<AttendanceStats> {
            self.stats.clone()
        }
    }

    fn record(at: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: None,
            name: "张三".into(),
            student_id: "2021150001".into(),
            course: "操作系统".into(),
            classroom: "A101".into(),
            location: "致腾楼".into(),
            building: Some("致腾楼".into()),
            status,
            signed_at: parse_server_datetime(at),
            photo_url: None,
            latitude: Some(22.53),
            longitude: Some(113.93),
        }
    }

    fn state() -> AppState {
        let state = AppState::with_language(Language::English);
        state.set_user(UserInfo { student_id: "2021150001".into(), name: "张三".into(), ..Default::default() });
        state
    }

    fn gateway(stats: AppResult<AttendanceStats>) -> FakeGateway {
        FakeGateway {
            records: vec![
                record("2024-03-04 08:00:00", AttendanceStatus::Attended),
                record("2024-03-05 08:20:00", AttendanceStatus::Late),
                record("2024-03-06 08:00:00", AttendanceStatus::Absent),
                record("2024-02-28 08:00:00", AttendanceStatus::Attended),
            ],
            stats,
        }
    }

    #[test]
    fn test_month_uses_local_summary_when_server_fails() {
        let vm = StatisticsViewModel::new(state(), gateway(Err(AppError::Network("x".into()))));
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        let view = block_on(vm.load_month(2024, 3, today)).unwrap();

        assert_eq!(view.cells.len(), CALENDAR_CELLS);
        assert_eq!(view.summary, MonthSummary { attended_days: 2, missed_days: 1, attendance_rate: 50 });
        let fifth = view.cells.iter().find(|c| c.date == Some(today)).unwrap();
        assert!(fifth.is_today);
        assert_eq!(fifth.status, Some(DayStatus::Partial));
    }

    #[test]
    fn test_server_stats_take_precedence() {
        let stats = AttendanceStats::from_counts(10, 2, 1);
        let vm = StatisticsViewModel::new(state(), gateway(Ok(stats)));
        let view = block_on(vm.load_month(2024, 3, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())).unwrap();

        assert_eq!(view.summary.attended_days, 12);
        assert_eq!(view.summary.missed_days, 1);
        assert_eq!(view.summary.attendance_rate, 85);
    }

    #[test]
    fn test_auth_expiry_clears_identity() {
        let state = state();
        let vm = StatisticsViewModel::new(state.clone(), gateway(Err(AppError::AuthExpired)));

        let result = block_on(vm.load_month(2024, 3, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        assert_eq!(result, Err(AppError::AuthExpired));
        assert!(state.user().is_none());
    }

    #[test]
    fn test_day_detail_shows_record_building_not_current_location() {
        let state = state();
        // Resolución de la sesión actual: no debe filtrarse a registros antiguos
        let info: LocationInfo = serde_json::from_value(serde_json::json!({
            "building": { "name": "汇文楼", "name_en": "Huiwen" },
            "is_valid_location": true
        }))
        .unwrap();
        let resolution = BuildingResolution::from(info);
        state.cache_set(BUILDING_CACHE_KEY, &resolution);
        let vm = StatisticsViewModel::new(state, gateway(Ok(AttendanceStats::default())));
        block_on(vm.load_month(2024, 3, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())).unwrap();

        let detail = vm.day_detail(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()).unwrap();
        assert_eq!(detail.record.course, "操作系统");
        assert_eq!(detail.building, "致腾楼");
    }

    #[test]
    fn test_day_detail_falls_back_to_unknown_building() {
        let mut records = gateway(Ok(AttendanceStats::default()));
        for r in records.records.iter_mut() {
            r.building = None;
        }
        let vm = StatisticsViewModel::new(state(), records);
        block_on(vm.load_month(2024, 3, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())).unwrap();

        let detail = vm.day_detail(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()).unwrap();
        assert_eq!(detail.building, "Unknown location");
        assert!(vm.day_detail(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()).is_none());
        // Fuera del mes cargado
        assert!(vm.day_detail(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()).is_none());
    }
}
