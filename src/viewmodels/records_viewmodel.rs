// ============================================================================
// RECORDS VIEWMODEL - Lista filtrable, paginada y exportable
// ============================================================================

use std::cell::{Cell, RefCell};

use chrono::NaiveDateTime;

use crate::errors::{AppError, AppResult};
use crate::models::attendance::{
    export_file_name, records_to_csv, AttendanceRecord, AttendanceStats, Pagination, RecordFilter, StatusFilter,
    TimeRange,
};
use crate::services::api_client::StatsQuery;
use crate::services::attendance_service::AttendanceGateway;
use crate::services::identity_service::{RetryCounterStore, RECORDS_RETRY_KEY};
use crate::state::AppState;
use crate::utils::i18n::Language;

/// Página visible de la tabla
#[derive(Clone, Debug, PartialEq)]
pub struct PageView {
    pub rows: Vec<AttendanceRecord>,
    pub label: String,
    pub has_prev: bool,
    pub has_next: bool,
    pub total: usize,
}

pub struct RecordsViewModel<G, C> {
    state: AppState,
    gateway: G,
    counters: C,
    records: RefCell<Vec<AttendanceRecord>>,
    filter: RefCell<RecordFilter>,
    pagination: Cell<Pagination>,
    stats: Cell<AttendanceStats>,
}

impl<G: AttendanceGateway, C: RetryCounterStore> RecordsViewModel<G, C> {
    pub fn new(state: AppState, gateway: G, counters: C) -> Self {
        Self {
            state,
            gateway,
            counters,
            records: RefCell::new(Vec::new()),
            filter: RefCell::new(RecordFilter::default()),
            pagination: Cell::new(Pagination::default()),
            stats: Cell::new(AttendanceStats::default()),
        }
    }

    /// Carga registros y estadísticas del rango seleccionado
    pub async fn load(&self, now: NaiveDateTime) -> AppResult<()> {
        let user = self.state.complete_user().ok_or(AppError::Validation("user_info_missing"))?;
        let range = self.filter.borrow().range;
        log::info!("📋 [RECORDS] Cargando registros ({})", range.code());

        let records = self
            .gateway
            .records(&user.student_id, Some(range))
            .await
            .map_err(|err| self.fail(err))?;
        *self.records.borrow_mut() = records;
        self.reset_page();

        let stats = match self.gateway.statistics(&user.student_id, StatsQuery::Range(range)).await {
            Ok(stats) => stats,
            Err(err) if err.is_auth_expired() => return Err(self.fail(err)),
            Err(err) => {
                log::warn!("⚠️ [RECORDS] Estadísticas locales ({})", err);
                self.local_stats(now)
            }
        };
        self.stats.set(stats);
        Ok(())
    }

    /// Sesión caducada: fuera identidad y contador para permitir re-login
    fn fail(&self, err: AppError) -> AppError {
        if err.is_auth_expired() {
            log::warn!("🔐 [RECORDS] Autorización caducada, limpiando identidad");
            self.state.clear_user();
            self.counters.clear(RECORDS_RETRY_KEY);
        } else {
            log::error!("❌ [RECORDS] {}", err);
        }
        err
    }

    fn local_stats(&self, now: NaiveDateTime) -> AttendanceStats {
        let records = self.records.borrow();
        let filter = self.filter.borrow();
        AttendanceStats::from_records(filter.in_range(&records, now))
    }

    pub fn stats(&self) -> AttendanceStats {
        self.stats.get()
    }

    pub fn range(&self) -> TimeRange {
        self.filter.borrow().range
    }

    // ---- Filtros ----

    pub fn set_search(&self, search: &str) {
        self.filter.borrow_mut().search = search.to_string();
        self.reset_page();
    }

    pub fn set_status(&self, status: StatusFilter) {
        self.filter.borrow_mut().status = status;
        self.reset_page();
    }

    /// Cambiar el rango exige volver a llamar a `load`
    pub fn set_range(&self, range: TimeRange) {
        self.filter.borrow_mut().range = range;
        self.reset_page();
    }

    pub fn filtered(&self, now: NaiveDateTime) -> Vec<AttendanceRecord> {
        self.filter.borrow().apply(&self.records.borrow(), now)
    }

    // ---- Paginación ----

    fn reset_page(&self) {
        let mut pagination = self.pagination.get();
        pagination.reset();
        self.pagination.set(pagination);
    }

    pub fn next_page(&self, now: NaiveDateTime) -> bool {
        let total = self.filtered(now).len();
        let mut pagination = self.pagination.get();
        let moved = pagination.next(total);
        self.pagination.set(pagination);
        moved
    }

    pub fn prev_page(&self) -> bool {
        let mut pagination = self.pagination.get();
        let moved = pagination.prev();
        self.pagination.set(pagination);
        moved
    }

    pub fn page(&self, now: NaiveDateTime, lang: Language) -> PageView {
        let filtered = self.filtered(now);
        let pagination = self.pagination.get();
        PageView {
            rows: pagination.slice(&filtered).to_vec(),
            label: pagination.label(filtered.len(), lang),
            has_prev: pagination.has_prev(),
            has_next: pagination.has_next(filtered.len()),
            total: filtered.len(),
        }
    }

    // ---- Exportación ----

    /// (nombre de fichero, contenido) de los registros filtrados
    pub fn export_csv(&self, now: NaiveDateTime, lang: Language) -> Option<(String, String)> {
        let filtered = self.filtered(now);
        if filtered.is_empty() {
            log::warn!("⚠️ [RECORDS] Nada que exportar");
            return None;
        }
        log::info!("📤 [RECORDS] Exportando {} registros", filtered.len());
        Some((export_file_name(now.date()), records_to_csv(&filtered, lang)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance::AttendanceStatus;
    use crate::models::user::UserInfo;
    use crate::utils::format::parse_server_datetime;
    use async_trait::async_trait;
    use futures::executor::block_on;
    use std::collections::HashMap;
    use std::rc::Rc;

    struct FakeGateway {
        records: AppResult<Vec<AttendanceRecord>>,
        stats: AppResult<AttendanceStats>,
    }

    #[async_trait(?Send)]
    impl AttendanceGateway for FakeGateway {
        async fn records(&self, _student_id: &str, _range: Option<TimeRange>) -> AppResult<Vec<AttendanceRecord>> {
            self.records.clone()
        }
        async fn statistics(&self, _student_id: &str, _query: StatsQuery) -> AppResult<AttendanceStats> {
            self.stats.clone()
        }
    }

    #[derive(Default, Clone)]
    struct MemoryCounters(Rc<RefCell<HashMap<String, u32>>>);

    impl RetryCounterStore for MemoryCounters {
        fn get(&self, key: &str) -> u32 {
            self.0.borrow().get(key).copied().unwrap_or(0)
        }
        fn set(&self, key: &str, value: u32) {
            self.0.borrow_mut().insert(key.to_string(), value);
        }
        fn clear(&self, key: &str) {
            self.0.borrow_mut().remove(key);
        }
    }

    fn record(i: usize, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: Some(i as i64),
            name: "张三".into(),
            student_id: "2021150001".into(),
            course: if i % 2 == 0 { "操作系统".into() } else { "Compilers".into() },
            classroom: "A101".into(),
            location: "致腾楼".into(),
            building: Some("致腾楼".into()),
            status,
            signed_at: parse_server_datetime(&format!("2024-03-{:02} 08:00:00", (i % 20) + 1)),
            photo_url: None,
            latitude: None,
            longitude: None,
        }
    }

    fn now() -> NaiveDateTime {
        parse_server_datetime("2024-03-25 12:00:00").unwrap()
    }

    fn state() -> AppState {
        let state = AppState::with_language(Language::English);
        state.set_user(UserInfo { student_id: "2021150001".into(), name: "张三".into(), ..Default::default() });
        state
    }

    fn many(n: usize) -> Vec<AttendanceRecord> {
        (0..n)
            .map(|i| record(i, if i % 5 == 0 { AttendanceStatus::Late } else { AttendanceStatus::Attended }))
            .collect()
    }

    #[test]
    fn test_pagination_over_filtered_records() {
        let vm = RecordsViewModel::new(
            state(),
            FakeGateway { records: Ok(many(25)), stats: Ok(AttendanceStats::default()) },
            MemoryCounters::default(),
        );
        block_on(vm.load(now())).unwrap();

        let first = vm.page(now(), Language::English);
        assert_eq!(first.rows.len(), 10);
        assert_eq!(first.label, "Page 1 of 3");
        assert!(!first.has_prev);
        assert!(vm.next_page(now()));
        assert!(vm.next_page(now()));
        assert!(!vm.next_page(now()));
        assert_eq!(vm.page(now(), Language::English).rows.len(), 5);

        vm.set_search("compilers");
        let searched = vm.page(now(), Language::English);
        assert_eq!(searched.total, 12);
        assert_eq!(searched.label, "Page 1 of 2");
    }

    #[test]
    fn test_status_filter() {
        let vm = RecordsViewModel::new(
            state(),
            FakeGateway { records: Ok(many(10)), stats: Ok(AttendanceStats::default()) },
            MemoryCounters::default(),
        );
        block_on(vm.load(now())).unwrap();
        vm.set_status(StatusFilter::from_code("late"));
        assert_eq!(vm.filtered(now()).len(), 2);
    }

    #[test]
    fn test_local_stats_when_server_stats_fail() {
        let vm = RecordsViewModel::new(
            state(),
            FakeGateway { records: Ok(many(10)), stats: Err(AppError::Server { status: 500, message: String::new() }) },
            MemoryCounters::default(),
        );
        block_on(vm.load(now())).unwrap();

        let stats = vm.stats();
        assert_eq!(stats.total_days, 10);
        assert_eq!(stats.late_days, 2);
        assert_eq!(stats.attendance_rate, 90);
    }

    #[test]
    fn test_auth_expiry_clears_identity_and_counter() {
        let state = state();
        let counters = MemoryCounters::default();
        counters.set(RECORDS_RETRY_KEY, 1);
        let vm = RecordsViewModel::new(
            state.clone(),
            FakeGateway { records: Err(AppError::AuthExpired), stats: Ok(AttendanceStats::default()) },
            counters.clone(),
        );

        assert_eq!(block_on(vm.load(now())), Err(AppError::AuthExpired));
        assert!(state.user().is_none());
        assert_eq!(counters.get(RECORDS_RETRY_KEY), 0);
    }

    #[test]
    fn test_export_uses_filtered_records() {
        let vm = RecordsViewModel::new(
            state(),
            FakeGateway { records: Ok(many(4)), stats: Ok(AttendanceStats::default()) },
            MemoryCounters::default(),
        );
        assert!(vm.export_csv(now(), Language::Chinese).is_none());

        block_on(vm.load(now())).unwrap();
        let (name, csv) = vm.export_csv(now(), Language::Chinese).unwrap();
        assert_eq!(name, "考勤记录_2024-03-25.csv");
        assert_eq!(csv.lines().count(), 5);
        assert!(csv.starts_with("姓名,学号"));
    }
}
