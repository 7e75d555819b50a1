// ============================================================================
// ASISTENCIA - Registros, estadísticas, filtros, paginación y CSV
// ============================================================================

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::utils::format::{format_coordinate, format_datetime, parse_server_datetime};
use crate::utils::i18n::{t, Language};

pub const RECORDS_PAGE_SIZE: usize = 10;
pub const RECORDS_FETCH_LIMIT: usize = 100;

/// Registro tal como lo devuelve `/api/attendance/records`
#[derive(Clone, Debug, Deserialize)]
pub struct RawAttendanceRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub location_address: Option<String>,
    /// Edificio donde se firmó
    #[serde(default, alias = "building_name", alias = "buildingName")]
    pub building: Option<String>,
    #[serde(default)]
    pub classroom: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub signed_at: String,
    #[serde(default)]
    pub photo_path: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RecordsPayload {
    #[serde(default)]
    pub records: Vec<RawAttendanceRecord>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum AttendanceStatus {
    Attended,
    Late,
    Absent,
    Unknown,
}

impl AttendanceStatus {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "attended" | "present" | "normal" => AttendanceStatus::Attended,
            "late" => AttendanceStatus::Late,
            "absent" | "missed" => AttendanceStatus::Absent,
            _ => AttendanceStatus::Unknown,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AttendanceStatus::Attended => "attended",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Unknown => "unknown",
        }
    }

    pub fn label(&self, lang: Language) -> String {
        match self {
            AttendanceStatus::Attended => t("status_present", lang),
            AttendanceStatus::Late => t("status_late", lang),
            AttendanceStatus::Absent => t("status_absent", lang),
            AttendanceStatus::Unknown => "-".to_string(),
        }
    }
}

/// Registro normalizado para la UI
#[derive(Clone, PartialEq, Debug)]
pub struct AttendanceRecord {
    pub id: Option<i64>,
    pub name: String,
    pub student_id: String,
    pub course: String,
    pub classroom: String,
    pub location: String,
    /// Edificio del registro; `None` si el servidor no lo conoce
    pub building: Option<String>,
    pub status: AttendanceStatus,
    pub signed_at: Option<NaiveDateTime>,
    pub photo_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<RawAttendanceRecord> for AttendanceRecord {
    fn from(raw: RawAttendanceRecord) -> Self {
        let classroom = raw.classroom.clone().unwrap_or_default();
        let address = raw.location_address.filter(|l| !l.trim().is_empty());
        let building = raw.building.filter(|b| !b.trim().is_empty()).or_else(|| address.clone());
        let location = address.unwrap_or_else(|| classroom.clone());
        Self {
            id: raw.id,
            name: raw.user_name.unwrap_or_default(),
            student_id: raw.student_id,
            course: raw.course_name,
            classroom,
            location,
            building,
            status: AttendanceStatus::from_code(&raw.status),
            signed_at: parse_server_datetime(&raw.signed_at),
            photo_url: raw
                .photo_path
                .filter(|p| !p.is_empty())
                .map(|p| format!("/api/uploads/{}", p)),
            latitude: raw.latitude,
            longitude: raw.longitude,
        }
    }
}

impl AttendanceRecord {
    pub fn date(&self) -> Option<NaiveDate> {
        self.signed_at.map(|dt| dt.date())
    }

    pub fn time_text(&self) -> String {
        self.signed_at.as_ref().map(format_datetime).unwrap_or_default()
    }

    /// `None` si falta alguna de las dos
    pub fn coordinates_text(&self) -> Option<String> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(format!("{}, {}", format_coordinate(lat), format_coordinate(lng))),
            _ => None,
        }
    }

    /// Búsqueda sin distinguir mayúsculas en nombre, id, curso y ubicación
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.name, &self.student_id, &self.course, &self.location]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

// ============================================================================
// ESTADÍSTICAS
// ============================================================================

/// Tasa de asistencia: los retrasos cuentan medio día
pub fn attendance_rate(attended: u32, late: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (((attended as f64 + late as f64 * 0.5) / total as f64) * 100.0).round() as u32
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct AttendanceStats {
    #[serde(default)]
    pub total_days: u32,
    #[serde(default)]
    pub attended_days: u32,
    #[serde(default)]
    pub late_days: u32,
    #[serde(default)]
    pub absent_days: u32,
    #[serde(default, deserialize_with = "deserialize_rate")]
    pub attendance_rate: u32,
}

fn deserialize_rate<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(|v| v.max(0.0).round() as u32).unwrap_or(0))
}

impl AttendanceStats {
    pub fn from_counts(attended: u32, late: u32, absent: u32) -> Self {
        let total = attended + late + absent;
        Self {
            total_days: total,
            attended_days: attended,
            late_days: late,
            absent_days: absent,
            attendance_rate: attendance_rate(attended, late, total),
        }
    }

    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AttendanceRecord>,
    {
        let (mut attended, mut late, mut absent) = (0, 0, 0);
        for record in records {
            match record.status {
                AttendanceStatus::Attended => attended += 1,
                AttendanceStatus::Late => late += 1,
                AttendanceStatus::Absent => absent += 1,
                AttendanceStatus::Unknown => {}
            }
        }
        Self::from_counts(attended, late, absent)
    }
}

// ============================================================================
// FILTROS
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum TimeRange {
    Week,
    #[default]
    Month,
    Semester,
}

impl TimeRange {
    pub fn code(&self) -> &'static str {
        match self {
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Semester => "semester",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "week" => TimeRange::Week,
            "semester" => TimeRange::Semester,
            _ => TimeRange::Month,
        }
    }

    /// Inicio del rango (incluido) relativo a `now`
    pub fn start(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        let start_date = match self {
            TimeRange::Week => {
                today - Duration::days(today.weekday().num_days_from_monday() as i64)
            }
            TimeRange::Month => today.with_day(1).unwrap_or(today),
            TimeRange::Semester => today.checked_sub_months(Months::new(3)).unwrap_or(today),
        };
        start_date.and_time(NaiveTime::MIN)
    }

    pub fn contains(&self, moment: &NaiveDateTime, now: NaiveDateTime) -> bool {
        *moment >= self.start(now)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(AttendanceStatus),
}

impl StatusFilter {
    pub fn from_code(code: &str) -> Self {
        match code {
            "all" | "" => StatusFilter::All,
            other => StatusFilter::Only(AttendanceStatus::from_code(other)),
        }
    }

    pub fn accepts(&self, status: AttendanceStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct RecordFilter {
    pub search: String,
    pub status: StatusFilter,
    pub range: TimeRange,
}

impl RecordFilter {
    pub fn matches(&self, record: &AttendanceRecord, now: NaiveDateTime) -> bool {
        let in_range = record
            .signed_at
            .map(|dt| self.range.contains(&dt, now))
            .unwrap_or(false);
        in_range && self.status.accepts(record.status) && record.matches_search(&self.search)
    }

    pub fn apply(&self, records: &[AttendanceRecord], now: NaiveDateTime) -> Vec<AttendanceRecord> {
        records.iter().filter(|r| self.matches(r, now)).cloned().collect()
    }

    /// Solo rango temporal (las estadísticas ignoran búsqueda y estado)
    pub fn in_range<'a>(&self, records: &'a [AttendanceRecord], now: NaiveDateTime) -> Vec<&'a AttendanceRecord> {
        records
            .iter()
            .filter(|r| r.signed_at.map(|dt| self.range.contains(&dt, now)).unwrap_or(false))
            .collect()
    }
}

// ============================================================================
// PAGINACIÓN
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Pagination {
    /// Base 1
    pub page: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, page_size: RECORDS_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.page - 1) * self.page_size;
        if start >= items.len() {
            return &[];
        }
        let end = (start + self.page_size).min(items.len());
        &items[start..end]
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self, total: usize) -> bool {
        self.page < self.total_pages(total)
    }

    pub fn prev(&mut self) -> bool {
        if self.has_prev() {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn next(&mut self, total: usize) -> bool {
        if self.has_next(total) {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn label(&self, total: usize, lang: Language) -> String {
        let pages = self.total_pages(total);
        match lang {
            Language::Chinese => format!("第 {} 页，共 {} 页", self.page, pages),
            Language::English => format!("Page {} of {}", self.page, pages),
        }
    }
}

// ============================================================================
// EXPORTACIÓN CSV
// ============================================================================

fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn csv_headers(lang: Language) -> [&'static str; 6] {
    match lang {
        Language::Chinese => ["姓名", "学号", "课程", "位置", "状态", "时间"],
        Language::English => ["Name", "Student ID", "Course", "Location", "Status", "Time"],
    }
}

pub fn records_to_csv(records: &[AttendanceRecord], lang: Language) -> String {
    let mut lines = vec![csv_headers(lang).join(",")];
    for record in records {
        let row = [
            record.name.clone(),
            record.student_id.clone(),
            record.course.clone(),
            record.location.clone(),
            record.status.label(lang),
            record.time_text(),
        ];
        lines.push(row.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(","));
    }
    lines.join("\n")
}

pub fn export_file_name(today: NaiveDate) -> String {
    format!("考勤记录_{}.csv", today.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, status: &str, signed_at: &str) -> AttendanceRecord {
        AttendanceRecord::from(RawAttendanceRecord {
            id: Some(1),
            user_name: Some(name.to_string()),
            student_id: "2021150001".to_string(),
            course_name: "Data Structures".to_string(),
            location_address: None,
            building: None,
            classroom: Some("致腾楼 A101".to_string()),
            status: status.to_string(),
            signed_at: signed_at.to_string(),
            photo_path: Some("2024/03/a.jpg".to_string()),
            latitude: None,
            longitude: None,
        })
    }

    fn now() -> NaiveDateTime {
        // Jueves
        parse_server_datetime("2024-03-14 10:00:00").unwrap()
    }

    #[test]
    fn test_raw_record_normalisation() {
        let r = record("李华", "late", "2024-03-12 08:05:00");
        assert_eq!(r.location, "致腾楼 A101");
        assert_eq!(r.status, AttendanceStatus::Late);
        assert_eq!(r.photo_url.as_deref(), Some("/api/uploads/2024/03/a.jpg"));
    }

    #[test]
    fn test_record_building_prefers_server_building_over_address() {
        let raw: RawAttendanceRecord = serde_json::from_str(
            r#"{"student_id":"1","course_name":"c","status":"attended","signed_at":"2024-03-04 08:00:00",
                "building_name":"汇文楼","location_address":"深圳大学粤海校区"}"#,
        )
        .unwrap();
        assert_eq!(AttendanceRecord::from(raw).building.as_deref(), Some("汇文楼"));

        let raw: RawAttendanceRecord = serde_json::from_str(
            r#"{"student_id":"1","course_name":"c","status":"attended","signed_at":"2024-03-04 08:00:00",
                "location_address":"致腾楼","classroom":"A101"}"#,
        )
        .unwrap();
        assert_eq!(AttendanceRecord::from(raw).building.as_deref(), Some("致腾楼"));

        // Sin edificio ni dirección no se inventa nada a partir del aula
        assert_eq!(record("李华", "late", "2024-03-12 08:05:00").building, None);
    }

    #[test]
    fn test_coordinates_text() {
        let mut r = record("李华", "attended", "2024-03-12 08:05:00");
        r.latitude = Some(22.5329);
        r.longitude = Some(113.9321);
        assert_eq!(r.coordinates_text().as_deref(), Some("22.5329, 113.9321"));
        r.longitude = None;
        assert_eq!(r.coordinates_text(), None);
    }

    #[test]
    fn test_rate_counts_late_as_half() {
        assert_eq!(attendance_rate(3, 1, 5), 70);
        assert_eq!(attendance_rate(0, 0, 0), 0);
        assert_eq!(attendance_rate(1, 0, 3), 33);
        let stats = AttendanceStats::from_counts(2, 1, 1);
        assert_eq!(stats.total_days, 4);
        assert_eq!(stats.attendance_rate, 63);
    }

    #[test]
    fn test_range_starts() {
        assert_eq!(
            TimeRange::Week.start(now()),
            parse_server_datetime("2024-03-11 00:00:00").unwrap()
        );
        assert_eq!(
            TimeRange::Month.start(now()),
            parse_server_datetime("2024-03-01 00:00:00").unwrap()
        );
        assert_eq!(
            TimeRange::Semester.start(now()),
            parse_server_datetime("2023-12-14 00:00:00").unwrap()
        );
    }

    #[test]
    fn test_filter_combines_search_status_and_range() {
        let records = vec![
            record("Li Hua", "attended", "2024-03-12 08:00:00"),
            record("Wang Fang", "late", "2024-03-13 08:10:00"),
            record("Li Lei", "attended", "2024-02-20 08:00:00"),
        ];
        let filter = RecordFilter {
            search: "li".to_string(),
            status: StatusFilter::from_code("attended"),
            range: TimeRange::Month,
        };
        let out = filter.apply(&records, now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Li Hua");

        let semester = RecordFilter { range: TimeRange::Semester, ..RecordFilter::default() };
        assert_eq!(semester.apply(&records, now()).len(), 3);
        assert_eq!(semester.in_range(&records, now()).len(), 3);
    }

    #[test]
    fn test_pagination() {
        let items: Vec<u32> = (0..23).collect();
        let mut p = Pagination::default();
        assert_eq!(p.total_pages(items.len()), 3);
        assert!(!p.prev());
        assert!(p.next(items.len()));
        assert!(p.next(items.len()));
        assert!(!p.next(items.len()));
        assert_eq!(p.slice(&items), &[20, 21, 22]);
        assert_eq!(p.label(items.len(), Language::Chinese), "第 3 页，共 3 页");
        assert_eq!(p.label(items.len(), Language::English), "Page 3 of 3");
        assert_eq!(Pagination::default().total_pages(0), 1);
    }

    #[test]
    fn test_csv_export() {
        let records = vec![record("Li, Hua", "absent", "2024-03-12 08:00:00")];
        let csv = records_to_csv(&records, Language::English);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Name,Student ID,Course,Location,Status,Time"));
        assert_eq!(
            lines.next(),
            Some("\"Li, Hua\",2021150001,Data Structures,致腾楼 A101,Absent,2024-03-12 08:00:00")
        );
        let date = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        assert_eq!(export_file_name(date), "考勤记录_2024-03-14.csv");
    }
}
