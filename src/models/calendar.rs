// ============================================================================
// CALENDARIO MENSUAL - 6 semanas (42 celdas), semana empezando en domingo
// ============================================================================

use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};

use crate::models::attendance::{attendance_rate, AttendanceRecord, AttendanceStatus};

pub const CALENDAR_CELLS: usize = 42;

/// Estado de un día en el calendario
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DayStatus {
    Attended,
    /// Retraso
    Partial,
    Missed,
}

impl DayStatus {
    pub fn from_attendance(status: AttendanceStatus) -> Option<Self> {
        match status {
            AttendanceStatus::Attended => Some(DayStatus::Attended),
            AttendanceStatus::Late => Some(DayStatus::Partial),
            AttendanceStatus::Absent => Some(DayStatus::Missed),
            AttendanceStatus::Unknown => None,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            DayStatus::Attended => "attended",
            DayStatus::Partial => "partial",
            DayStatus::Missed => "missed",
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct CalendarCell {
    pub day: u32,
    /// Solo las celdas del mes visible llevan fecha
    pub date: Option<NaiveDate>,
    pub is_today: bool,
    pub status: Option<DayStatus>,
}

impl CalendarCell {
    pub fn in_month(&self) -> bool {
        self.date.is_some()
    }

    pub fn css_class(&self) -> String {
        let mut classes = vec!["calendar-day"];
        if !self.in_month() {
            classes.push("other-month");
        }
        if self.is_today {
            classes.push("today");
        }
        if let Some(status) = self.status {
            classes.push(status.css_class());
        }
        classes.join(" ")
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    first
        .and_then(|d| d.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(30)
}

/// Estado por día (el último registro del día gana)
pub fn day_statuses(records: &[AttendanceRecord], year: i32, month: u32) -> HashMap<NaiveDate, DayStatus> {
    let mut map = HashMap::new();
    for record in records {
        let Some(date) = record.date() else { continue };
        if date.year() != year || date.month() != month {
            continue;
        }
        if let Some(status) = DayStatus::from_attendance(record.status) {
            map.insert(date, status);
        }
    }
    map
}

/// Celdas del mes `year-month`
pub fn build_month(
    year: i32,
    month: u32,
    today: NaiveDate,
    statuses: &HashMap<NaiveDate, DayStatus>,
) -> Vec<CalendarCell> {
    let mut cells = Vec::with_capacity(CALENDAR_CELLS);
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return cells;
    };

    // Días finales del mes anterior
    let leading = first.weekday().num_days_from_sunday();
    let prev = first.pred_opt().unwrap_or(first);
    let prev_days = days_in_month(prev.year(), prev.month());
    for i in (0..leading).rev() {
        cells.push(CalendarCell { day: prev_days - i, date: None, is_today: false, status: None });
    }

    for day in 1..=days_in_month(year, month) {
        let date = NaiveDate::from_ymd_opt(year, month, day);
        cells.push(CalendarCell {
            day,
            date,
            is_today: date == Some(today),
            status: date.and_then(|d| statuses.get(&d).copied()),
        });
    }

    let mut next_day = 1;
    while cells.len() < CALENDAR_CELLS {
        cells.push(CalendarCell { day: next_day, date: None, is_today: false, status: None });
        next_day += 1;
    }
    cells
}

/// Resumen mostrado junto al calendario
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct MonthSummary {
    /// Asistidos + retrasos
    pub attended_days: u32,
    pub missed_days: u32,
    pub attendance_rate: u32,
}

pub fn summarize(statuses: &HashMap<NaiveDate, DayStatus>) -> MonthSummary {
    let count = |wanted: DayStatus| statuses.values().filter(|s| **s == wanted).count() as u32;
    let attended = count(DayStatus::Attended);
    let partial = count(DayStatus::Partial);
    let missed = count(DayStatus::Missed);
    MonthSummary {
        attended_days: attended + partial,
        missed_days: missed,
        attendance_rate: attendance_rate(attended, partial, attended + partial + missed),
    }
}

/// Años ofrecidos en el selector: actual ± 2
pub fn selectable_years(current: i32) -> Vec<i32> {
    (current - 2..=current + 2).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance::RawAttendanceRecord;

    fn rec(status: &str, at: &str) -> AttendanceRecord {
        AttendanceRecord::from(RawAttendanceRecord {
            id: None,
            user_name: None,
            student_id: "1".into(),
            course_name: "c".into(),
            location_address: None,
            building: None,
            classroom: None,
            status: status.into(),
            signed_at: at.into(),
            photo_path: None,
            latitude: None,
            longitude: None,
        })
    }

    #[test]
    fn test_month_always_has_42_cells() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let empty = HashMap::new();
        // Marzo 2024 empieza en viernes: 5 días del mes anterior
        let cells = build_month(2024, 3, today, &empty);
        assert_eq!(cells.len(), CALENDAR_CELLS);
        assert_eq!(cells[0].day, 25);
        assert!(!cells[0].in_month());
        assert_eq!(cells[5].date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(cells[5 + 13].is_today);
        // Febrero 2026 empieza en domingo: sin días iniciales
        let feb = build_month(2026, 2, today, &empty);
        assert_eq!(feb.len(), CALENDAR_CELLS);
        assert_eq!(feb[0].date, NaiveDate::from_ymd_opt(2026, 2, 1));
    }

    #[test]
    fn test_statuses_and_summary() {
        let records = vec![
            rec("attended", "2024-03-04 08:00:00"),
            rec("late", "2024-03-05 08:20:00"),
            rec("absent", "2024-03-06 08:00:00"),
            rec("attended", "2024-02-28 08:00:00"),
        ];
        let statuses = day_statuses(&records, 2024, 3);
        assert_eq!(statuses.len(), 3);
        let summary = summarize(&statuses);
        assert_eq!(summary.attended_days, 2);
        assert_eq!(summary.missed_days, 1);
        assert_eq!(summary.attendance_rate, 50);

        let today = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let cells = build_month(2024, 3, today, &statuses);
        let fifth = cells.iter().find(|c| c.date == NaiveDate::from_ymd_opt(2024, 3, 5)).unwrap();
        assert_eq!(fifth.css_class(), "calendar-day partial");
    }

    #[test]
    fn test_year_selector() {
        assert_eq!(selectable_years(2024), vec![2022, 2023, 2024, 2025, 2026]);
    }
}
