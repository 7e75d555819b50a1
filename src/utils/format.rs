// ============================================================================
// FORMATO - Fechas, horas y distancias
// ============================================================================

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

use crate::utils::i18n::{t, Language};

/// Hora local actual del navegador
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn today() -> NaiveDate {
    now_local().date()
}

/// `HH:mm:ss`
pub fn format_clock(dt: &NaiveDateTime) -> String {
    dt.format("%H:%M:%S").to_string()
}

/// `YYYY-MM-DD`
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `YYYY-MM-DD HH:mm:ss`
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Interpreta las fechas del backend
///
/// Acepta RFC 3339 (convertido a hora local), `YYYY-MM-DDTHH:MM:SS[.f]`
/// y `YYYY-MM-DD HH:MM:SS`.
pub fn parse_server_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Distancia legible: metros por debajo de 1 km
pub fn format_distance(meters: f64, lang: Language) -> String {
    if meters >= 1000.0 {
        format!("{:.1} {}", meters / 1000.0, t("kilometers", lang))
    } else {
        format!("{} {}", meters.round() as i64, t("meters", lang))
    }
}

/// Coordenada con 4 decimales, como en los detalles del calendario
pub fn format_coordinate(value: f64) -> String {
    format!("{:.4}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_formats() {
        let a = parse_server_datetime("2024-03-05 08:15:00").unwrap();
        let b = parse_server_datetime("2024-03-05T08:15:00").unwrap();
        let c = parse_server_datetime("2024-03-05T08:15:00.123456").unwrap();
        assert_eq!(a, b);
        assert_eq!(format_datetime(&c), "2024-03-05 08:15:00");
        assert!(parse_server_datetime("").is_none());
        assert!(parse_server_datetime("ayer").is_none());
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(85.4, Language::Chinese), "85 米");
        assert_eq!(format_distance(85.6, Language::English), "86 m");
        assert_eq!(format_distance(1530.0, Language::English), "1.5 km");
    }

    #[test]
    fn test_format_clock() {
        let dt = parse_server_datetime("2024-03-05 07:05:09").unwrap();
        assert_eq!(format_clock(&dt), "07:05:09");
        assert_eq!(format_date(&dt.date()), "2024-03-05");
    }
}
