use serde::{Deserialize, Serialize};

use crate::models::location::LocationSample;
use crate::utils::format::format_distance;
use crate::utils::i18n::Language;

/// Edificio registrado en el campus
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct Building {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub campus: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Building {
    pub fn display_name(&self, lang: Language) -> &str {
        match (lang, self.name_en.as_deref()) {
            (Language::English, Some(en)) if !en.trim().is_empty() => en,
            _ => &self.name,
        }
    }
}

/// Cuerpo de `POST /api/attendance/location-info`
#[derive(Clone, Debug, Serialize)]
pub struct LocationInfoRequest {
    pub longitude: f64,
    pub latitude: f64,
    /// Segundos desde epoch
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
}

impl LocationInfoRequest {
    pub fn from_sample(sample: &LocationSample, student_id: Option<String>) -> Self {
        Self {
            longitude: sample.longitude,
            latitude: sample.latitude,
            timestamp: sample.timestamp / 1000,
            student_id,
        }
    }
}

/// `data` de la respuesta de location-info
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct LocationInfo {
    #[serde(default)]
    pub building: Option<Building>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub is_valid_location: bool,
    #[serde(default)]
    pub course: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Estado visual de la verificación de ubicación
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum LocationStatus {
    WithinRange,
    OutOfRange,
    Unknown,
}

impl LocationStatus {
    pub fn css_class(&self) -> &'static str {
        match self {
            LocationStatus::WithinRange => "location-status valid",
            LocationStatus::OutOfRange => "location-status invalid",
            LocationStatus::Unknown => "location-status unknown",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            LocationStatus::WithinRange => "✅",
            LocationStatus::OutOfRange => "⚠️",
            LocationStatus::Unknown => "❓",
        }
    }

    /// Par de etiquetas (zh, en)
    pub fn labels(&self) -> (&'static str, &'static str) {
        match self {
            LocationStatus::WithinRange => ("位置有效", "Location valid"),
            LocationStatus::OutOfRange => ("超出签到范围", "Out of sign-in range"),
            LocationStatus::Unknown => ("未知位置", "Unknown location"),
        }
    }

    pub fn label(&self, lang: Language) -> &'static str {
        let (zh, en) = self.labels();
        lang.pick(zh, en)
    }
}

/// Resultado de resolver una muestra contra los edificios del campus
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct BuildingResolution {
    pub status: LocationStatus,
    pub building: Option<Building>,
    pub distance: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<LocationInfo> for BuildingResolution {
    fn from(info: LocationInfo) -> Self {
        let status = match (&info.building, info.is_valid_location) {
            (Some(_), true) => LocationStatus::WithinRange,
            (Some(_), false) => LocationStatus::OutOfRange,
            (None, _) => LocationStatus::Unknown,
        };
        Self {
            status,
            building: info.building,
            distance: info.distance,
            message: info.message,
        }
    }
}

impl BuildingResolution {
    pub fn building_name(&self, lang: Language) -> Option<&str> {
        self.building.as_ref().map(|b| b.display_name(lang))
    }

    /// Texto principal de la tarjeta de ubicación
    pub fn headline(&self, lang: Language) -> String {
        match (self.status, self.building_name(lang)) {
            (LocationStatus::Unknown, _) | (_, None) => self.status.label(lang).to_string(),
            (_, Some(name)) => format!("{} · {}", name, self.status.label(lang)),
        }
    }

    /// Línea de distancia (solo si hay edificio)
    pub fn distance_text(&self, lang: Language) -> Option<String> {
        if self.building.is_none() {
            return None;
        }
        self.distance.map(|d| format!("{} {}", lang.pick("距离", "Distance"), format_distance(d, lang)))
    }
}
