use serde::{Deserialize, Serialize};

/// Muestra de geolocalización del dispositivo (inmutable una vez capturada)
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize, Debug)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    /// Milisegundos desde epoch
    pub timestamp: i64,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, accuracy: Option<f64>, timestamp: i64) -> Self {
        Self { latitude, longitude, accuracy, timestamp }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}
