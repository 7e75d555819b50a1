// ============================================================================
// CONFIGURACIÓN - Valores cargados en tiempo de compilación (.env vía build.rs)
// ============================================================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Vacío = mismo origen que la página
    pub api_base_url: String,
    pub wechat_corp_id: String,
    pub wechat_agent_id: String,
    pub enable_logging: bool,
    pub retry: RetryPolicy,
    pub scanner: ScannerConfig,
    pub feedback: FeedbackLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            wechat_corp_id: "ww563e8adbd544adf5".to_string(),
            wechat_agent_id: "1000265".to_string(),
            enable_logging: true,
            retry: RetryPolicy::default(),
            scanner: ScannerConfig::default(),
            feedback: FeedbackLimits::default(),
        }
    }
}

/// Política de reintentos compartida por todas las páginas
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Techo del contador de intentos fallidos de identidad (por pestaña)
    pub identity_max_retries: u32,
    /// Intentos adicionales de resolución de edificio tras el primer fallo
    pub location_max_retries: u32,
    /// Paso del backoff lineal: espera = intento × paso
    pub delay_step_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            identity_max_retries: 2,
            location_max_retries: 2,
            delay_step_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Espera antes del reintento número `attempt` (1 = primer reintento)
    pub fn delay_for(&self, attempt: u32) -> u32 {
        attempt * self.delay_step_ms
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannerConfig {
    /// Intervalo mínimo entre dos decodificaciones
    pub min_scan_interval_ms: f64,
    /// Pausa antes de reanudar tras un código rechazado
    pub restart_delay_ms: f64,
    /// Fracción central del vídeo que se analiza en móviles
    pub mobile_crop_ratio: f64,
    pub camera_start_timeout_ms: u32,
    pub accepted_domain: String,
    pub accepted_organization: String,
    /// Longitud mínima (fallback débil) para aceptar un código
    pub min_code_length: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            min_scan_interval_ms: 100.0,
            restart_delay_ms: 2000.0,
            mobile_crop_ratio: 0.8,
            camera_start_timeout_ms: 15_000,
            accepted_domain: "szu.edu.cn".to_string(),
            accepted_organization: "深圳大学".to_string(),
            min_code_length: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeedbackLimits {
    pub max_images: usize,
    pub max_image_bytes: f64,
    pub max_content_chars: usize,
}

impl Default for FeedbackLimits {
    fn default() -> Self {
        Self {
            max_images: 3,
            max_image_bytes: 5.0 * 1024.0 * 1024.0,
            max_content_chars: 500,
        }
    }
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno en tiempo de compilación
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: option_env!("API_BASE_URL").unwrap_or("").to_string(),
            wechat_corp_id: option_env!("WECHAT_CORP_ID")
                .map(|s| s.to_string())
                .unwrap_or(defaults.wechat_corp_id),
            wechat_agent_id: option_env!("WECHAT_AGENT_ID")
                .map(|s| s.to_string())
                .unwrap_or(defaults.wechat_agent_id),
            enable_logging: option_env!("ENABLE_LOGGING")
                .unwrap_or("true").parse().unwrap_or(true),
            retry: RetryPolicy {
                identity_max_retries: option_env!("IDENTITY_MAX_RETRIES")
                    .unwrap_or("2").parse().unwrap_or(2),
                location_max_retries: option_env!("LOCATION_MAX_RETRIES")
                    .unwrap_or("2").parse().unwrap_or(2),
                delay_step_ms: option_env!("RETRY_DELAY_STEP_MS")
                    .unwrap_or("1000").parse().unwrap_or(1000),
            },
            scanner: ScannerConfig {
                min_scan_interval_ms: option_env!("SCAN_INTERVAL_MS")
                    .unwrap_or("100").parse().unwrap_or(100.0),
                ..ScannerConfig::default()
            },
            feedback: FeedbackLimits::default(),
        }
    }

    /// URL completa de un endpoint del backend
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    /// Verifica si el modo de logging está habilitado
    pub fn is_logging_enabled(&self) -> bool {
        self.enable_logging
    }
}

// Configuración global estática
lazy_static::lazy_static! {
    pub static ref CONFIG: AppConfig = AppConfig::from_env();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), 1000);
        assert_eq!(policy.delay_for(2), 2000);
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let mut config = AppConfig::default();
        assert_eq!(config.endpoint("/signin"), "/signin");
        config.api_base_url = "https://kq.szu.edu.cn/".to_string();
        assert_eq!(config.endpoint("/api/feedback/submit"), "https://kq.szu.edu.cn/api/feedback/submit");
    }
}
