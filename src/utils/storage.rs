// ============================================================================
// STORAGE - localStorage (durable) y sessionStorage (por pestaña)
// ============================================================================
// localStorage: solo idioma y device_id anónimo
// sessionStorage: solo contadores de reintentos
// ============================================================================

use gloo_storage::{LocalStorage, SessionStorage, Storage};
use serde::{de::DeserializeOwned, Serialize};

pub const LANGUAGE_KEY: &str = "language";
pub const DEVICE_ID_KEY: &str = "device_id";

pub fn save_to_storage<T: Serialize>(key: &str, value: &T) -> Result<(), String> {
    LocalStorage::set(key, value).map_err(|e| format!("Error guardando en localStorage: {}", e))
}

pub fn load_from_storage<T: DeserializeOwned>(key: &str) -> Option<T> {
    LocalStorage::get(key).ok()
}

/// Valores escritos como texto plano (p.ej. por otras páginas en JS) no son JSON válido
pub fn load_raw_from_storage(key: &str) -> Option<String> {
    let storage = LocalStorage::raw();
    storage.get_item(key).ok().flatten()
}

pub fn save_raw_to_storage(key: &str, value: &str) -> Result<(), String> {
    LocalStorage::raw()
        .set_item(key, value)
        .map_err(|e| format!("Error guardando en localStorage: {:?}", e))
}

pub fn save_to_session<T: Serialize>(key: &str, value: &T) -> Result<(), String> {
    SessionStorage::set(key, value).map_err(|e| format!("Error guardando en sessionStorage: {}", e))
}

pub fn load_from_session<T: DeserializeOwned>(key: &str) -> Option<T> {
    SessionStorage::get(key).ok()
}

pub fn remove_from_session(key: &str) {
    SessionStorage::delete(key);
}

/// Identificador anónimo del dispositivo (se genera una sola vez)
pub fn get_or_create_device_id() -> String {
    if let Some(id) = load_from_storage::<String>(DEVICE_ID_KEY).or_else(|| load_raw_from_storage(DEVICE_ID_KEY)) {
        if !id.is_empty() {
            return id;
        }
    }

    let id = format!("device_{}", uuid::Uuid::new_v4().simple());
    if let Err(e) = save_to_storage(DEVICE_ID_KEY, &id) {
        log::warn!("⚠️ [STORAGE] No se pudo persistir device_id: {}", e);
    }
    id
}
