// ============================================================================
// APP STATE - Contexto de sesión de la pestaña
// ============================================================================
// Se construye una vez por página (controlador de nivel superior) y se pasa
// por referencia a viewmodels y vistas. Nada de singletons globales.
// ============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{de::DeserializeOwned, Serialize};

use crate::models::location::LocationSample;
use crate::models::user::UserInfo;
use crate::state::reactivity::ReactiveState;
use crate::utils::i18n::Language;
use crate::utils::storage;

/// Clave de caché de la resolución de edificio
pub const BUILDING_CACHE_KEY: &str = "building_info";

#[derive(Clone)]
pub struct AppState {
    pub language: ReactiveState<Language>,
    pub user_info: Rc<RefCell<Option<UserInfo>>>,
    pub location: Rc<RefCell<Option<LocationSample>>>,
    pub bridge_ready: Rc<RefCell<bool>>,
    cache: Rc<RefCell<HashMap<String, serde_json::Value>>>,
    /// false en tests: no se toca localStorage
    persist_language: bool,
}

impl AppState {
    /// Estado de la página, idioma cargado desde localStorage
    pub fn new() -> Self {
        let stored = storage::load_from_storage::<String>(storage::LANGUAGE_KEY)
            .or_else(|| storage::load_raw_from_storage(storage::LANGUAGE_KEY))
            .map(|code| Language::from_code(&code))
            .unwrap_or_default();
        Self {
            persist_language: true,
            ..Self::with_language(stored)
        }
    }

    /// Estado en memoria, sin almacenamiento
    pub fn with_language(language: Language) -> Self {
        Self {
            language: ReactiveState::new(language),
            user_info: Rc::new(RefCell::new(None)),
            location: Rc::new(RefCell::new(None)),
            bridge_ready: Rc::new(RefCell::new(false)),
            cache: Rc::new(RefCell::new(HashMap::new())),
            persist_language: false,
        }
    }

    // ---- Idioma ----

    pub fn lang(&self) -> Language {
        self.language.get()
    }

    pub fn set_language(&self, lang: Language) {
        if self.persist_language {
            // Texto plano para que otras páginas lo lean igual
            if let Err(e) = storage::save_raw_to_storage(storage::LANGUAGE_KEY, lang.code()) {
                log::warn!("⚠️ [STATE] No se pudo guardar el idioma: {}", e);
            }
        }
        log::info!("🌐 [STATE] Idioma: {}", lang.code());
        self.language.set(lang);
    }

    // ---- Identidad ----

    pub fn user(&self) -> Option<UserInfo> {
        self.user_info.borrow().clone()
    }

    /// Solo identidades completas cuentan
    pub fn complete_user(&self) -> Option<UserInfo> {
        self.user().filter(|u| u.is_complete())
    }

    pub fn set_user(&self, user: UserInfo) {
        *self.user_info.borrow_mut() = Some(user);
    }

    pub fn clear_user(&self) {
        log::warn!("🧹 [STATE] Identidad en caché eliminada");
        *self.user_info.borrow_mut() = None;
    }

    // ---- Ubicación ----

    pub fn location(&self) -> Option<LocationSample> {
        *self.location.borrow()
    }

    /// Reemplaza la muestra e invalida la resolución de edificio
    pub fn set_location(&self, sample: LocationSample) {
        *self.location.borrow_mut() = Some(sample);
        self.cache_remove(BUILDING_CACHE_KEY);
    }

    // ---- Bridge ----

    pub fn is_bridge_ready(&self) -> bool {
        *self.bridge_ready.borrow()
    }

    pub fn set_bridge_ready(&self, ready: bool) {
        *self.bridge_ready.borrow_mut() = ready;
    }

    // ---- Caché genérica ----

    pub fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.borrow().get(key).cloned()?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("⚠️ [STATE] Entrada de caché '{}' ilegible: {}", key, e);
                None
            }
        }
    }

    pub fn cache_set<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.cache.borrow_mut().insert(key.to_string(), v);
            }
            Err(e) => log::error!("❌ [STATE] No se pudo cachear '{}': {}", key, e),
        }
    }

    pub fn cache_remove(&self, key: &str) {
        self.cache.borrow_mut().remove(key);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_language(Language::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::building::{BuildingResolution, LocationStatus};

    fn resolution() -> BuildingResolution {
        BuildingResolution {
            status: LocationStatus::Unknown,
            building: None,
            distance: None,
            message: None,
        }
    }

    #[test]
    fn test_new_location_invalidates_building_cache() {
        let state = AppState::with_language(Language::Chinese);
        state.set_location(LocationSample::new(22.53, 113.93, None, 1));
        state.cache_set(BUILDING_CACHE_KEY, &resolution());
        assert!(state.cache_get::<BuildingResolution>(BUILDING_CACHE_KEY).is_some());

        state.set_location(LocationSample::new(22.54, 113.94, None, 2));
        assert!(state.cache_get::<BuildingResolution>(BUILDING_CACHE_KEY).is_none());
    }

    #[test]
    fn test_clones_share_session() {
        let state = AppState::default();
        let view = state.clone();
        view.set_user(UserInfo { student_id: "1".into(), name: "n".into(), ..Default::default() });
        assert!(state.complete_user().is_some());
        state.clear_user();
        assert!(view.user().is_none());
    }

    #[test]
    fn test_incomplete_user_is_not_returned() {
        let state = AppState::default();
        state.set_user(UserInfo { student_id: "1".into(), ..Default::default() });
        assert!(state.user().is_some());
        assert!(state.complete_user().is_none());
    }

    #[test]
    fn test_language_change_notifies() {
        let state = AppState::with_language(Language::Chinese);
        let seen = Rc::new(RefCell::new(None));
        {
            let seen = seen.clone();
            state.language.subscribe(move |l| *seen.borrow_mut() = Some(*l));
        }
        state.set_language(Language::English);
        assert_eq!(*seen.borrow(), Some(Language::English));
        assert_eq!(state.lang(), Language::English);
    }
}
