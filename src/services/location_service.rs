// ============================================================================
// LOCATION SERVICE - Muestra del dispositivo + resolución de edificio
// ============================================================================
// Una muestra por sesión (cacheada en AppState). La resolución contra el
// backend reintenta con backoff lineal y se cachea hasta que llegue una
// muestra nueva. Nunca se inventan coordenadas.
// ============================================================================

use async_trait::async_trait;

use crate::config::{RetryPolicy, CONFIG};
use crate::errors::{AppError, AppResult, ErrorKind};
use crate::models::building::{BuildingResolution, LocationInfoRequest};
use crate::models::location::LocationSample;
use crate::services::api_client::ApiClient;
use crate::services::bridge::PlatformBridge;
use crate::state::app_state::{AppState, BUILDING_CACHE_KEY};

/// Resolución servidor de una muestra a edificio
#[async_trait(?Send)]
pub trait BuildingResolver {
    async fn resolve(&self, sample: &LocationSample, student_id: Option<String>) -> AppResult<BuildingResolution>;
}

#[async_trait(?Send)]
impl BuildingResolver for ApiClient {
    async fn resolve(&self, sample: &LocationSample, student_id: Option<String>) -> AppResult<BuildingResolution> {
        let request = LocationInfoRequest::from_sample(sample, student_id);
        let info = self.location_info(&request).await?;
        Ok(BuildingResolution::from(info))
    }
}

/// Espera asíncrona (inyectable en tests)
#[async_trait(?Send)]
pub trait Delay {
    async fn sleep(&self, ms: u32);
}

/// Espera real con gloo-timers
#[derive(Clone, Copy, Default)]
pub struct TimerDelay;

#[async_trait(?Send)]
impl Delay for TimerDelay {
    async fn sleep(&self, ms: u32) {
        gloo_timers::future::TimeoutFuture::new(ms).await;
    }
}

/// Lo que la tarjeta de ubicación debe mostrar
#[derive(Clone, Debug, PartialEq)]
pub enum LocationView {
    /// Aún no hay muestra: mensaje neutro, no error
    Pending,
    /// No se pudo obtener la muestra del dispositivo
    Unavailable(AppError),
    Resolved(BuildingResolution),
    /// Resolución agotada tras los reintentos (un único error)
    Failed(AppError),
}

pub struct LocationService<B, R, D> {
    state: AppState,
    bridge: B,
    resolver: R,
    delay: D,
    policy: RetryPolicy,
}

impl<B, R, D> LocationService<B, R, D>
where
    B: PlatformBridge,
    R: BuildingResolver,
    D: Delay,
{
    pub fn new(state: AppState, bridge: B, resolver: R, delay: D) -> Self {
        Self { state, bridge, resolver, delay, policy: CONFIG.retry }
    }

    #[cfg(test)]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Muestra de la sesión; se pide al bridge solo si no hay ninguna
    pub async fn acquire(&self) -> AppResult<LocationSample> {
        if let Some(sample) = self.state.location() {
            log::debug!("📍 [LOCATION] Usando muestra cacheada");
            return Ok(sample);
        }
        self.acquire_fresh().await
    }

    /// Nueva muestra del dispositivo (reemplaza la anterior por completo)
    pub async fn acquire_fresh(&self) -> AppResult<LocationSample> {
        if !self.bridge.is_ready() {
            log::warn!("⚠️ [LOCATION] Bridge no listo, sin reintento");
            return Err(AppError::BridgeNotReady);
        }

        match self.bridge.get_location().await {
            Ok(sample) => {
                log::info!(
                    "✅ [LOCATION] Muestra: {:.6}, {:.6} (±{:?} m)",
                    sample.latitude,
                    sample.longitude,
                    sample.accuracy
                );
                self.state.set_location(sample);
                Ok(sample)
            }
            Err(err) => {
                log::error!("❌ [LOCATION] No se pudo obtener la ubicación: {}", err);
                Err(err)
            }
        }
    }

    /// Resuelve la muestra actual a edificio
    pub async fn resolve(&self) -> LocationView {
        let Some(sample) = self.state.location() else {
            log::info!("⏳ [LOCATION] Sin muestra, resolución omitida");
            return LocationView::Pending;
        };

        if let Some(cached) = self.state.cache_get::<BuildingResolution>(BUILDING_CACHE_KEY) {
            log::debug!("📍 [LOCATION] Edificio desde caché");
            return LocationView::Resolved(cached);
        }

        let student_id = self.state.complete_user().map(|u| u.student_id);
        let attempts = 1 + self.policy.location_max_retries;
        let mut attempt = 1;

        loop {
            match self.resolver.resolve(&sample, student_id.clone()).await {
                Ok(resolution) => {
                    log::info!("✅ [LOCATION] Edificio resuelto: {:?}", resolution.status);
                    self.state.cache_set(BUILDING_CACHE_KEY, &resolution);
                    return LocationView::Resolved(resolution);
                }
                Err(err) if attempt < attempts && is_retryable(&err) => {
                    let wait = self.policy.delay_for(attempt);
                    log::warn!(
                        "⚠️ [LOCATION] Intento {}/{} falló ({}), reintentando en {} ms",
                        attempt,
                        attempts,
                        err,
                        wait
                    );
                    self.delay.sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => {
                    log::error!("❌ [LOCATION] Resolución fallida tras {} intentos: {}", attempt, err);
                    return LocationView::Failed(err);
                }
            }
        }
    }

    /// Flujo completo de la tarjeta: muestra y después edificio
    pub async fn load(&self) -> LocationView {
        match self.acquire().await {
            Ok(_) => self.resolve().await,
            Err(err) => LocationView::Unavailable(err),
        }
    }
}

/// Solo red, servidor o timeout pueden mejorar reintentando
fn is_retryable(err: &AppError) -> bool {
    err.kind() == ErrorKind::Transient
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::building::{Building, LocationStatus};
    use crate::utils::i18n::Language;
    use futures::executor::block_on;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct FakeBridge {
        ready: bool,
        result: AppResult<LocationSample>,
        calls: Rc<Cell<u32>>,
    }

    #[async_trait(?Send)]
    impl PlatformBridge for FakeBridge {
        fn is_ready(&self) -> bool {
            self.ready
        }
        async fn get_location(&self) -> AppResult<LocationSample> {
            self.calls.set(self.calls.get() + 1);
            self.result.clone()
        }
        async fn choose_image(&self) -> AppResult<String> {
            Err(AppError::Unavailable)
        }
        async fn upload_image(&self, _local_id: &str) -> AppResult<String> {
            Err(AppError::Unavailable)
        }
        async fn scan_code(&self) -> AppResult<String> {
            Err(AppError::Unavailable)
        }
    }

    /// Falla `failures` veces con `error` y luego responde
    struct FlakyResolver {
        failures: u32,
        error: AppError,
        calls: Rc<Cell<u32>>,
        student_ids: Rc<RefCell<Vec<Option<String>>>>,
    }

    impl FlakyResolver {
        fn new(failures: u32, calls: Rc<Cell<u32>>) -> Self {
            Self {
                failures,
                error: AppError::Network("connection reset".to_string()),
                calls,
                student_ids: Rc::default(),
            }
        }
    }

    #[async_trait(?Send)]
    impl BuildingResolver for FlakyResolver {
        async fn resolve(&self, _sample: &LocationSample, student_id: Option<String>) -> AppResult<BuildingResolution> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            self.student_ids.borrow_mut().push(student_id);
            if n <= self.failures {
                Err(self.error.clone())
            } else {
                Ok(within_range())
            }
        }
    }

    #[derive(Default, Clone)]
    struct RecordingDelay {
        waits: Rc<RefCell<Vec<u32>>>,
    }

    #[async_trait(?Send)]
    impl Delay for RecordingDelay {
        async fn sleep(&self, ms: u32) {
            self.waits.borrow_mut().push(ms);
        }
    }

    fn within_range() -> BuildingResolution {
        BuildingResolution {
            status: LocationStatus::WithinRange,
            building: Some(Building {
                id: Some(1),
                name: "致腾楼".to_string(),
                name_en: Some("Zhiteng Building".to_string()),
                campus: None,
                address: None,
                longitude: None,
                latitude: None,
                description: None,
            }),
            distance: Some(12.0),
            message: None,
        }
    }

    fn sample() -> LocationSample {
        LocationSample::new(22.5335, 113.9357, Some(20.0), 1_700_000_000_000)
    }

    fn service(
        state: &AppState,
        bridge_ready: bool,
        failures: u32,
    ) -> (LocationService<FakeBridge, FlakyResolver, RecordingDelay>, Rc<Cell<u32>>, Rc<Cell<u32>>, RecordingDelay) {
        let bridge_calls = Rc::new(Cell::new(0));
        let resolver_calls = Rc::new(Cell::new(0));
        let delay = RecordingDelay::default();
        let svc = LocationService::new(
            state.clone(),
            FakeBridge { ready: bridge_ready, result: Ok(sample()), calls: bridge_calls.clone() },
            FlakyResolver::new(failures, resolver_calls.clone()),
            delay.clone(),
        )
        .with_policy(RetryPolicy::default());
        (svc, bridge_calls, resolver_calls, delay)
    }

    #[test]
    fn test_two_failures_then_success_calls_three_times_with_linear_backoff() {
        let state = AppState::with_language(Language::Chinese);
        state.set_location(sample());
        let (svc, _, calls, delay) = service(&state, true, 2);

        let view = block_on(svc.resolve());

        assert_eq!(view, LocationView::Resolved(within_range()));
        assert_eq!(calls.get(), 3);
        assert_eq!(*delay.waits.borrow(), vec![1000, 2000]);
    }

    #[test]
    fn test_exhausted_retries_yield_single_failure() {
        let state = AppState::with_language(Language::Chinese);
        state.set_location(sample());
        let (svc, _, calls, delay) = service(&state, true, 10);

        let view = block_on(svc.resolve());

        assert!(matches!(view, LocationView::Failed(AppError::Network(_))));
        assert_eq!(calls.get(), 3);
        assert_eq!(delay.waits.borrow().len(), 2);
        assert!(state.cache_get::<BuildingResolution>(BUILDING_CACHE_KEY).is_none());
    }

    #[test]
    fn test_resolution_is_cached_until_new_sample() {
        let state = AppState::with_language(Language::Chinese);
        state.set_location(sample());
        let (svc, _, calls, _) = service(&state, true, 0);

        block_on(svc.resolve());
        block_on(svc.resolve());
        assert_eq!(calls.get(), 1);

        state.set_location(LocationSample::new(22.54, 113.94, None, 2));
        block_on(svc.resolve());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_missing_sample_is_pending_not_error() {
        let state = AppState::with_language(Language::Chinese);
        let (svc, _, calls, _) = service(&state, true, 0);

        assert_eq!(block_on(svc.resolve()), LocationView::Pending);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_bridge_not_ready_fails_fast() {
        let state = AppState::with_language(Language::Chinese);
        let (svc, bridge_calls, resolver_calls, _) = service(&state, false, 0);

        assert_eq!(block_on(svc.load()), LocationView::Unavailable(AppError::BridgeNotReady));
        assert_eq!(bridge_calls.get(), 0);
        assert_eq!(resolver_calls.get(), 0);
        assert!(state.location().is_none());
    }

    #[test]
    fn test_sample_is_requested_once_per_session() {
        let state = AppState::with_language(Language::Chinese);
        let (svc, bridge_calls, _, _) = service(&state, true, 0);

        block_on(svc.load());
        block_on(svc.load());
        assert_eq!(bridge_calls.get(), 1);
        assert_eq!(state.location(), Some(sample()));
    }

    #[test]
    fn test_device_failure_keeps_location_unknown() {
        let state = AppState::with_language(Language::Chinese);
        let svc = LocationService::new(
            state.clone(),
            FakeBridge { ready: true, result: Err(AppError::PermissionDenied), calls: Rc::new(Cell::new(0)) },
            FlakyResolver::new(0, Rc::new(Cell::new(0))),
            RecordingDelay::default(),
        );

        assert_eq!(block_on(svc.load()), LocationView::Unavailable(AppError::PermissionDenied));
        assert!(state.location().is_none());
    }

    #[test]
    fn test_non_transient_errors_are_not_retried() {
        for error in [AppError::AuthExpired, AppError::Parse("bad json".to_string()), AppError::Cancelled] {
            let state = AppState::with_language(Language::Chinese);
            state.set_location(sample());
            let calls = Rc::new(Cell::new(0));
            let delay = RecordingDelay::default();
            let svc = LocationService::new(
                state.clone(),
                FakeBridge { ready: true, result: Ok(sample()), calls: Rc::new(Cell::new(0)) },
                FlakyResolver { error: error.clone(), ..FlakyResolver::new(10, calls.clone()) },
                delay.clone(),
            )
            .with_policy(RetryPolicy::default());

            assert_eq!(block_on(svc.resolve()), LocationView::Failed(error));
            assert_eq!(calls.get(), 1);
            assert!(delay.waits.borrow().is_empty());
        }
    }

    #[test]
    fn test_load_resolves_without_identity() {
        // La tarjeta de ubicación arranca en paralelo con la identidad
        let state = AppState::with_language(Language::Chinese);
        let calls = Rc::new(Cell::new(0));
        let resolver = FlakyResolver::new(0, calls.clone());
        let student_ids = resolver.student_ids.clone();
        let svc = LocationService::new(
            state.clone(),
            FakeBridge { ready: true, result: Ok(sample()), calls: Rc::new(Cell::new(0)) },
            resolver,
            RecordingDelay::default(),
        );

        assert_eq!(block_on(svc.load()), LocationView::Resolved(within_range()));
        assert_eq!(*student_ids.borrow(), vec![None]);
    }
}
