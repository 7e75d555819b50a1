// ============================================================================
// CAMERA - getUserMedia con fallback trasera → frontal
// ============================================================================

use futures::channel::oneshot;
use futures::future::{select, Either};
use std::future::Future;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{HtmlVideoElement, MediaStream, MediaStreamConstraints, MediaStreamTrack};

use crate::config::CONFIG;
use crate::errors::CameraError;
use crate::services::bridge::to_js_object;

/// Modo de cámara solicitado
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    Environment,
    User,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::Environment => "environment",
            Facing::User => "user",
        }
    }
}

/// Restricciones de vídeo para un modo de cámara
pub fn video_constraints(facing: Facing) -> serde_json::Value {
    serde_json::json!({
        "audio": false,
        "video": {
            "facingMode": { "ideal": facing.as_str() },
            "width": { "ideal": 1280, "max": 1920 },
            "height": { "ideal": 720, "max": 1080 },
            "frameRate": { "ideal": 30, "max": 60 },
            "aspectRatio": { "ideal": 1.333 },
        }
    })
}

/// Stream activo; `stop` libera el hardware
pub struct CameraStream {
    stream: MediaStream,
    pub facing: Facing,
}

impl CameraStream {
    pub fn stop(&self) {
        stop_tracks(&self.stream);
    }
}

fn stop_tracks(stream: &MediaStream) {
    let tracks = stream.get_tracks();
    for track in tracks.iter() {
        if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
            track.stop();
        }
    }
    log::info!("📷 [CAMERA] {} pista(s) liberadas", tracks.length());
}

/// Resultado de `work` si llega antes que `deadline`; si no, devuelve el
/// trabajo aún pendiente para que el llamador decida qué hacer con él
async fn first_or_timeout<F, D>(work: F, deadline: D) -> Result<F::Output, F>
where
    F: Future + Unpin,
    D: Future + Unpin,
{
    match select(work, deadline).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right((_, pending)) => Err(pending),
    }
}

/// Arranca la cámara en `video`; trasera primero, frontal como alternativa
pub async fn start_camera(video: &HtmlVideoElement) -> Result<CameraStream, CameraError> {
    let stream = match open_stream(Facing::Environment).await {
        Ok(stream) => CameraStream { stream, facing: Facing::Environment },
        Err(err) if err.allows_fallback() => {
            log::warn!("⚠️ [CAMERA] Cámara trasera no disponible ({}), probando frontal", err);
            let stream = open_stream(Facing::User).await?;
            CameraStream { stream, facing: Facing::User }
        }
        Err(err) => return Err(err),
    };

    video.set_src_object(Some(&stream.stream));
    let _ = video.set_attribute("playsinline", "true");
    video.set_muted(true);

    if let Err(err) = wait_for_metadata(video).await {
        stream.stop();
        return Err(err);
    }
    if let Ok(play) = video.play() {
        if let Err(e) = JsFuture::from(play).await {
            log::warn!("⚠️ [CAMERA] play() rechazado: {:?}", e);
        }
    }

    log::info!(
        "✅ [CAMERA] {}x{} ({})",
        video.video_width(),
        video.video_height(),
        stream.facing.as_str()
    );
    Ok(stream)
}

async fn open_stream(facing: Facing) -> Result<MediaStream, CameraError> {
    let window = web_sys::window().ok_or(CameraError::Unsupported)?;
    let devices = window
        .navigator()
        .media_devices()
        .map_err(|_| CameraError::Unsupported)?;

    let constraints: MediaStreamConstraints = to_js_object(&video_constraints(facing))
        .map_err(|_| CameraError::Other)?
        .unchecked_into();
    let promise = devices
        .get_user_media_with_constraints(&constraints)
        .map_err(|e| camera_error_from_js(&e))?;

    let timeout = gloo_timers::future::TimeoutFuture::new(CONFIG.scanner.camera_start_timeout_ms);
    match first_or_timeout(JsFuture::from(promise), timeout).await {
        Ok(Ok(stream)) => stream.dyn_into::<MediaStream>().map_err(|_| CameraError::Other),
        Ok(Err(e)) => {
            let err = camera_error_from_js(&e);
            log::error!("❌ [CAMERA] getUserMedia ({}): {}", facing.as_str(), err);
            Err(err)
        }
        Err(pending) => {
            log::error!("❌ [CAMERA] Tiempo de arranque agotado");
            // Un stream que llegue tarde no debe dejar la cámara encendida
            spawn_local(async move {
                if let Ok(late) = pending.await {
                    if let Ok(stream) = late.dyn_into::<MediaStream>() {
                        log::warn!("⚠️ [CAMERA] Stream tardío descartado");
                        stop_tracks(&stream);
                    }
                }
            });
            Err(CameraError::Timeout)
        }
    }
}

async fn wait_for_metadata(video: &HtmlVideoElement) -> Result<(), CameraError> {
    // HAVE_METADATA
    if video.ready_state() >= 1 {
        return Ok(());
    }
    let (tx, rx) = oneshot::channel::<()>();
    let mut tx = Some(tx);
    let on_loaded = Closure::<dyn FnMut()>::new(move || {
        if let Some(tx) = tx.take() {
            let _ = tx.send(());
        }
    });
    video
        .add_event_listener_with_callback("loadedmetadata", on_loaded.as_ref().unchecked_ref())
        .map_err(|_| CameraError::Other)?;

    let timeout = gloo_timers::future::TimeoutFuture::new(CONFIG.scanner.camera_start_timeout_ms);
    let loaded = first_or_timeout(rx, timeout).await;
    let _ = video.remove_event_listener_with_callback("loadedmetadata", on_loaded.as_ref().unchecked_ref());

    match loaded {
        Ok(_) => Ok(()),
        Err(_) => Err(CameraError::Timeout),
    }
}

fn camera_error_from_js(value: &JsValue) -> CameraError {
    value
        .dyn_ref::<web_sys::DomException>()
        .map(|e| CameraError::from_dom_name(&e.name()))
        .unwrap_or(CameraError::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::future;

    #[test]
    fn test_constraints_prefer_requested_camera() {
        let rear = video_constraints(Facing::Environment);
        assert_eq!(rear["video"]["facingMode"]["ideal"], "environment");
        assert_eq!(rear["video"]["width"]["max"], 1920);
        assert_eq!(video_constraints(Facing::User)["video"]["facingMode"]["ideal"], "user");
    }

    #[test]
    fn test_timeout_hands_back_pending_work() {
        let (tx, rx) = oneshot::channel::<u32>();

        let raced = block_on(first_or_timeout(rx, future::ready(())));
        let Err(pending) = raced else {
            panic!("deadline should win");
        };

        // El resultado tardío sigue llegando al llamador para liberarlo
        tx.send(7).unwrap();
        assert_eq!(block_on(pending), Ok(7));
    }

    #[test]
    fn test_work_before_deadline_wins() {
        let raced = block_on(first_or_timeout(future::ready(3), future::pending::<()>()));
        assert!(matches!(raced, Ok(3)));
    }
}
