// ============================================================================
// SCANNER VIEW - Escáner QR con cámara + jsQR (Rust puro)
// ============================================================================
// El modal arranca la cámara, crea un bucle de requestAnimationFrame y delega
// cada frame en ScanLoop. Al detectar o al cerrar se liberan las pistas.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlVideoElement};

use crate::dom::{append_child, on_click, set_text_content, ElementBuilder};
use crate::services::camera::{start_camera, CameraStream};
use crate::state::AppState;
use crate::utils::device::is_mobile;
use crate::utils::i18n::{t, Language};
use crate::utils::qr_ffi::js_qr_loaded;
use crate::viewmodels::scan_viewmodel::{CanvasFrameSource, FrameOutcome, JsQrDecoder, ScanLoop};
use crate::views::common::toast_error;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// Sesión de escaneo viva mientras el modal está abierto
struct ScanSession {
    scan: RefCell<ScanLoop>,
    camera: RefCell<Option<CameraStream>>,
    frame_cb: FrameCallback,
    modal: Element,
}

impl ScanSession {
    /// Detiene bucle y cámara y quita el modal; idempotente
    fn close(&self) {
        self.scan.borrow_mut().stop();
        if let Some(camera) = self.camera.borrow_mut().take() {
            camera.stop();
        }
        // Romper el ciclo closure → sesión fuera del propio frame
        if let Some(cb) = self.frame_cb.borrow_mut().take() {
            Timeout::new(0, move || drop(cb)).forget();
        }
        self.modal.remove();
    }
}

/// Renderizar modal del escáner; `on_code` recibe el código ya validado
pub fn render_scanner(
    state: &AppState,
    on_close: Rc<dyn Fn()>,
    on_code: Rc<dyn Fn(String)>,
) -> Result<Element, JsValue> {
    let lang = state.lang();

    let modal = ElementBuilder::new("div")?
        .id("scanner-modal")?
        .class("scanner-modal active")
        .build();
    let overlay = ElementBuilder::new("div")?.class("scanner-overlay").build();
    let content = ElementBuilder::new("div")?.class("scanner-content").build();

    let title = ElementBuilder::new("h2")?.i18n("scan_camera", lang)?.build();
    let close_btn = ElementBuilder::new("button")?.class("btn-close").text("✕").build();
    let header = ElementBuilder::new("div")?
        .class("scanner-header")
        .child(title)?
        .child(close_btn.clone())?
        .build();

    let video: HtmlVideoElement = ElementBuilder::new("video")?
        .class("scanner-video")
        .attr("playsinline", "true")?
        .attr("autoplay", "true")?
        .attr("muted", "true")?
        .build()
        .dyn_into()?;
    let frame = ElementBuilder::new("div")?.class("scanner-frame").build();
    let viewport = ElementBuilder::new("div")?
        .class("scanner-viewport")
        .child(video.clone().into())?
        .child(frame)?
        .build();

    let status = ElementBuilder::new("div")?
        .class("scanner-status")
        .i18n("loading", lang)?
        .build();

    append_child(&content, &header)?;
    append_child(&content, &viewport)?;
    append_child(&content, &status)?;
    append_child(&modal, &overlay)?;
    append_child(&modal, &content)?;

    let session = Rc::new(ScanSession {
        scan: RefCell::new(ScanLoop::new(is_mobile())),
        camera: RefCell::new(None),
        frame_cb: Rc::new(RefCell::new(None)),
        modal: modal.clone(),
    });

    // Cerrar: overlay o botón
    for target in [&overlay, &close_btn] {
        let session = session.clone();
        let on_close = on_close.clone();
        on_click(target, move |_| {
            session.close();
            on_close();
        })?;
    }
    on_click(&content, |e| e.stop_propagation())?;

    {
        let session = session.clone();
        let state = state.clone();
        spawn_local(async move {
            if !js_qr_loaded() {
                log::error!("❌ [SCANNER] jsQR no cargado");
                set_text_content(&status, &t("scan_failed", state.lang()));
                return;
            }
            match start_camera(&video).await {
                Ok(camera) => {
                    // El modal pudo cerrarse mientras arrancaba la cámara
                    if !session.modal.is_connected() {
                        camera.stop();
                        return;
                    }
                    *session.camera.borrow_mut() = Some(camera);
                    set_text_content(&status, &t("scan_camera_hint", state.lang()));
                    if let Err(e) = start_frame_loop(session, video, state.lang(), on_code) {
                        log::error!("❌ [SCANNER] Bucle no iniciado: {:?}", e);
                    }
                }
                Err(err) => {
                    let message = err.user_message(state.lang());
                    set_text_content(&status, &message);
                    toast_error(&message);
                }
            }
        });
    }

    Ok(modal)
}

fn start_frame_loop(
    session: Rc<ScanSession>,
    video: HtmlVideoElement,
    lang: Language,
    on_code: Rc<dyn Fn(String)>,
) -> Result<(), JsValue> {
    let mut source = CanvasFrameSource::new(video)?;
    let mut decoder = JsQrDecoder;
    session.scan.borrow_mut().start();

    let frame_cb = session.frame_cb.clone();
    let session_in_loop = session.clone();
    *frame_cb.borrow_mut() = Some(Closure::wrap(Box::new(move |now: f64| {
        let session = &session_in_loop;
        let outcome = session.scan.borrow_mut().tick(now, &mut source, &mut decoder);
        match outcome {
            FrameOutcome::Detected(code) => {
                session.close();
                on_code(code);
                return;
            }
            FrameOutcome::Rejected(_) => {
                toast_error(&t("scan_invalid_code", lang));
            }
            FrameOutcome::Skipped | FrameOutcome::NoCode => {}
        }
        if session.scan.borrow().is_active() {
            request_frame(&session.frame_cb);
        }
    }) as Box<dyn FnMut(f64)>));

    request_frame(&frame_cb);
    Ok(())
}

fn request_frame(frame_cb: &FrameCallback) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Some(cb) = frame_cb.borrow().as_ref() {
        if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            log::error!("❌ [SCANNER] requestAnimationFrame: {:?}", e);
        }
    }
}
