// ============================================================================
// SIGN-IN VIEW - Página de firma en clase
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Interval;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Element, HtmlInputElement};

use crate::dom::{
    append_child, clear_children, on_change, on_click, on_input, set_attribute, set_disabled, set_input_value,
    set_text_content, set_visible, ElementBuilder,
};
use crate::errors::AppError;
use crate::models::signin::{PhotoRef, SignInForm};
use crate::services::api_client::ApiClient;
use crate::services::bridge::WxBridge;
use crate::services::identity_service::{page_identity, SIGNIN_RETRY_KEY};
use crate::services::location_service::{LocationService, TimerDelay};
use crate::state::AppState;
use crate::utils::device::is_in_wecom;
use crate::utils::format::{format_clock, now_local};
use crate::utils::i18n::{t, Language};
use crate::viewmodels::SignInViewModel;
use crate::views::common::{
    fill_location_card, fill_user_card, render_auth_expired, render_header, render_location_card, render_user_card,
    set_loading, toast_error, toast_success,
};

type SignInVm = SignInViewModel<WxBridge, ApiClient>;

/// Renderizar la página de firma
pub fn render_signin(state: &AppState) -> Result<Element, JsValue> {
    log::info!("🎬 [SIGNIN] render_signin()");
    let lang = state.lang();
    let api = ApiClient::new();
    let bridge = WxBridge::new(state.clone());
    let vm: Rc<SignInVm> = Rc::new(SignInViewModel::new(state.clone(), bridge.clone(), api.clone()));
    let form = Rc::new(RefCell::new(SignInForm::default()));

    let page = ElementBuilder::new("div")?.class("signin-page").build();
    append_child(&page, &render_header(state, "signin_title")?)?;

    let user_card = render_user_card(state.user().as_ref(), lang)?;
    let location_card = render_location_card(lang)?;
    append_child(&page, &user_card)?;
    append_child(&page, &location_card)?;
    append_child(&page, &render_clock(state)?)?;

    // ---- Formulario ----
    let preview = ElementBuilder::new("img")?.class("photo-preview").attr("alt", "")?.build();
    set_visible(&preview, false);
    let placeholder = ElementBuilder::new("div")?
        .class("photo-placeholder")
        .text("📷 ")
        .build();
    let placeholder_text = ElementBuilder::new("span")?.i18n("tap_to_take_photo", lang)?.build();
    append_child(&placeholder, &placeholder_text)?;
    let file_input = ElementBuilder::new("input")?
        .attr("type", "file")?
        .attr("accept", "image/*")?
        .attr("capture", "user")?
        .class("hidden-input")
        .build();
    set_visible(&file_input, false);
    let photo_area = ElementBuilder::new("div")?
        .id("photo-area")?
        .class("photo-area")
        .child(placeholder.clone())?
        .child(preview.clone())?
        .child(file_input.clone())?
        .build();

    let course = text_field("course_name", state)?;
    let classroom = text_field("classroom", state)?;
    let submit = ElementBuilder::new("button")?
        .id("signin-btn")?
        .class("btn btn-primary btn-block")
        .i18n("signin", lang)?
        .build();
    set_disabled(&submit, true);

    let form_card = ElementBuilder::new("div")?
        .class("signin-form")
        .child(photo_area.clone())?
        .child(labelled(&course, "course_name", state)?)?
        .child(labelled(&classroom, "classroom", state)?)?
        .child(submit.clone())?
        .build();

    // ---- Modal: el formulario solo se abre desde el botón de firma ----
    let open_btn = ElementBuilder::new("button")?
        .id("signin-open-btn")?
        .class("btn btn-primary btn-block signin-action")
        .i18n("signin", lang)?
        .build();
    set_disabled(&open_btn, !vm.can_sign_in());
    append_child(&page, &open_btn)?;

    let modal_title = ElementBuilder::new("h2")?.i18n("signin_title", lang)?.build();
    let close_btn = ElementBuilder::new("button")?
        .class("btn-close")
        .attr("aria-label", &t("close", lang))?
        .text("✕")
        .build();
    let modal_header = ElementBuilder::new("div")?
        .class("modal-header")
        .child(modal_title)?
        .child(close_btn.clone())?
        .build();
    let overlay = ElementBuilder::new("div")?.class("modal-overlay").build();
    let modal_content = ElementBuilder::new("div")?
        .class("modal-content")
        .child(modal_header)?
        .child(form_card)?
        .build();
    let modal = ElementBuilder::new("div")?
        .id("signin-modal")?
        .class("modal")
        .child(overlay.clone())?
        .child(modal_content.clone())?
        .build();
    set_visible(&modal, false);
    append_child(&page, &modal)?;

    // Habilitar los botones con identidad completa y formulario listo
    let refresh_submit: Rc<dyn Fn()> = {
        let vm = vm.clone();
        let form = form.clone();
        let submit = submit.clone();
        let open_btn = open_btn.clone();
        Rc::new(move || {
            set_disabled(&open_btn, !vm.can_sign_in());
            let ready = vm.can_sign_in() && form.borrow().is_complete() && !vm.is_submitting();
            set_disabled(&submit, !ready);
        })
    };

    let show_photo: Rc<dyn Fn(Option<PhotoRef>)> = {
        let form = form.clone();
        let preview = preview.clone();
        let placeholder = placeholder.clone();
        let refresh_submit = refresh_submit.clone();
        Rc::new(move |photo: Option<PhotoRef>| {
            match &photo {
                Some(p) => {
                    let _ = set_attribute(&preview, "src", p.preview_src());
                    set_visible(&preview, true);
                    set_visible(&placeholder, false);
                }
                None => {
                    let _ = preview.remove_attribute("src");
                    set_visible(&preview, false);
                    set_visible(&placeholder, true);
                }
            }
            form.borrow_mut().photo = photo;
            refresh_submit();
        })
    };

    let close_modal: Rc<dyn Fn()> = {
        let modal = modal.clone();
        Rc::new(move || set_visible(&modal, false))
    };
    for target in [&overlay, &close_btn] {
        let close_modal = close_modal.clone();
        on_click(target, move |_| close_modal())?;
    }
    on_click(&modal_content, |e| e.stop_propagation())?;

    {
        let vm = vm.clone();
        let state = state.clone();
        let form = form.clone();
        let modal = modal.clone();
        let show_photo = show_photo.clone();
        let (course, classroom, file_input) = (course.clone(), classroom.clone(), file_input.clone());
        on_click(&open_btn, move |_| {
            if let Err(err) = vm.open_form() {
                toast_error(&err.user_message(state.lang()));
                return;
            }
            // Cada apertura empieza con el formulario vacío
            for field in [&course, &classroom, &file_input] {
                set_input_value(field, "");
            }
            *form.borrow_mut() = SignInForm::default();
            show_photo(None);
            set_visible(&modal, true);
        })?;
    }

    // ---- Foto: bridge si está listo, si no input de fichero ----
    {
        let vm = vm.clone();
        let file_input = file_input.clone();
        let show_photo = show_photo.clone();
        let state = state.clone();
        on_click(&photo_area, move |e| {
            let from_input = e
                .target()
                .and_then(|target| target.dyn_into::<Element>().ok())
                .is_some_and(|target| target == file_input);
            if from_input {
                return;
            }
            if vm.bridge_camera_available() {
                let vm = vm.clone();
                let show_photo = show_photo.clone();
                let state = state.clone();
                spawn_local(async move {
                    match vm.choose_photo().await {
                        Ok(photo) => show_photo(Some(photo)),
                        Err(AppError::Cancelled) => log::info!("📸 [SIGNIN] Foto cancelada"),
                        Err(err) => toast_error(&err.user_message(state.lang())),
                    }
                });
            } else if let Some(input) = file_input.dyn_ref::<web_sys::HtmlElement>() {
                input.click();
            }
        })?;
    }
    {
        let show_photo = show_photo.clone();
        let input = file_input.clone();
        on_change(&file_input, move |_| {
            let Some(file) = input.dyn_ref::<HtmlInputElement>().and_then(|i| i.files()).and_then(|f| f.get(0)) else {
                return;
            };
            let show_photo = show_photo.clone();
            spawn_local(async move {
                match read_data_url(&file).await {
                    Ok(url) => show_photo(Some(PhotoRef::from_raw(&url))),
                    Err(e) => log::error!("❌ [SIGNIN] Lectura de foto fallida: {:?}", e),
                }
            });
        })?;
    }

    // ---- Campos ----
    {
        let form = form.clone();
        let refresh_submit = refresh_submit.clone();
        on_input(&course, move |value| {
            form.borrow_mut().course_name = value;
            refresh_submit();
        })?;
    }
    {
        let form = form.clone();
        let refresh_submit = refresh_submit.clone();
        on_input(&classroom, move |value| {
            form.borrow_mut().classroom = value;
            refresh_submit();
        })?;
    }

    // ---- Envío ----
    {
        let vm = vm.clone();
        let form = form.clone();
        let state = state.clone();
        let refresh_submit = refresh_submit.clone();
        let show_photo = show_photo.clone();
        let (course, classroom, file_input) = (course.clone(), classroom.clone(), file_input.clone());
        let submit_btn = submit.clone();
        let close_modal = close_modal.clone();
        on_click(&submit, move |_| {
            let current = form.borrow().clone();
            let form = form.clone();
            let vm = vm.clone();
            let state = state.clone();
            let refresh_submit = refresh_submit.clone();
            let show_photo = show_photo.clone();
            let (course, classroom, file_input) = (course.clone(), classroom.clone(), file_input.clone());
            let submit_btn = submit_btn.clone();
            let close_modal = close_modal.clone();
            spawn_local(async move {
                set_disabled(&submit_btn, true);
                set_loading(true);
                let timestamp = String::from(js_sys::Date::new_0().to_iso_string());
                let result = vm.submit(&current, timestamp).await;
                set_loading(false);
                let lang = state.lang();
                match result {
                    Ok(message) => {
                        toast_success(&message.unwrap_or_else(|| t("signin_success", lang)));
                        for field in [&course, &classroom, &file_input] {
                            set_input_value(field, "");
                        }
                        *form.borrow_mut() = SignInForm::default();
                        show_photo(None);
                        close_modal();
                    }
                    Err(err) => {
                        toast_error(&err.user_message(lang));
                        if err.is_auth_expired() {
                            show_auth_expired(lang);
                        }
                    }
                }
                refresh_submit();
            });
        })?;
    }

    // ---- Arranque: bridge, luego identidad y ubicación en paralelo ----
    {
        let state = state.clone();
        let refresh_submit = refresh_submit.clone();
        spawn_local(async move {
            if is_in_wecom() {
                if let Err(err) = bridge.configure(&api).await {
                    log::warn!("⚠️ [SIGNIN] Bridge no disponible: {}", err);
                }
            }

            let identity = async {
                let user = page_identity(api.clone(), state.clone(), SIGNIN_RETRY_KEY).load_into(&state).await;
                if let Err(e) = fill_user_card(&user_card, user.as_ref(), state.lang()) {
                    log::error!("❌ [SIGNIN] {:?}", e);
                }
                // El formulario pudo completarse antes que la identidad
                refresh_submit();
            };
            let location = async {
                let view = LocationService::new(state.clone(), bridge.clone(), api.clone(), TimerDelay).load().await;
                if let Err(e) = fill_location_card(&location_card, &view, state.lang()) {
                    log::error!("❌ [SIGNIN] {:?}", e);
                }
                // Al cambiar de idioma se repinta con el mismo resultado
                let card = location_card.clone();
                state.language.subscribe(move |lang| {
                    let _ = fill_location_card(&card, &view, *lang);
                });
            };
            futures::join!(identity, location);
        });
    }

    Ok(page)
}

fn text_field(key: &str, state: &AppState) -> Result<Element, JsValue> {
    Ok(ElementBuilder::new("input")?
        .attr("type", "text")?
        .attr("name", key)?
        .class("form-input")
        .placeholder(key, state.lang())?
        .build())
}

fn labelled(input: &Element, key: &str, state: &AppState) -> Result<Element, JsValue> {
    let label = ElementBuilder::new("label")?.class("form-label").i18n(key, state.lang())?.build();
    ElementBuilder::new("div")?
        .class("form-group")
        .child(label)?
        .child(input.clone())
        .map(|b| b.build())
}

/// Reloj de la tarjeta, refrescado cada segundo
fn render_clock(state: &AppState) -> Result<Element, JsValue> {
    let label = ElementBuilder::new("span")?.class("clock-label").i18n("current_time", state.lang())?.build();
    let time = ElementBuilder::new("span")?
        .id("current-time")?
        .class("clock-time")
        .text(&format_clock(&now_local()))
        .build();
    let clock = ElementBuilder::new("div")?
        .class("card clock-card")
        .child(label)?
        .child(time.clone())?
        .build();

    Interval::new(1000, move || set_text_content(&time, &format_clock(&now_local()))).forget();
    Ok(clock)
}

fn show_auth_expired(lang: Language) {
    if let Some(card) = crate::dom::get_element_by_id("user-card") {
        clear_children(&card);
        match render_auth_expired(lang) {
            Ok(notice) => {
                let _ = append_child(&card, &notice);
            }
            Err(e) => log::error!("❌ [SIGNIN] {:?}", e),
        }
    }
}

/// Fichero → data URL con FileReader
pub async fn read_data_url(file: &web_sys::File) -> Result<String, JsValue> {
    let reader = web_sys::FileReader::new()?;
    let promise = js_sys::Promise::new(&mut |resolve: js_sys::Function, reject: js_sys::Function| {
        let source = reader.clone();
        let on_load = Closure::once_into_js(move |_e: web_sys::Event| {
            let _ = resolve.call1(&JsValue::NULL, &source.result().unwrap_or(JsValue::NULL));
        });
        let on_error = Closure::once_into_js(move |_e: web_sys::Event| {
            let _ = reject.call1(&JsValue::NULL, &JsValue::from_str("FileReader error"));
        });
        reader.set_onload(Some(on_load.unchecked_ref()));
        reader.set_onerror(Some(on_error.unchecked_ref()));
    });
    reader.read_as_data_url(file)?;
    JsFuture::from(promise)
        .await?
        .as_string()
        .ok_or_else(|| JsValue::from_str("FileReader result is not a string"))
}
