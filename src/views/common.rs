// ============================================================================
// COMMON VIEWS - Toast, selector de idioma, tarjetas de usuario y ubicación
// ============================================================================
// Piezas que todas las páginas comparten. Sin lógica: reciben datos ya
// decididos por viewmodels/servicios y solo pintan.
// ============================================================================

use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;
use web_sys::Element;

use crate::dom::{
    append_child, document, get_element_by_id, on_click, query_selector_all, set_attribute, set_text_content,
    set_visible, toggle_class, ElementBuilder,
};
use crate::models::user::UserInfo;
use crate::services::location_service::LocationView;
use crate::state::AppState;
use crate::utils::i18n::{t, Language};

const TOAST_ID: &str = "toast";
const TOAST_MS: u32 = 3000;

// ============================================================================
// TOAST
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl ToastKind {
    fn css_class(&self) -> &'static str {
        match self {
            ToastKind::Success => "toast success show",
            ToastKind::Error => "toast error show",
        }
    }
}

pub fn show_toast(message: &str, kind: ToastKind) {
    if let Err(e) = try_show_toast(message, kind) {
        log::error!("❌ [TOAST] {:?}", e);
    }
}

pub fn toast_error(message: &str) {
    show_toast(message, ToastKind::Error);
}

pub fn toast_success(message: &str) {
    show_toast(message, ToastKind::Success);
}

fn try_show_toast(message: &str, kind: ToastKind) -> Result<(), JsValue> {
    let toast = match get_element_by_id(TOAST_ID) {
        Some(existing) => existing,
        None => {
            let created = ElementBuilder::new("div")?.id(TOAST_ID)?.class("toast").build();
            append_child(&body()?, &created)?;
            created
        }
    };
    toast.set_class_name(kind.css_class());
    set_text_content(&toast, message);
    set_visible(&toast, true);

    Timeout::new(TOAST_MS, move || {
        toast.set_class_name("toast");
        set_visible(&toast, false);
    })
    .forget();
    Ok(())
}

/// Overlay de carga a pantalla completa
pub fn set_loading(visible: bool) {
    let overlay = match get_element_by_id("loading-overlay") {
        Some(existing) => existing,
        None if visible => match build_loading_overlay() {
            Ok(created) => created,
            Err(e) => {
                log::error!("❌ [LOADING] {:?}", e);
                return;
            }
        },
        None => return,
    };
    set_visible(&overlay, visible);
}

fn build_loading_overlay() -> Result<Element, JsValue> {
    let spinner = ElementBuilder::new("div")?.class("spinner").build();
    let overlay = ElementBuilder::new("div")?
        .id("loading-overlay")?
        .class("loading-overlay")
        .child(spinner)?
        .build();
    append_child(&body()?, &overlay)?;
    Ok(overlay)
}

fn body() -> Result<Element, JsValue> {
    document()
        .and_then(|d| d.body())
        .map(Element::from)
        .ok_or_else(|| JsValue::from_str("No body"))
}

// ============================================================================
// IDIOMA
// ============================================================================

/// Re-aplica los textos marcados con `data-zh`/`data-en` y los placeholders
pub fn apply_translations(lang: Language) {
    let (text_attr, placeholder_attr) = match lang {
        Language::Chinese => ("data-zh", "data-placeholder-zh"),
        Language::English => ("data-en", "data-placeholder-en"),
    };

    match query_selector_all("[data-zh]") {
        Ok(elements) => {
            for el in elements {
                if let Some(text) = el.get_attribute(text_attr) {
                    set_text_content(&el, &text);
                }
            }
        }
        Err(e) => log::warn!("⚠️ [I18N] {:?}", e),
    }

    if let Ok(inputs) = query_selector_all("[data-placeholder-zh]") {
        for el in inputs {
            if let Some(text) = el.get_attribute(placeholder_attr) {
                let _ = set_attribute(&el, "placeholder", &text);
            }
        }
    }

    if let Ok(options) = query_selector_all(".lang-option") {
        for option in options {
            let active = option.get_attribute("data-lang").as_deref() == Some(lang.code());
            let _ = toggle_class(&option, "active", active);
        }
    }

    if let Some(root) = document().and_then(|d| d.document_element()) {
        let _ = set_attribute(&root, "lang", lang.pick("zh-CN", "en"));
    }
}

/// Botón 中文 / EN; el cambio se propaga vía `state.language`
pub fn render_language_toggle(state: &AppState) -> Result<Element, JsValue> {
    let toggle = ElementBuilder::new("div")?.class("language-toggle").build();

    for (lang, label) in [(Language::Chinese, "中文"), (Language::English, "EN")] {
        let option = ElementBuilder::new("span")?
            .class(if state.lang() == lang { "lang-option active" } else { "lang-option" })
            .attr("data-lang", lang.code())?
            .text(label)
            .build();
        let state = state.clone();
        on_click(&option, move |_| {
            if state.lang() != lang {
                state.set_language(lang);
            }
        })?;
        append_child(&toggle, &option)?;
    }

    // Una sola suscripción por página
    state.language.subscribe(|lang| apply_translations(*lang));
    Ok(toggle)
}

/// Cabecera común: título traducible + selector de idioma
pub fn render_header(state: &AppState, title_key: &str) -> Result<Element, JsValue> {
    let lang = state.lang();
    let title = ElementBuilder::new("h1")?.class("page-title").i18n(title_key, lang)?.build();
    ElementBuilder::new("header")?
        .class("app-header")
        .child(title)?
        .child(render_language_toggle(state)?)
        .map(|b| b.build())
}

// ============================================================================
// TARJETAS
// ============================================================================

/// Tarjeta de usuario; sin identidad muestra el aviso de abrir en WeCom
pub fn render_user_card(user: Option<&UserInfo>, lang: Language) -> Result<Element, JsValue> {
    let card = ElementBuilder::new("div")?.id("user-card")?.class("card user-card").build();
    fill_user_card(&card, user, lang)?;
    Ok(card)
}

pub fn fill_user_card(card: &Element, user: Option<&UserInfo>, lang: Language) -> Result<(), JsValue> {
    crate::dom::clear_children(card);
    match user.filter(|u| u.is_complete()) {
        Some(user) => {
            let avatar = ElementBuilder::new("div")?
                .class("user-avatar")
                .text(&user.name.chars().next().map(String::from).unwrap_or_default())
                .build();
            let name = ElementBuilder::new("div")?.class("user-name").text(&user.name).build();
            let id = ElementBuilder::new("div")?.class("user-id").text(&user.student_id).build();
            let info = ElementBuilder::new("div")?.class("user-info").child(name)?.child(id)?.build();
            if !user.department.is_empty() {
                let dept = ElementBuilder::new("div")?.class("user-dept").text(&user.department).build();
                append_child(&info, &dept)?;
            }
            append_child(card, &avatar)?;
            append_child(card, &info)?;
        }
        None => {
            let title = ElementBuilder::new("div")?.class("user-name").i18n("user_unavailable", lang)?.build();
            let hint = ElementBuilder::new("div")?.class("user-hint").i18n("user_unavailable_hint", lang)?.build();
            append_child(card, &title)?;
            append_child(card, &hint)?;
        }
    }
    Ok(())
}

/// Tarjeta de ubicación vacía (estado "obteniendo")
pub fn render_location_card(lang: Language) -> Result<Element, JsValue> {
    let card = ElementBuilder::new("div")?.id("location-card")?.class("card location-card").build();
    let status = ElementBuilder::new("div")?
        .class("location-status loading")
        .i18n("location_getting", lang)?
        .build();
    append_child(&card, &status)?;
    Ok(card)
}

/// Pinta el resultado final del servicio de ubicación
pub fn fill_location_card(card: &Element, view: &LocationView, lang: Language) -> Result<(), JsValue> {
    crate::dom::clear_children(card);
    match view {
        LocationView::Pending => {
            let status = ElementBuilder::new("div")?
                .class("location-status unknown")
                .i18n("location_pending", lang)?
                .build();
            append_child(card, &status)?;
        }
        LocationView::Unavailable(err) | LocationView::Failed(err) => {
            let status = ElementBuilder::new("div")?
                .class("location-status invalid")
                .text(&format!("❌ {}", t("location_failed", lang)))
                .build();
            let detail = ElementBuilder::new("div")?.class("location-detail").text(&err.user_message(lang)).build();
            append_child(card, &status)?;
            append_child(card, &detail)?;
        }
        LocationView::Resolved(resolution) => {
            let status = ElementBuilder::new("div")?
                .class(resolution.status.css_class())
                .text(&format!("{} {}", resolution.status.icon(), resolution.headline(lang)))
                .build();
            append_child(card, &status)?;
            if let Some(distance) = resolution.distance_text(lang) {
                let line = ElementBuilder::new("div")?.class("location-detail").text(&distance).build();
                append_child(card, &line)?;
            }
            if let Some(campus) = resolution.building.as_ref().and_then(|b| b.campus.as_deref()) {
                let line = ElementBuilder::new("div")?.class("location-campus").text(campus).build();
                append_child(card, &line)?;
            }
        }
    }
    Ok(())
}

/// Aviso de sesión caducada con botón de recarga
pub fn render_auth_expired(lang: Language) -> Result<Element, JsValue> {
    let title = ElementBuilder::new("h3")?.i18n("auth_expired_title", lang)?.build();
    let message = ElementBuilder::new("p")?.i18n("auth_expired", lang)?.build();
    let button = ElementBuilder::new("button")?
        .class("btn btn-primary")
        .i18n("refresh_page", lang)?
        .build();
    on_click(&button, |_| reload_page())?;
    ElementBuilder::new("div")?
        .class("auth-expired")
        .child(title)?
        .child(message)?
        .child(button)
        .map(|b| b.build())
}

/// Estado vacío con texto traducible
pub fn render_empty(key: &str, lang: Language) -> Result<Element, JsValue> {
    Ok(ElementBuilder::new("div")?.class("empty-state").i18n(key, lang)?.build())
}

pub fn reload_page() {
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.location().reload() {
            log::error!("❌ [APP] Recarga fallida: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_kind_classes() {
        assert_eq!(ToastKind::Success.css_class(), "toast success show");
        assert_eq!(ToastKind::Error.css_class(), "toast error show");
    }
}
