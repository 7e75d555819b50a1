// ============================================================================
// MATERIAL VIEW - Registro de llegada de nuevos estudiantes
// ============================================================================
// Dos pantallas dentro de la misma página: inicio (escaneo / consulta manual /
// registros recientes) y ficha del estudiante con la confirmación.
// ============================================================================

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, KeyboardEvent};

use crate::dom::{
    append_child, clear_children, input_value, on_click, on_event, set_disabled, set_input_value, set_text_content,
    set_visible, ElementBuilder,
};
use crate::errors::{AppError, AppResult};
use crate::models::material::{RecentRecord, StudentLookup};
use crate::services::api_client::ApiClient;
use crate::services::bridge::{PlatformBridge, WwScanBridge};
use crate::state::AppState;
use crate::utils::device::is_in_wecom;
use crate::utils::i18n::{t, Language};
use crate::utils::storage::get_or_create_device_id;
use crate::viewmodels::{LookupVerdict, MaterialViewModel};
use crate::views::common::{render_empty, render_header, set_loading, toast_error, toast_success};
use crate::views::scanner::render_scanner;

type MaterialVm = MaterialViewModel<ApiClient>;

/// Referencias que las acciones necesitan repintar
#[derive(Clone)]
struct MaterialDom {
    home: Element,
    result: Element,
    greeting: Element,
    recent: Element,
}

/// Renderizar el mini-app de registro
pub fn render_material(state: &AppState) -> Result<Element, JsValue> {
    log::info!("🎬 [MATERIAL] render_material()");
    let lang = state.lang();
    let api = ApiClient::new();
    let vm: Rc<MaterialVm> = Rc::new(MaterialViewModel::new(api.clone(), get_or_create_device_id()));
    let ww = WwScanBridge::new();

    let page = ElementBuilder::new("div")?.class("material-page").build();
    append_child(&page, &render_header(state, "material_title")?)?;

    // ---- Inicio ----
    let greeting = ElementBuilder::new("div")?.class("card user-card").i18n("loading", lang)?.build();
    let wework_btn = ElementBuilder::new("button")?
        .class("btn btn-primary btn-block")
        .i18n("scan_wework", lang)?
        .build();
    let camera_btn = ElementBuilder::new("button")?
        .class("btn btn-secondary btn-block")
        .i18n("scan_camera", lang)?
        .build();
    let card_input = ElementBuilder::new("input")?
        .attr("type", "text")?
        .attr("inputmode", "numeric")?
        .class("form-input")
        .placeholder("card_number", lang)?
        .build();
    let manual_btn = ElementBuilder::new("button")?.class("btn btn-outline").i18n("manual_lookup", lang)?.build();
    let manual = ElementBuilder::new("div")?
        .class("manual-lookup")
        .child(card_input.clone())?
        .child(manual_btn.clone())?
        .build();
    let actions = ElementBuilder::new("div")?
        .class("card material-actions")
        .child(wework_btn.clone())?
        .child(camera_btn.clone())?
        .child(manual)?
        .build();
    let recent_title = ElementBuilder::new("h3")?.i18n("recent_records", lang)?.build();
    let recent = ElementBuilder::new("div")?.class("recent-list").build();
    let recent_card = ElementBuilder::new("div")?
        .class("card recent-records")
        .child(recent_title)?
        .child(recent.clone())?
        .build();
    let home = ElementBuilder::new("div")?
        .id("material-home")?
        .child(greeting.clone())?
        .child(actions)?
        .child(recent_card)?
        .build();

    // ---- Ficha ----
    let result = ElementBuilder::new("div")?.id("material-result")?.class("card student-result").build();
    set_visible(&result, false);

    append_child(&page, &home)?;
    append_child(&page, &result)?;

    let dom = MaterialDom { home, result, greeting, recent };

    // Consulta común a las tres vías de entrada
    let on_lookup: Rc<dyn Fn(LookupSource)> = {
        let vm = vm.clone();
        let state = state.clone();
        let dom = dom.clone();
        Rc::new(move |source: LookupSource| {
            let vm = vm.clone();
            let state = state.clone();
            let dom = dom.clone();
            spawn_local(async move {
                set_loading(true);
                let verdict = match &source {
                    LookupSource::Scanned(code) => vm.lookup_scanned(code).await,
                    LookupSource::Manual(card) => vm.lookup_manual(card).await,
                };
                set_loading(false);
                let lang = state.lang();
                match verdict {
                    Ok(verdict) => {
                        if let Err(e) = show_result(&dom, &vm, &state, &verdict) {
                            log::error!("❌ [MATERIAL] {:?}", e);
                        }
                    }
                    Err(err) => toast_error(&lookup_error_message(&err, &source, lang)),
                }
            });
        })
    };

    // ---- Escaneo WeCom ----
    if is_in_wecom() {
        if let Err(err) = ww.register(api.clone()) {
            log::warn!("⚠️ [MATERIAL] ww no disponible: {}", err);
        }
    }
    set_visible(&wework_btn, is_in_wecom());
    {
        let on_lookup = on_lookup.clone();
        let state = state.clone();
        let ww = ww.clone();
        on_click(&wework_btn, move |_| {
            let on_lookup = on_lookup.clone();
            let state = state.clone();
            let ww = ww.clone();
            spawn_local(async move {
                match ww.scan_code().await {
                    Ok(code) => on_lookup(LookupSource::Scanned(code)),
                    Err(AppError::Cancelled) => log::info!("📷 [MATERIAL] Escaneo cancelado"),
                    Err(AppError::BridgeNotReady) => toast_error(&t("open_in_wework", state.lang())),
                    Err(err) => {
                        log::error!("❌ [MATERIAL] Escaneo WeCom: {}", err);
                        toast_error(&t("scan_failed", state.lang()));
                    }
                }
            });
        })?;
    }

    // ---- Escaneo con cámara ----
    {
        let on_lookup = on_lookup.clone();
        let state = state.clone();
        let camera_btn_ref = camera_btn.clone();
        on_click(&camera_btn, move |_| {
            if crate::dom::get_element_by_id("scanner-modal").is_some() {
                return;
            }
            set_disabled(&camera_btn_ref, true);
            let on_close: Rc<dyn Fn()> = {
                let btn = camera_btn_ref.clone();
                Rc::new(move || set_disabled(&btn, false))
            };
            let on_code: Rc<dyn Fn(String)> = {
                let btn = camera_btn_ref.clone();
                let on_lookup = on_lookup.clone();
                Rc::new(move |code: String| {
                    set_disabled(&btn, false);
                    on_lookup(LookupSource::Scanned(code));
                })
            };
            let mounted = render_scanner(&state, on_close, on_code).and_then(|modal| {
                let body = crate::dom::document()
                    .and_then(|d| d.body())
                    .ok_or_else(|| JsValue::from_str("No body"))?;
                append_child(&body, &modal)
            });
            if let Err(e) = mounted {
                log::error!("❌ [MATERIAL] Escáner no montado: {:?}", e);
                set_disabled(&camera_btn_ref, false);
            }
        })?;
    }

    // ---- Consulta manual ----
    {
        let on_lookup = on_lookup.clone();
        let input = card_input.clone();
        on_click(&manual_btn, move |_| on_lookup(LookupSource::Manual(input_value(&input))))?;
    }
    {
        let on_lookup = on_lookup.clone();
        let input = card_input.clone();
        on_event(&card_input, "keydown", move |e| {
            if e.dyn_ref::<KeyboardEvent>().is_some_and(|k| k.key() == "Enter") {
                on_lookup(LookupSource::Manual(input_value(&input)));
            }
        })?;
    }

    // ---- Arranque ----
    {
        let vm = vm.clone();
        let state = state.clone();
        let dom = dom.clone();
        spawn_local(async move {
            let lang = state.lang();
            match vm.current_user().await {
                Some(user) => set_text_content(&dom.greeting, &format!("👋 {}", user.display_name())),
                None => set_text_content(&dom.greeting, &t("user_unavailable", lang)),
            }
            refresh_recent(&vm, &dom.recent, lang).await;
        });
    }

    Ok(page)
}

enum LookupSource {
    Scanned(String),
    Manual(String),
}

/// Mensaje del servidor si lo hay; si no, genérico según la vía
fn lookup_error_message(err: &AppError, source: &LookupSource, lang: Language) -> String {
    match err {
        AppError::Validation(_) => err.user_message(lang),
        AppError::Server { message, .. } if !message.trim().is_empty() => message.clone(),
        _ => match source {
            LookupSource::Scanned(_) => t("scan_failed", lang),
            LookupSource::Manual(_) => t("lookup_failed", lang),
        },
    }
}

async fn refresh_recent(vm: &MaterialVm, container: &Element, lang: Language) {
    let records = vm.recent_records().await;
    if let Err(e) = paint_recent(container, records, lang) {
        log::error!("❌ [MATERIAL] {:?}", e);
    }
}

fn paint_recent(container: &Element, records: AppResult<Vec<RecentRecord>>, lang: Language) -> Result<(), JsValue> {
    clear_children(container);
    let records = match records {
        Ok(records) if !records.is_empty() => records,
        Ok(_) => return append_child(container, &render_empty("no_recent_records", lang)?),
        Err(err) => {
            let notice = ElementBuilder::new("div")?.class("empty-state").text(&err.user_message(lang)).build();
            return append_child(container, &notice);
        }
    };
    for record in records {
        let name = ElementBuilder::new("span")?.class("recent-name").text(&record.name).build();
        let dept = ElementBuilder::new("span")?.class("recent-dept").text(&record.dept).build();
        let time = ElementBuilder::new("span")?.class("recent-time").text(&record.received_at).build();
        let row = ElementBuilder::new("div")?
            .class("recent-item")
            .child(name)?
            .child(dept)?
            .child(time)?
            .build();
        append_child(container, &row)?;
    }
    Ok(())
}

/// Ficha del estudiante; confirmar solo si aún no había recibido
fn show_result(dom: &MaterialDom, vm: &Rc<MaterialVm>, state: &AppState, verdict: &LookupVerdict) -> Result<(), JsValue> {
    let lang = state.lang();
    let student = verdict.student();
    clear_children(&dom.result);

    let (status_class, status_key) = match verdict {
        LookupVerdict::CanReceive(_) => ("result-status ok", "can_receive"),
        LookupVerdict::AlreadyReceived(_) => ("result-status warn", "already_received"),
    };
    let status = ElementBuilder::new("div")?.class(status_class).i18n(status_key, lang)?.build();
    append_child(&dom.result, &status)?;
    append_child(&dom.result, &student_details(student, lang)?)?;

    let confirm = ElementBuilder::new("button")?
        .class("btn btn-primary btn-block")
        .i18n("confirm_receive", lang)?
        .build();
    set_visible(&confirm, matches!(verdict, LookupVerdict::CanReceive(_)));
    let back = ElementBuilder::new("button")?.class("btn btn-outline btn-block").i18n("back_home", lang)?.build();
    append_child(&dom.result, &confirm)?;
    append_child(&dom.result, &back)?;

    {
        let vm = vm.clone();
        let state = state.clone();
        let dom = dom.clone();
        let confirm_ref = confirm.clone();
        on_click(&confirm, move |_| {
            let vm = vm.clone();
            let state = state.clone();
            let dom = dom.clone();
            let confirm = confirm_ref.clone();
            spawn_local(async move {
                set_disabled(&confirm, true);
                set_loading(true);
                let result = vm.confirm().await;
                set_loading(false);
                let lang = state.lang();
                match result {
                    Ok(message) => {
                        toast_success(&message.unwrap_or_else(|| t("receive_success", lang)));
                        set_visible(&confirm, false);
                        refresh_recent(&vm, &dom.recent, lang).await;
                    }
                    Err(err) => {
                        let message = match &err {
                            AppError::Server { message, .. } if !message.trim().is_empty() => message.clone(),
                            AppError::Validation(_) => err.user_message(lang),
                            _ => t("receive_failed", lang),
                        };
                        toast_error(&message);
                        set_disabled(&confirm, false);
                    }
                }
            });
        })?;
    }
    {
        let vm = vm.clone();
        let dom = dom.clone();
        on_click(&back, move |_| {
            vm.back_home();
            set_visible(&dom.result, false);
            set_visible(&dom.home, true);
        })?;
    }

    set_visible(&dom.home, false);
    set_visible(&dom.result, true);
    if let Some(input) = dom.home.query_selector("input").ok().flatten() {
        set_input_value(&input, "");
    }
    Ok(())
}

fn student_details(student: &StudentLookup, lang: Language) -> Result<Element, JsValue> {
    let details = ElementBuilder::new("div")?.class("student-details").build();
    for (key, value) in [("name", &student.name), ("card_number", &student.credential_no), ("department", &student.dept)] {
        let label = ElementBuilder::new("span")?.class("detail-label").i18n(key, lang)?.build();
        let text = ElementBuilder::new("span")?.class("detail-value").text(value).build();
        let row = ElementBuilder::new("div")?.class("detail-row").child(label)?.child(text)?.build();
        append_child(&details, &row)?;
    }
    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_prefers_server_message() {
        let err = AppError::Server { status: 404, message: "未找到该学生".into() };
        let msg = lookup_error_message(&err, &LookupSource::Manual("2024001".into()), Language::English);
        assert_eq!(msg, "未找到该学生");
    }

    #[test]
    fn test_lookup_error_falls_back_per_source() {
        let err = AppError::Network("reset".into());
        assert_eq!(
            lookup_error_message(&err, &LookupSource::Scanned("x".into()), Language::English),
            t("scan_failed", Language::English)
        );
        assert_eq!(
            lookup_error_message(&err, &LookupSource::Manual("x".into()), Language::Chinese),
            "查询失败，请检查学工号是否正确"
        );
    }

    #[test]
    fn test_validation_errors_are_translated() {
        let err = AppError::Validation("card_number_too_short");
        assert_eq!(
            lookup_error_message(&err, &LookupSource::Manual("123".into()), Language::Chinese),
            "学工号长度不能少于6位"
        );
    }
}
