// ============================================================================
// RECORDS VIEW - Historial de firmas con filtros, páginas y exportación
// ============================================================================

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;

use crate::dom::{
    append_child, clear_children, input_value, on_change, on_click, on_input, set_disabled,
    set_text_content, toggle_class, ElementBuilder,
};
use crate::models::attendance::{AttendanceRecord, AttendanceStats, StatusFilter, TimeRange};
use crate::services::api_client::ApiClient;
use crate::services::bridge::to_js_object;
use crate::services::identity_service::{page_identity, SessionCounterStore, RECORDS_RETRY_KEY};
use crate::state::AppState;
use crate::utils::debounce::Debouncer;
use crate::utils::format::now_local;
use crate::utils::i18n::{t, Language};
use crate::viewmodels::records_viewmodel::PageView;
use crate::viewmodels::RecordsViewModel;
use crate::views::common::{
    fill_user_card, render_auth_expired, render_empty, render_header, render_user_card, set_loading, toast_error,
    toast_success,
};

type RecordsVm = RecordsViewModel<ApiClient, SessionCounterStore>;

const SEARCH_DEBOUNCE_MS: u32 = 300;

/// Elementos que se repintan tras cada cambio
#[derive(Clone)]
struct RecordsDom {
    stats: Element,
    list: Element,
    page_label: Element,
    prev: Element,
    next: Element,
}

/// Renderizar la página de registros
pub fn render_records(state: &AppState) -> Result<Element, JsValue> {
    log::info!("🎬 [RECORDS] render_records()");
    let lang = state.lang();
    let api = ApiClient::new();
    let vm: Rc<RecordsVm> = Rc::new(RecordsViewModel::new(state.clone(), api.clone(), SessionCounterStore));

    let page = ElementBuilder::new("div")?.class("records-page").build();
    append_child(&page, &render_header(state, "records_title")?)?;
    let user_card = render_user_card(state.user().as_ref(), lang)?;
    append_child(&page, &user_card)?;

    let stats = ElementBuilder::new("div")?.id("records-stats")?.class("stats-summary").build();
    append_child(&page, &stats)?;

    // ---- Filtros ----
    let range_tabs = ElementBuilder::new("div")?.class("range-tabs").build();
    for (range, key) in [
        (TimeRange::Week, "range_week"),
        (TimeRange::Month, "range_month"),
        (TimeRange::Semester, "range_semester"),
    ] {
        let tab = ElementBuilder::new("button")?
            .class(if range == vm.range() { "range-tab active" } else { "range-tab" })
            .attr("data-range", range.code())?
            .i18n(key, lang)?
            .build();
        append_child(&range_tabs, &tab)?;
    }

    let search = ElementBuilder::new("input")?
        .attr("type", "search")?
        .class("form-input search-input")
        .placeholder("search_placeholder", lang)?
        .build();
    let status_select = ElementBuilder::new("select")?.class("form-select").build();
    for (code, key) in [
        ("all", "status_all"),
        ("attended", "status_present"),
        ("late", "status_late"),
        ("absent", "status_absent"),
    ] {
        let option = ElementBuilder::new("option")?.attr("value", code)?.i18n(key, lang)?.build();
        append_child(&status_select, &option)?;
    }
    let export = ElementBuilder::new("button")?.class("btn btn-secondary").i18n("export", lang)?.build();
    let filters = ElementBuilder::new("div")?
        .class("records-filters")
        .child(search.clone())?
        .child(status_select.clone())?
        .child(export.clone())?
        .build();
    append_child(&page, &range_tabs)?;
    append_child(&page, &filters)?;

    // ---- Lista + paginación ----
    let list = ElementBuilder::new("div")?.id("records-list")?.class("records-list").build();
    let prev = ElementBuilder::new("button")?.class("btn btn-page").i18n("prev_page", lang)?.build();
    let next = ElementBuilder::new("button")?.class("btn btn-page").i18n("next_page", lang)?.build();
    let page_label = ElementBuilder::new("span")?.class("page-label").build();
    let pagination = ElementBuilder::new("div")?
        .class("pagination")
        .child(prev.clone())?
        .child(page_label.clone())?
        .child(next.clone())?
        .build();
    append_child(&page, &list)?;
    append_child(&page, &pagination)?;

    let dom = RecordsDom { stats, list, page_label, prev: prev.clone(), next: next.clone() };

    let repaint: Rc<dyn Fn()> = {
        let vm = vm.clone();
        let state = state.clone();
        let dom = dom.clone();
        Rc::new(move || {
            let lang = state.lang();
            let view = vm.page(now_local(), lang);
            if let Err(e) = paint_page(&dom, &view, vm.stats(), lang) {
                log::error!("❌ [RECORDS] {:?}", e);
            }
        })
    };

    let reload: Rc<dyn Fn()> = {
        let vm = vm.clone();
        let state = state.clone();
        let repaint = repaint.clone();
        let list = dom.list.clone();
        Rc::new(move || {
            let vm = vm.clone();
            let state = state.clone();
            let repaint = repaint.clone();
            let list = list.clone();
            spawn_local(async move {
                set_loading(true);
                let result = vm.load(now_local()).await;
                set_loading(false);
                let lang = state.lang();
                match result {
                    Ok(()) => repaint(),
                    // El viewmodel ya limpió identidad y contador
                    Err(err) if err.is_auth_expired() => {
                        clear_children(&list);
                        match render_auth_expired(lang) {
                            Ok(notice) => {
                                let _ = append_child(&list, &notice);
                            }
                            Err(e) => log::error!("❌ [RECORDS] {:?}", e),
                        }
                    }
                    Err(err) => toast_error(&format!("{}: {}", t("load_records_failed", lang), err.user_message(lang))),
                }
            });
        })
    };

    // ---- Eventos ----
    {
        let vm = vm.clone();
        let repaint = repaint.clone();
        let debouncer = Debouncer::new(SEARCH_DEBOUNCE_MS);
        on_input(&search, move |value| {
            let vm = vm.clone();
            let repaint = repaint.clone();
            debouncer.schedule(move || {
                vm.set_search(&value);
                repaint();
            });
        })?;
    }
    {
        let vm = vm.clone();
        let repaint = repaint.clone();
        let select = status_select.clone();
        on_change(&status_select, move |_| {
            vm.set_status(StatusFilter::from_code(&input_value(&select)));
            repaint();
        })?;
    }
    if let Ok(tabs) = query_selector_in(&range_tabs, ".range-tab") {
        for tab in tabs {
            let vm = vm.clone();
            let reload = reload.clone();
            let range_tabs = range_tabs.clone();
            let this = tab.clone();
            on_click(&tab, move |_| {
                let range = TimeRange::from_code(&this.get_attribute("data-range").unwrap_or_default());
                if range == vm.range() {
                    return;
                }
                if let Ok(all) = query_selector_in(&range_tabs, ".range-tab") {
                    for other in all {
                        let _ = toggle_class(&other, "active", other == this);
                    }
                }
                vm.set_range(range);
                reload();
            })?;
        }
    }
    {
        let vm = vm.clone();
        let repaint = repaint.clone();
        on_click(&prev, move |_| {
            if vm.prev_page() {
                repaint();
            }
        })?;
    }
    {
        let vm = vm.clone();
        let repaint = repaint.clone();
        on_click(&next, move |_| {
            if vm.next_page(now_local()) {
                repaint();
            }
        })?;
    }
    {
        let vm = vm.clone();
        let state = state.clone();
        on_click(&export, move |_| {
            let lang = state.lang();
            match vm.export_csv(now_local(), lang) {
                Some((name, csv)) => match download_csv(&name, &csv) {
                    Ok(()) => toast_success(&t("export_success", lang)),
                    Err(e) => {
                        log::error!("❌ [RECORDS] Exportación fallida: {:?}", e);
                        toast_error(&t("export_failed", lang));
                    }
                },
                None => toast_error(&t("no_records", lang)),
            }
        })?;
    }
    // Repintar etiquetas dinámicas al cambiar de idioma
    {
        let repaint = repaint.clone();
        state.language.subscribe(move |_| repaint());
    }

    // ---- Arranque ----
    {
        let state = state.clone();
        spawn_local(async move {
            let user = page_identity(api, state.clone(), RECORDS_RETRY_KEY).load_into(&state).await;
            if let Err(e) = fill_user_card(&user_card, user.as_ref(), state.lang()) {
                log::error!("❌ [RECORDS] {:?}", e);
            }
            if user.is_some() {
                reload();
            }
        });
    }

    Ok(page)
}

fn query_selector_in(parent: &Element, selector: &str) -> Result<Vec<Element>, JsValue> {
    let list = parent.query_selector_all(selector)?;
    Ok((0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}

fn paint_page(dom: &RecordsDom, view: &PageView, stats: AttendanceStats, lang: Language) -> Result<(), JsValue> {
    paint_stats(&dom.stats, stats, lang)?;

    clear_children(&dom.list);
    if view.rows.is_empty() {
        append_child(&dom.list, &render_empty("no_records", lang)?)?;
    }
    for record in &view.rows {
        append_child(&dom.list, &render_record(record, lang)?)?;
    }

    set_text_content(&dom.page_label, &view.label);
    set_disabled(&dom.prev, !view.has_prev);
    set_disabled(&dom.next, !view.has_next);
    Ok(())
}

fn paint_stats(container: &Element, stats: AttendanceStats, lang: Language) -> Result<(), JsValue> {
    clear_children(container);
    let items = [
        ("attended_days", stats.attended_days.to_string()),
        ("status_late", stats.late_days.to_string()),
        ("status_absent", stats.absent_days.to_string()),
        ("attendance_rate", format!("{}%", stats.attendance_rate)),
    ];
    for (key, value) in items {
        let number = ElementBuilder::new("div")?.class("stat-value").text(&value).build();
        let label = ElementBuilder::new("div")?.class("stat-label").i18n(key, lang)?.build();
        let card = ElementBuilder::new("div")?.class("stat-card").child(number)?.child(label)?.build();
        append_child(container, &card)?;
    }
    Ok(())
}

fn render_record(record: &AttendanceRecord, lang: Language) -> Result<Element, JsValue> {
    let course = ElementBuilder::new("div")?.class("record-course").text(&record.course).build();
    let status = ElementBuilder::new("span")?
        .class(&format!("status-badge {}", record.status.code()))
        .text(&record.status.label(lang))
        .build();
    let head = ElementBuilder::new("div")?.class("record-head").child(course)?.child(status)?.build();

    let place = if record.classroom.is_empty() {
        record.location.clone()
    } else {
        format!("{} · {}", record.location, record.classroom)
    };
    let meta = ElementBuilder::new("div")?.class("record-meta").text(&place).build();
    let time = ElementBuilder::new("div")?.class("record-time").text(&record.time_text()).build();

    ElementBuilder::new("div")?
        .class("record-item")
        .child(head)?
        .child(meta)?
        .child(time)
        .map(|b| b.build())
}

/// Descarga vía Blob + `<a download>`; BOM para que Excel lea UTF-8
fn download_csv(file_name: &str, csv: &str) -> Result<(), JsValue> {
    let parts = js_sys::Array::of1(&JsValue::from_str(&format!("\u{feff}{}", csv)));
    let options: web_sys::BlobPropertyBag = to_js_object(&serde_json::json!({ "type": "text/csv;charset=utf-8" }))
        .map_err(JsValue::from)?
        .unchecked_into();
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let anchor: web_sys::HtmlAnchorElement = ElementBuilder::new("a")?
        .attr("href", &url)?
        .attr("download", file_name)?
        .build()
        .dyn_into()?;
    anchor.click();
    web_sys::Url::revoke_object_url(&url)?;
    log::info!("📤 [RECORDS] {} descargado", file_name);
    Ok(())
}
