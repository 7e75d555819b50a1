// ============================================================================
// STATISTICS VIEW - Calendario mensual de asistencia
// ============================================================================

use std::rc::Rc;

use chrono::{Datelike, NaiveDate};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;

use crate::dom::{
    append_child, clear_children, input_value, on_change, on_click, set_input_value, ElementBuilder,
};
use crate::models::calendar::{selectable_years, CalendarCell};
use crate::services::api_client::ApiClient;
use crate::services::identity_service::{page_identity, STATISTICS_RETRY_KEY};
use crate::state::AppState;
use crate::utils::format::{format_date, today};
use crate::utils::i18n::{t, Language};
use crate::viewmodels::statistics_viewmodel::{DayDetail, MonthView, StatisticsViewModel};
use crate::views::common::{
    fill_user_card, render_auth_expired, render_header, render_user_card, set_loading, toast_error,
};

type StatsVm = StatisticsViewModel<ApiClient>;

const WEEKDAYS_ZH: [&str; 7] = ["日", "一", "二", "三", "四", "五", "六"];
const WEEKDAYS_EN: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Renderizar la página de estadísticas
pub fn render_statistics(state: &AppState) -> Result<Element, JsValue> {
    log::info!("🎬 [STATISTICS] render_statistics()");
    let lang = state.lang();
    let api = ApiClient::new();
    let vm = Rc::new(StatisticsViewModel::new(state.clone(), api.clone()));
    let now = today();

    let page = ElementBuilder::new("div")?.class("statistics-page").build();
    append_child(&page, &render_header(state, "statistics_title")?)?;
    let user_card = render_user_card(state.user().as_ref(), lang)?;
    append_child(&page, &user_card)?;

    // ---- Selectores ----
    let year_select = ElementBuilder::new("select")?.id("year-select")?.class("form-select").build();
    for year in selectable_years(now.year()) {
        let option = ElementBuilder::new("option")?
            .attr("value", &year.to_string())?
            .text(&year.to_string())
            .build();
        append_child(&year_select, &option)?;
    }
    let month_select = ElementBuilder::new("select")?.id("month-select")?.class("form-select").build();
    for month in 1..=12u32 {
        let option = ElementBuilder::new("option")?
            .attr("value", &month.to_string())?
            .attr("data-zh", &format!("{}月", month))?
            .attr("data-en", &month_name(month).to_string())?
            .text(&month_label(month, lang))
            .build();
        append_child(&month_select, &option)?;
    }
    set_input_value(&year_select, &now.year().to_string());
    set_input_value(&month_select, &now.month().to_string());

    let prev = ElementBuilder::new("button")?.class("btn btn-icon").text("‹").build();
    let next = ElementBuilder::new("button")?.class("btn btn-icon").text("›").build();
    let controls = ElementBuilder::new("div")?
        .class("calendar-controls")
        .child(prev.clone())?
        .child(year_select.clone())?
        .child(month_select.clone())?
        .child(next.clone())?
        .build();
    append_child(&page, &controls)?;

    let content = ElementBuilder::new("div")?.id("statistics-content")?.class("statistics-content").build();
    append_child(&page, &content)?;

    // Carga del mes seleccionado
    let load: Rc<dyn Fn()> = {
        let vm = vm.clone();
        let state = state.clone();
        let content = content.clone();
        let (year_select, month_select) = (year_select.clone(), month_select.clone());
        let api = api.clone();
        Rc::new(move || {
            let year = input_value(&year_select).parse().unwrap_or(now.year());
            let month = input_value(&month_select).parse().unwrap_or(now.month());
            let vm = vm.clone();
            let state = state.clone();
            let content = content.clone();
            let api = api.clone();
            spawn_local(async move {
                set_loading(true);
                let result = vm.load_month(year, month, today()).await;
                set_loading(false);
                let lang = state.lang();
                let rendered = match result {
                    Ok(view) => fill_month(&content, &view, vm.clone(), lang),
                    Err(err) if err.is_auth_expired() => {
                        page_identity(api, state.clone(), STATISTICS_RETRY_KEY).reset();
                        clear_children(&content);
                        render_auth_expired(lang).and_then(|notice| append_child(&content, &notice))
                    }
                    Err(err) => {
                        toast_error(&format!("{}: {}", t("load_attendance_failed", lang), err.user_message(lang)));
                        Ok(())
                    }
                };
                if let Err(e) = rendered {
                    log::error!("❌ [STATISTICS] {:?}", e);
                }
            });
        })
    };

    {
        let load = load.clone();
        on_change(&year_select, move |_| load())?;
    }
    {
        let load = load.clone();
        on_change(&month_select, move |_| load())?;
    }
    for (button, step) in [(&prev, -1i32), (&next, 1i32)] {
        let load = load.clone();
        let (year_select, month_select) = (year_select.clone(), month_select.clone());
        on_click(button, move |_| {
            let year: i32 = input_value(&year_select).parse().unwrap_or(now.year());
            let month: i32 = input_value(&month_select).parse().unwrap_or(now.month() as i32);
            let (year, month) = shift_month(year, month, step);
            // Fuera del rango del selector no se navega
            if !selectable_years(now.year()).contains(&year) {
                return;
            }
            set_input_value(&year_select, &year.to_string());
            set_input_value(&month_select, &month.to_string());
            load();
        })?;
    }

    // ---- Arranque ----
    {
        let state = state.clone();
        spawn_local(async move {
            let user = page_identity(api, state.clone(), STATISTICS_RETRY_KEY).load_into(&state).await;
            if let Err(e) = fill_user_card(&user_card, user.as_ref(), state.lang()) {
                log::error!("❌ [STATISTICS] {:?}", e);
            }
            if user.is_some() {
                load();
            }
        });
    }

    Ok(page)
}

fn shift_month(year: i32, month: i32, step: i32) -> (i32, i32) {
    let index = year * 12 + (month - 1) + step;
    (index.div_euclid(12), index.rem_euclid(12) + 1)
}

fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];
    NAMES[((month.max(1) - 1) % 12) as usize]
}

fn month_label(month: u32, lang: Language) -> String {
    match lang {
        Language::Chinese => format!("{}月", month),
        Language::English => month_name(month).to_string(),
    }
}

fn fill_month(content: &Element, view: &MonthView, vm: Rc<StatsVm>, lang: Language) -> Result<(), JsValue> {
    clear_children(content);
    append_child(content, &render_summary(view, lang)?)?;

    let grid = ElementBuilder::new("div")?.class("calendar-grid").build();
    for (zh, en) in WEEKDAYS_ZH.iter().zip(WEEKDAYS_EN.iter()) {
        let head = ElementBuilder::new("div")?
            .class("calendar-weekday")
            .attr("data-zh", zh)?
            .attr("data-en", en)?
            .text(lang.pick(zh, en))
            .build();
        append_child(&grid, &head)?;
    }
    for cell in &view.cells {
        append_child(&grid, &render_cell(cell, vm.clone(), lang)?)?;
    }
    append_child(content, &grid)?;
    Ok(())
}

fn render_summary(view: &MonthView, lang: Language) -> Result<Element, JsValue> {
    let summary = ElementBuilder::new("div")?.class("stats-summary").build();
    let items = [
        ("attended_days", view.summary.attended_days.to_string()),
        ("missed_days", view.summary.missed_days.to_string()),
        ("attendance_rate", format!("{}%", view.summary.attendance_rate)),
    ];
    for (key, value) in items {
        let number = ElementBuilder::new("div")?.class("stat-value").text(&value).build();
        let label = ElementBuilder::new("div")?.class("stat-label").i18n(key, lang)?.build();
        let card = ElementBuilder::new("div")?.class("stat-card").child(number)?.child(label)?.build();
        append_child(&summary, &card)?;
    }
    Ok(summary)
}

fn render_cell(cell: &CalendarCell, vm: Rc<StatsVm>, lang: Language) -> Result<Element, JsValue> {
    let element = ElementBuilder::new("div")?
        .class(&cell.css_class())
        .text(&cell.day.to_string())
        .build();
    if let Some(date) = cell.date {
        on_click(&element, move |_| match vm.day_detail(date) {
            Some(detail) => {
                if let Err(e) = show_day_modal(&detail, date, lang) {
                    log::error!("❌ [STATISTICS] {:?}", e);
                }
            }
            None => toast_error(&t("no_signin_record", lang)),
        })?;
    }
    Ok(element)
}

/// Modal con el detalle del día
fn show_day_modal(detail: &DayDetail, date: NaiveDate, lang: Language) -> Result<(), JsValue> {
    if let Some(old) = crate::dom::get_element_by_id("day-modal") {
        old.remove();
    }
    let record = &detail.record;
    let rows = [
        ("date", format_date(&date)),
        ("time", record.time_text()),
        ("course", record.course.clone()),
        ("classroom", record.classroom.clone()),
        ("status", record.status.label(lang)),
        ("coordinates", record.coordinates_text().unwrap_or_else(|| "-".to_string())),
        ("building", detail.building.clone()),
    ];

    let body = ElementBuilder::new("div")?.class("modal-body").build();
    for (key, value) in rows {
        let label = ElementBuilder::new("span")?.class("detail-label").i18n(key, lang)?.build();
        let text = ElementBuilder::new("span")?.class("detail-value").text(&value).build();
        let row = ElementBuilder::new("div")?.class("detail-row").child(label)?.child(text)?.build();
        append_child(&body, &row)?;
    }
    match record.photo_url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => {
            let img = ElementBuilder::new("img")?.class("detail-photo").attr("src", url)?.build();
            append_child(&body, &img)?;
        }
        None => {
            let none = ElementBuilder::new("div")?.class("detail-photo empty").i18n("no_photo", lang)?.build();
            append_child(&body, &none)?;
        }
    }

    let close = ElementBuilder::new("button")?.class("btn btn-secondary").i18n("close", lang)?.build();
    let content = ElementBuilder::new("div")?
        .class("modal-content")
        .child(body)?
        .child(close.clone())?
        .build();
    let modal = ElementBuilder::new("div")?.id("day-modal")?.class("modal active").child(content.clone())?.build();

    {
        let modal_ref = modal.clone();
        on_click(&close, move |_| modal_ref.remove())?;
    }
    {
        let modal_ref = modal.clone();
        on_click(&modal, move |e| {
            // Solo el fondo cierra
            let on_backdrop = e
                .target()
                .and_then(|target| target.dyn_into::<Element>().ok())
                .is_some_and(|target| target == modal_ref);
            if on_backdrop {
                modal_ref.remove();
            }
        })?;
    }

    let body_el = crate::dom::document()
        .and_then(|d| d.body())
        .ok_or_else(|| JsValue::from_str("No body"))?;
    append_child(&body_el, &modal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_month_wraps_years() {
        assert_eq!(shift_month(2024, 1, -1), (2023, 12));
        assert_eq!(shift_month(2024, 12, 1), (2025, 1));
        assert_eq!(shift_month(2024, 6, 1), (2024, 7));
    }

    #[test]
    fn test_month_labels() {
        assert_eq!(month_label(3, Language::Chinese), "3月");
        assert_eq!(month_label(3, Language::English), "Mar");
    }
}
