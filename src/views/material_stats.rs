// ============================================================================
// MATERIAL STATS VIEW - Ranking de verificadores
// ============================================================================

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;

use crate::dom::{append_child, clear_children, ElementBuilder};
use crate::models::material::{HandlerOverview, HandlerStat};
use crate::services::api_client::ApiClient;
use crate::state::AppState;
use crate::utils::i18n::Language;
use crate::utils::storage::get_or_create_device_id;
use crate::viewmodels::MaterialViewModel;
use crate::views::common::{render_empty, render_header, set_loading, toast_error};

/// Renderizar la página de estadísticas de verificación
pub fn render_material_stats(state: &AppState) -> Result<Element, JsValue> {
    log::info!("🎬 [MATERIAL_STATS] render_material_stats()");
    let page = ElementBuilder::new("div")?.class("material-stats-page").build();
    append_child(&page, &render_header(state, "handler_stats")?)?;
    let content = ElementBuilder::new("div")?.id("handler-stats")?.class("handler-stats").build();
    append_child(&page, &content)?;

    let vm = MaterialViewModel::new(ApiClient::new(), get_or_create_device_id());
    let state = state.clone();
    spawn_local(async move {
        set_loading(true);
        let result = vm.handler_overview().await;
        set_loading(false);
        let lang = state.lang();
        let painted = match result {
            Ok((stats, overview)) => paint_stats(&content, &stats, overview, lang),
            Err(err) => {
                log::error!("❌ [MATERIAL_STATS] {}", err);
                toast_error(&err.user_message(lang));
                clear_children(&content);
                render_empty("no_stats", lang).and_then(|empty| append_child(&content, &empty))
            }
        };
        if let Err(e) = painted {
            log::error!("❌ [MATERIAL_STATS] {:?}", e);
        }
    });

    Ok(page)
}

fn paint_stats(container: &Element, stats: &[HandlerStat], overview: HandlerOverview, lang: Language) -> Result<(), JsValue> {
    clear_children(container);

    let summary = ElementBuilder::new("div")?.class("stats-summary").build();
    for (key, value) in [
        ("total_handlers", overview.total_handlers.to_string()),
        ("total_checks", overview.total_records.to_string()),
        ("avg_checks", overview.average.to_string()),
    ] {
        let number = ElementBuilder::new("div")?.class("stat-value").text(&value).build();
        let label = ElementBuilder::new("div")?.class("stat-label").i18n(key, lang)?.build();
        let card = ElementBuilder::new("div")?.class("stat-card").child(number)?.child(label)?.build();
        append_child(&summary, &card)?;
    }
    append_child(container, &summary)?;

    if stats.is_empty() {
        return append_child(container, &render_empty("no_stats", lang)?);
    }

    let list = ElementBuilder::new("div")?.class("handler-list card").build();
    for (rank, stat) in stats.iter().enumerate() {
        let position = ElementBuilder::new("span")?.class(rank_class(rank)).text(&(rank + 1).to_string()).build();
        let name = ElementBuilder::new("span")?.class("handler-name").text(&stat.handle_name).build();
        let id = ElementBuilder::new("span")?.class("handler-id").text(&stat.handle_student_id).build();
        let count = ElementBuilder::new("span")?.class("handler-count").text(&stat.count.to_string()).build();
        let row = ElementBuilder::new("div")?
            .class("handler-item")
            .child(position)?
            .child(name)?
            .child(id)?
            .child(count)?
            .build();
        append_child(&list, &row)?;
    }
    append_child(container, &list)
}

/// Los tres primeros llevan medalla
fn rank_class(rank: usize) -> &'static str {
    match rank {
        0 => "handler-rank gold",
        1 => "handler-rank silver",
        2 => "handler-rank bronze",
        _ => "handler-rank",
    }
}
