// ============================================================================
// FEEDBACK VIEW - Formulario de opinión
// ============================================================================

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlInputElement};

use crate::dom::{
    append_child, clear_children, on_change, on_click, on_input, set_disabled, set_input_value, set_text_content,
    toggle_class, ElementBuilder,
};
use crate::models::feedback::ImageMeta;
use crate::services::api_client::ApiClient;
use crate::state::AppState;
use crate::utils::i18n::{t, Language};
use crate::utils::storage::get_or_create_device_id;
use crate::viewmodels::FeedbackViewModel;
use crate::views::common::{render_header, set_loading, toast_error, toast_success};

type FeedbackVm = FeedbackViewModel<ApiClient>;

const FEEDBACK_TYPES: [(&str, &str); 4] = [
    ("bug", "feedback_type_bug"),
    ("suggestion", "feedback_type_suggestion"),
    ("praise", "feedback_type_praise"),
    ("other", "feedback_type_other"),
];

/// Renderizar la página de opinión
pub fn render_feedback(state: &AppState) -> Result<Element, JsValue> {
    log::info!("🎬 [FEEDBACK] render_feedback()");
    let lang = state.lang();
    let vm: Rc<FeedbackVm> = Rc::new(FeedbackViewModel::new(ApiClient::new()));
    let limits = vm.limits();

    let page = ElementBuilder::new("div")?.class("feedback-page").build();
    append_child(&page, &render_header(state, "feedback_title")?)?;
    let form = ElementBuilder::new("div")?.class("card feedback-form").build();
    append_child(&page, &form)?;

    // ---- Valoración ----
    let stars = ElementBuilder::new("div")?.class("rating-stars").build();
    for value in 1..=5u8 {
        let star = ElementBuilder::new("span")?
            .class("star")
            .attr("data-value", &value.to_string())?
            .text("★")
            .build();
        append_child(&stars, &star)?;
    }
    append_child(&form, &section("feedback_rating", &stars, lang)?)?;

    // ---- Tipo ----
    let types = ElementBuilder::new("div")?.class("feedback-types").build();
    for (code, key) in FEEDBACK_TYPES {
        let option = ElementBuilder::new("button")?
            .class("type-option")
            .attr("data-type", code)?
            .i18n(key, lang)?
            .build();
        append_child(&types, &option)?;
    }
    append_child(&form, &section("feedback_type", &types, lang)?)?;

    // ---- Contenido ----
    let content = ElementBuilder::new("textarea")?
        .class("form-textarea")
        .attr("maxlength", &limits.max_content_chars.to_string())?
        .attr("rows", "5")?
        .build();
    let counter = ElementBuilder::new("div")?
        .class("char-counter")
        .text(&counter_text(0, limits.max_content_chars))
        .build();
    let content_box = ElementBuilder::new("div")?.child(content.clone())?.child(counter.clone())?.build();
    append_child(&form, &section("feedback_content", &content_box, lang)?)?;

    // ---- Contacto ----
    let contact = ElementBuilder::new("input")?
        .attr("type", "text")?
        .class("form-input")
        .placeholder("feedback_contact_placeholder", lang)?
        .build();
    append_child(&form, &section("feedback_contact", &contact, lang)?)?;

    // ---- Imágenes ----
    let file_input = ElementBuilder::new("input")?
        .attr("type", "file")?
        .attr("accept", "image/*")?
        .attr("multiple", "true")?
        .class("form-file")
        .build();
    let image_list = ElementBuilder::new("div")?.class("image-list").build();
    let images_box = ElementBuilder::new("div")?.child(file_input.clone())?.child(image_list.clone())?.build();
    append_child(&form, &section("feedback_images", &images_box, lang)?)?;

    let submit = ElementBuilder::new("button")?
        .class("btn btn-primary btn-block")
        .i18n("submit", lang)?
        .build();
    append_child(&form, &submit)?;

    // ---- Eventos ----
    for star in children(&stars) {
        let vm = vm.clone();
        let stars = stars.clone();
        let value: u8 = star.get_attribute("data-value").and_then(|v| v.parse().ok()).unwrap_or(0);
        on_click(&star, move |_| {
            vm.set_rating(value);
            paint_rating(&stars, vm.draft().rating);
        })?;
    }
    for option in children(&types) {
        let vm = vm.clone();
        let types = types.clone();
        let code = option.get_attribute("data-type").unwrap_or_default();
        let this = option.clone();
        on_click(&option, move |_| {
            vm.set_type(&code);
            for other in children(&types) {
                let _ = toggle_class(&other, "active", other == this);
            }
        })?;
    }
    {
        let vm = vm.clone();
        let counter = counter.clone();
        on_input(&content, move |value| {
            let len = vm.set_content(&value);
            set_text_content(&counter, &counter_text(len, limits.max_content_chars));
            let _ = toggle_class(&counter, "over-limit", len > limits.max_content_chars);
        })?;
    }
    {
        let vm = vm.clone();
        on_input(&contact, move |value| vm.set_contact(&value))?;
    }

    let paint_images: Rc<dyn Fn()> = {
        let vm = vm.clone();
        let image_list = image_list.clone();
        let state = state.clone();
        Rc::new(move || {
            if let Err(e) = paint_image_list(&image_list, &vm, state.lang()) {
                log::error!("❌ [FEEDBACK] {:?}", e);
            }
        })
    };
    {
        let vm = vm.clone();
        let input = file_input.clone();
        let state = state.clone();
        let paint_images = paint_images.clone();
        on_change(&file_input, move |_| {
            let Some(files) = input.dyn_ref::<HtmlInputElement>().and_then(|i| i.files()) else {
                return;
            };
            for index in 0..files.length() {
                let Some(file) = files.get(index) else { continue };
                let meta = ImageMeta { name: file.name(), mime_type: file.type_(), size: file.size() };
                if let Err(err) = vm.add_image(meta, file) {
                    toast_error(&err.user_message(state.lang()));
                    break;
                }
            }
            // Permite volver a elegir el mismo fichero
            set_input_value(&input, "");
            paint_images();
        })?;
    }

    // ---- Envío ----
    {
        let vm = vm.clone();
        let state = state.clone();
        let submit_btn = submit.clone();
        let (stars, types, content, contact, counter) =
            (stars.clone(), types.clone(), content.clone(), contact.clone(), counter.clone());
        on_click(&submit, move |_| {
            let vm = vm.clone();
            let state = state.clone();
            let submit_btn = submit_btn.clone();
            let paint_images = paint_images.clone();
            let (stars, types, content, contact, counter) =
                (stars.clone(), types.clone(), content.clone(), contact.clone(), counter.clone());
            spawn_local(async move {
                let user_id = state
                    .user()
                    .map(|u| u.student_id)
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(get_or_create_device_id);
                set_disabled(&submit_btn, true);
                set_loading(true);
                let result = vm.submit(Some(user_id)).await;
                set_loading(false);
                set_disabled(&submit_btn, false);

                let lang = state.lang();
                match result {
                    Ok(message) => {
                        toast_success(&message.unwrap_or_else(|| t("feedback_success", lang)));
                        paint_rating(&stars, 0);
                        for option in children(&types) {
                            let _ = toggle_class(&option, "active", false);
                        }
                        set_input_value(&content, "");
                        set_input_value(&contact, "");
                        set_text_content(&counter, &counter_text(0, limits.max_content_chars));
                        paint_images();
                    }
                    Err(err) => toast_error(&err.user_message(lang)),
                }
            });
        })?;
    }

    Ok(page)
}

fn section(key: &str, body: &Element, lang: Language) -> Result<Element, JsValue> {
    let label = ElementBuilder::new("label")?.class("form-label").i18n(key, lang)?.build();
    ElementBuilder::new("div")?
        .class("form-group")
        .child(label)?
        .child(body.clone())
        .map(|b| b.build())
}

fn counter_text(len: usize, max: usize) -> String {
    format!("{}/{}", len, max)
}

fn children(parent: &Element) -> Vec<Element> {
    let list = parent.children();
    (0..list.length()).filter_map(|i| list.item(i)).collect()
}

fn paint_rating(stars: &Element, rating: u8) {
    for (index, star) in children(stars).iter().enumerate() {
        let _ = toggle_class(star, "active", (index as u8) < rating);
    }
}

fn paint_image_list(list: &Element, vm: &Rc<FeedbackVm>, lang: Language) -> Result<(), JsValue> {
    clear_children(list);
    for (index, name) in vm.image_names().into_iter().enumerate() {
        let label = ElementBuilder::new("span")?.class("image-name").text(&name).build();
        let remove = ElementBuilder::new("button")?
            .class("btn-remove")
            .attr("title", &t("cancel", lang))?
            .text("✕")
            .build();
        {
            let vm = vm.clone();
            let list = list.clone();
            on_click(&remove, move |_| {
                vm.remove_image(index);
                if let Err(e) = paint_image_list(&list, &vm, lang) {
                    log::error!("❌ [FEEDBACK] {:?}", e);
                }
            })?;
        }
        let item = ElementBuilder::new("div")?.class("image-item").child(label)?.child(remove)?.build();
        append_child(list, &item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_text() {
        assert_eq!(counter_text(12, 500), "12/500");
    }
}
