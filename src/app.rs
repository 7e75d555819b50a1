// ============================================================================
// APP - Punto de montaje: una página HTML por vista
// ============================================================================
// Cada HTML declara `<body data-page="...">` y un `#app` vacío; aquí se elige
// la vista correspondiente y se monta una sola vez.
// ============================================================================

use wasm_bindgen::prelude::*;
use web_sys::Element;

use crate::dom::{append_child, clear_children, document, get_element_by_id};
use crate::state::AppState;
use crate::views::common::apply_translations;
use crate::views::{
    render_feedback, render_material, render_material_stats, render_records, render_signin, render_statistics,
};

/// Páginas conocidas
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    SignIn,
    Statistics,
    Records,
    Feedback,
    Material,
    MaterialStats,
}

impl Page {
    /// Sin `data-page` (o desconocido) se abre la firma
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "statistics" => Page::Statistics,
            "records" => Page::Records,
            "feedback" => Page::Feedback,
            "material" => Page::Material,
            "material-stats" => Page::MaterialStats,
            _ => Page::SignIn,
        }
    }

    fn render(self, state: &AppState) -> Result<Element, JsValue> {
        match self {
            Page::SignIn => render_signin(state),
            Page::Statistics => render_statistics(state),
            Page::Records => render_records(state),
            Page::Feedback => render_feedback(state),
            Page::Material => render_material(state),
            Page::MaterialStats => render_material_stats(state),
        }
    }
}

/// Aplicación principal
pub struct App {
    state: AppState,
    root: Element,
    page: Page,
}

impl App {
    pub fn new() -> Result<Self, JsValue> {
        let root = get_element_by_id("app").ok_or_else(|| JsValue::from_str("No #app element found"))?;
        let page = document()
            .and_then(|d| d.body())
            .and_then(|body| body.get_attribute("data-page"))
            .map(|code| Page::from_code(&code))
            .unwrap_or(Page::SignIn);
        Ok(Self { state: AppState::new(), root, page })
    }

    pub fn render(&self) -> Result<(), JsValue> {
        log::info!("🎬 [APP] Montando {:?}", self.page);
        clear_children(&self.root);
        let view = self.page.render(&self.state)?;
        append_child(&self.root, &view)?;
        // Textos estáticos del HTML (data-zh / data-en) fuera de la vista
        apply_translations(self.state.lang());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_from_code() {
        assert_eq!(Page::from_code("records"), Page::Records);
        assert_eq!(Page::from_code("material-stats"), Page::MaterialStats);
        assert_eq!(Page::from_code(" statistics "), Page::Statistics);
        assert_eq!(Page::from_code("unknown"), Page::SignIn);
    }
}
