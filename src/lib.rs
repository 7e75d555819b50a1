// ============================================================================
// CAMPUS ATTENDANCE PWA - FRONTEND MVVM (RUST + WASM)
// ============================================================================
// - Views: funciones que construyen DOM (sin lógica)
// - ViewModels: estado de página + reglas
// - Services: API, bridge WeChat/WeCom, cámara
// - State: Rc<RefCell> con suscripciones
// - Models: estructuras compartidas con el backend
// ============================================================================

mod app;
mod config;
mod dom;
mod errors;
mod models;
mod services;
mod state;
mod utils;
mod viewmodels;
mod views;

use std::cell::RefCell;

use wasm_bindgen::prelude::*;
use wasm_logger::Config;

use crate::app::App;
use crate::config::CONFIG;

// La app vive lo que vive la página
thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let level = if CONFIG.is_logging_enabled() { log::Level::Debug } else { log::Level::Warn };
    wasm_logger::init(Config::new(level));
    log::info!("🚀 Campus Attendance - Rust + MVVM");

    let app = App::new()?;
    app.render()?;
    APP.with(|cell| *cell.borrow_mut() = Some(app));
    Ok(())
}
