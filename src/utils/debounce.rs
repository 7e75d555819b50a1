// ============================================================================
// DEBOUNCE - Retrasa una acción hasta que el usuario deja de teclear
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;

#[derive(Clone)]
pub struct Debouncer {
    delay_ms: u32,
    pending: Rc<RefCell<Option<Timeout>>>,
}

impl Debouncer {
    pub fn new(delay_ms: u32) -> Self {
        Self { delay_ms, pending: Rc::new(RefCell::new(None)) }
    }

    /// Programa `action`; la anterior pendiente se cancela
    pub fn schedule<F: FnOnce() + 'static>(&self, action: F) {
        let timeout = Timeout::new(self.delay_ms, action);
        // Soltar el Timeout anterior lo cancela
        self.pending.borrow_mut().replace(timeout);
    }
}
