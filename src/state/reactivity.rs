// ============================================================================
// REACTIVITY - Valor observable con suscriptores compartidos
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

type Callback<T> = Rc<dyn Fn(&T)>;

/// Estado reactivo: los clones comparten valor Y suscriptores
pub struct ReactiveState<T> {
    value: Rc<RefCell<T>>,
    subscribers: Rc<RefCell<Vec<Callback<T>>>>,
}

impl<T: Clone> ReactiveState<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Rc::new(RefCell::new(value)),
            subscribers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Copia del valor actual
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Establecer nuevo valor y notificar subscribers
    pub fn set(&self, new_value: T) {
        *self.value.borrow_mut() = new_value;
        self.notify();
    }

    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&T) + 'static,
    {
        self.subscribers.borrow_mut().push(Rc::new(callback));
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    // Sin préstamos vivos durante los callbacks: pueden volver a llamar a set()
    fn notify(&self) {
        let value = self.get();
        let callbacks: Vec<Callback<T>> = self.subscribers.borrow().clone();
        for callback in callbacks {
            callback(&value);
        }
    }
}

impl<T> Clone for ReactiveState<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            subscribers: self.subscribers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_clones_share_subscribers() {
        let state = ReactiveState::new(1u32);
        let seen = Rc::new(Cell::new(0u32));
        {
            let seen = seen.clone();
            state.subscribe(move |v| seen.set(*v));
        }
        let other = state.clone();
        other.set(5);
        assert_eq!(seen.get(), 5);
        assert_eq!(state.get(), 5);
        assert_eq!(state.subscriber_count(), 1);
    }

    #[test]
    fn test_subscriber_may_read_state() {
        let state = ReactiveState::new(String::from("zh"));
        let observed = Rc::new(RefCell::new(String::new()));
        {
            let observed = observed.clone();
            let handle = state.clone();
            state.subscribe(move |_| *observed.borrow_mut() = handle.get());
        }
        state.set(String::from("zh-x"));
        assert_eq!(*observed.borrow(), "zh-x");
    }
}
