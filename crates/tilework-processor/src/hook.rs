//! Global observers notified about instance spawns and deaths.

use crate::state::ProcessorState;

/// A session-wide listener for instance lifecycle events.
///
/// Hooks fire synchronously, in registration order. `on_kill` fires
/// after the instance's own `on_kill` hook and before it leaves the
/// position index, so `state` still shows the live placement.
pub trait GlobalHook: Send + 'static {
    /// An instance finished its spawn hooks.
    fn on_spawn(&mut self, state: &ProcessorState) {
        let _ = state;
    }

    /// An instance is being killed.
    fn on_kill(&mut self, state: &ProcessorState) {
        let _ = state;
    }
}

/// Ordered list of [`GlobalHook`]s.
#[derive(Default)]
pub struct GlobalHooks {
    hooks: Vec<Box<dyn GlobalHook>>,
}

impl GlobalHooks {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; it fires after every hook already registered.
    pub fn register(&mut self, hook: Box<dyn GlobalHook>) {
        self.hooks.push(hook);
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Fire `on_spawn` on every hook in order.
    pub fn fire_spawn(&mut self, state: &ProcessorState) {
        for hook in &mut self.hooks {
            hook.on_spawn(state);
        }
    }

    /// Fire `on_kill` on every hook in order.
    pub fn fire_kill(&mut self, state: &ProcessorState) {
        for hook in &mut self.hooks {
            hook.on_kill(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tilework_core::{ProcessorTypeId, SlotId};

    struct Tagged(&'static str, Arc<Mutex<Vec<&'static str>>>);

    impl GlobalHook for Tagged {
        fn on_kill(&mut self, _state: &ProcessorState) {
            self.1.lock().unwrap().push(self.0);
        }
    }

    #[test]
    fn fires_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = GlobalHooks::new();
        hooks.register(Box::new(Tagged("first", log.clone())));
        hooks.register(Box::new(Tagged("second", log.clone())));
        let state = ProcessorState::new(ProcessorTypeId(0), SlotId(0));
        hooks.fire_spawn(&state);
        hooks.fire_kill(&state);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }
}
