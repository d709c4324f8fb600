//! Shared admin state.

use std::sync::{Arc, RwLock};

use lsptap_core::{Registry, Terminator};
use lsptap_protocol::MessageStore;
use lsptap_trace::MessageLog;

/// The last send-form selection, remembered across page loads.
#[derive(Debug, Default, Clone)]
pub struct LastSelection {
    pub target: String,
    pub message: String,
}

/// Cloneable state shared by every admin route.
#[derive(Clone)]
pub struct AdminState {
    pub registry: Registry,
    pub trace: Arc<MessageLog>,
    pub store: Arc<MessageStore>,
    pub terminator: Terminator,
    last: Arc<RwLock<LastSelection>>,
}

impl AdminState {
    pub fn new(
        registry: Registry,
        trace: Arc<MessageLog>,
        store: Arc<MessageStore>,
        terminator: Terminator,
    ) -> Self {
        Self {
            registry,
            trace,
            store,
            terminator,
            last: Arc::new(RwLock::new(LastSelection::default())),
        }
    }

    pub fn last(&self) -> LastSelection {
        self.last.read().unwrap().clone()
    }

    pub fn remember_target(&self, target: &str) {
        self.last.write().unwrap().target = target.to_string();
    }

    pub fn remember_message(&self, message: &str) {
        self.last.write().unwrap().message = message.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsptap_trace::TraceOptions;

    fn state() -> AdminState {
        AdminState::new(
            Registry::new(),
            Arc::new(MessageLog::new(TraceOptions::default()).unwrap()),
            Arc::new(MessageStore::empty()),
            Terminator::new(),
        )
    }

    #[test]
    fn last_selection_starts_empty() {
        let state = state();
        let last = state.last();
        assert!(last.target.is_empty());
        assert!(last.message.is_empty());
    }

    #[test]
    fn selections_are_remembered() {
        let state = state();
        state.remember_target("server");
        state.remember_message("hover.json");

        let last = state.last();
        assert_eq!(last.target, "server");
        assert_eq!(last.message, "hover.json");
    }

    #[test]
    fn clones_share_the_selection() {
        let state = state();
        let cloned = state.clone();
        state.remember_target("client-1");
        assert_eq!(cloned.last().target, "client-1");
    }

    #[test]
    fn main_page_lists_formats_and_exit_link() {
        let state = state();
        let page = crate::page::render(&state, &["sent".to_string()], &["broken".to_string()]);
        assert!(page.contains("lsptap"));
        assert!(page.contains("sent"));
        assert!(page.contains("broken"));
        assert!(page.contains("keyword"));
        assert!(page.contains("/exit"));
    }
}
