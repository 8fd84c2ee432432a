//! Per-stage bookkeeping: leave handlers, cancellers and shared elements.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::context::{Canceller, LeaveHandler, RegisterConfig};
use crate::node::{NodeRef, WeakNodeRef};

/// Identity of a mounted animated element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl ElementId {
    /// Generate a new unique element ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

/// Leave bookkeeping of one route.
#[derive(Default)]
pub struct LeaveRegistration {
    /// Cancels returned by the last round of leave handlers.
    pub cancellers: Vec<Canceller>,
    /// One handler per registered element; re-registering replaces it.
    pub leave_handlers: Vec<(ElementId, LeaveHandler)>,
}

struct SharedEntry {
    element_id: ElementId,
    node: WeakNodeRef,
}

/// `shared key -> route path -> element`.
///
/// Only weak node references are held; the route's mounted subtree owns the
/// nodes.
#[derive(Default)]
pub struct SharedElementRegistry {
    entries: HashMap<String, HashMap<String, SharedEntry>>,
}

impl SharedElementRegistry {
    /// Publish `node` under `key` for `path`.
    ///
    /// An element publishes under at most one key per path, so any entry the
    /// same element holds under another key for this path is dropped.
    pub fn publish(&mut self, key: &str, path: &str, element_id: ElementId, node: &NodeRef) {
        self.entries.retain(|other, by_path| {
            if other != key
                && by_path
                    .get(path)
                    .is_some_and(|entry| entry.element_id == element_id)
            {
                by_path.remove(path);
            }
            !by_path.is_empty()
        });

        self.entries.entry(key.to_string()).or_default().insert(
            path.to_string(),
            SharedEntry {
                element_id,
                node: Rc::downgrade(node),
            },
        );
    }

    /// Live node registered under `key` for `path`.
    pub fn get(&self, key: &str, path: &str) -> Option<NodeRef> {
        self.entries.get(key)?.get(path)?.node.upgrade()
    }

    pub fn contains(&self, key: &str, path: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|by_path| by_path.contains_key(path))
    }

    /// Drop every entry for `path`, removing keys left empty.
    pub fn remove_route(&mut self, path: &str) {
        self.entries.retain(|_, by_path| {
            by_path.remove(path);
            !by_path.is_empty()
        });
    }

    /// Keys with at least one registered element.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Everything one `Group` shares with the elements mounted under it.
#[derive(Default)]
pub struct StageState {
    leaves: HashMap<String, LeaveRegistration>,
    pub shared: SharedElementRegistry,
}

impl StageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an element's leave handler and publish it as a shared element.
    pub fn register(&mut self, route: &str, config: RegisterConfig) {
        let RegisterConfig {
            shared_key,
            element,
            element_id,
            leave_handler,
        } = config;

        let handlers = &mut self.leaves.entry(route.to_string()).or_default().leave_handlers;
        match handlers.iter_mut().find(|(id, _)| *id == element_id) {
            Some(slot) => slot.1 = leave_handler,
            None => handlers.push((element_id, leave_handler)),
        }

        if let (Some(key), Some(node)) = (shared_key, element) {
            self.shared.publish(&key, route, element_id, &node);
        }
    }

    /// Take the route's leave handlers, leaving the list empty.
    pub fn take_leave_handlers(&mut self, route: &str) -> Vec<LeaveHandler> {
        self.leaves
            .get_mut(route)
            .map(|reg| reg.leave_handlers.drain(..).map(|(_, handler)| handler).collect())
            .unwrap_or_default()
    }

    pub fn push_cancellers(&mut self, route: &str, cancellers: Vec<Canceller>) {
        self.leaves
            .entry(route.to_string())
            .or_default()
            .cancellers
            .extend(cancellers);
    }

    /// Take the route's cancellers, leaving the list empty.
    pub fn take_cancellers(&mut self, route: &str) -> Vec<Canceller> {
        self.leaves
            .get_mut(route)
            .map(|reg| std::mem::take(&mut reg.cancellers))
            .unwrap_or_default()
    }

    pub fn has_leave_handlers(&self, route: &str) -> bool {
        self.leaves
            .get(route)
            .is_some_and(|reg| !reg.leave_handlers.is_empty())
    }

    pub fn has_cancellers(&self, route: &str) -> bool {
        self.leaves
            .get(route)
            .is_some_and(|reg| !reg.cancellers.is_empty())
    }

    pub fn leave_handler_count(&self, route: &str) -> usize {
        self.leaves.get(route).map_or(0, |reg| reg.leave_handlers.len())
    }

    pub fn shared_element(&self, key: &str, path: &str) -> Option<NodeRef> {
        self.shared.get(key, path)
    }

    /// Drop all bookkeeping for a destroyed route.
    pub fn forget_route(&mut self, route: &str) {
        self.leaves.remove(route);
        self.shared.remove_route(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{LeaveCompletion, LeaveTicket, PathTransition};
    use crate::node::MemoryNode;

    fn ticket_handler() -> LeaveHandler {
        Rc::new(|_: &PathTransition| {
            LeaveTicket::new(LeaveCompletion::resolved(), Rc::new(|_: &PathTransition| {}))
        })
    }

    fn config(key: Option<&str>, node: &NodeRef, element_id: ElementId) -> RegisterConfig {
        RegisterConfig {
            shared_key: key.map(String::from),
            element: Some(node.clone()),
            element_id,
            leave_handler: ticket_handler(),
        }
    }

    #[test]
    fn test_register_publishes_and_records_handler() {
        let node = MemoryNode::new("card").into_ref();
        let mut state = StageState::new();
        state.register("one", config(Some("card"), &node, ElementId::new()));

        assert!(state.has_leave_handlers("one"));
        assert!(state.shared_element("card", "one").is_some());
        assert!(state.shared_element("card", "two").is_none());
    }

    #[test]
    fn test_reregistering_same_element_overwrites() {
        let node = MemoryNode::new("card").into_ref();
        let id = ElementId::new();
        let mut state = StageState::new();
        state.register("one", config(Some("a"), &node, id));
        state.register("one", config(Some("b"), &node, id));

        assert_eq!(state.leave_handler_count("one"), 1);
        assert!(!state.shared.contains("a", "one"));
        assert!(state.shared.contains("b", "one"));
        assert_eq!(state.shared.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_take_clears_lists() {
        let node = MemoryNode::new("n").into_ref();
        let mut state = StageState::new();
        state.register("one", config(None, &node, ElementId::new()));

        assert_eq!(state.take_leave_handlers("one").len(), 1);
        assert!(!state.has_leave_handlers("one"));

        let cancel: Canceller = Rc::new(|_: &PathTransition| {});
        state.push_cancellers("one", vec![cancel]);
        assert!(state.has_cancellers("one"));
        assert_eq!(state.take_cancellers("one").len(), 1);
        assert!(!state.has_cancellers("one"));
    }

    #[test]
    fn test_forget_route_drops_shared_entries() {
        let a = MemoryNode::new("a").into_ref();
        let b = MemoryNode::new("b").into_ref();
        let mut state = StageState::new();
        state.register("one", config(Some("hero"), &a, ElementId::new()));
        state.register("two", config(Some("hero"), &b, ElementId::new()));

        state.forget_route("one");
        assert!(!state.shared.contains("hero", "one"));
        assert!(state.shared.contains("hero", "two"));

        state.forget_route("two");
        assert_eq!(state.shared.keys().count(), 0);
    }

    #[test]
    fn test_dropped_node_is_not_returned() {
        let mut state = StageState::new();
        {
            let node = MemoryNode::new("gone").into_ref();
            state.register("one", config(Some("hero"), &node, ElementId::new()));
        }
        assert!(state.shared_element("hero", "one").is_none());
    }
}
