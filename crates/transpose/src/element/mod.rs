//! Animated elements.
//!
//! An [`AnimatedElement`] binds one rendered node to a [`TransitionBehavior`]
//! and drives it through its lifecycle:
//!
//! ```text
//!   mount ──> Entering ──complete──> Idle
//!                │                    │
//!              leave                leave
//!                ▼                    ▼
//!             Leaving ──complete──> (route torn down)
//!                │
//!             cancel
//!                ▼
//!            ReEntering ──complete──> Idle
//! ```
//!
//! At most one action runs per element; starting one stops the previous one.
//! The element registers a leave handler with its route when mounted and
//! again when re-entering, since the coordinator clears handlers once they
//! have been invoked.

mod shared;
mod transposed;

pub use shared::{SharedKey, TransposedShared};
pub use transposed::Transposed;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::Props;
use crate::context::{
    Canceller, LeaveCompletion, LeaveHandler, LeaveSignal, LeaveTicket, PathTransition,
    RegisterConfig, TransitionContext,
};
use crate::engine::{ActionHandle, ActionObserver, ActionRequest};
use crate::error::{Result, TransitionError};
use crate::node::NodeRef;
use crate::registry::ElementId;
use crate::style::{HIDDEN, Style, VISIBILITY};

/// Lifecycle phase of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementPhase {
    #[default]
    Idle,
    Entering,
    Leaving,
    ReEntering,
}

/// The element's own node and, when it has a shared counterpart on the
/// route it is coming from, that route's node.
#[derive(Clone)]
pub struct SharedElements {
    pub from: Option<NodeRef>,
    pub to: NodeRef,
}

/// Resting styles keyed by the path they were computed for.
pub type StyleCache = HashMap<String, Style>;

/// Inputs of one enter, exit or re-enter decision.
pub struct TransitionArgs<'a> {
    pub context: &'a TransitionContext,
    pub path: &'a PathTransition,
    pub elements: &'a SharedElements,
    pub props: &'a Props,
    pub cache: &'a mut StyleCache,
    /// Set on exit when an enter or re-enter action was interrupted.
    pub was_entering: bool,
}

/// Decides which action an element runs at each lifecycle step.
///
/// Initial styles must be applied to `elements.to` synchronously before the
/// request is returned; the engine only animates from there.
pub trait TransitionBehavior {
    /// Key under which the element is published as a shared element.
    fn shared_key(&self, _props: &Props) -> Option<String> {
        None
    }

    /// Action to run when mounted. `None` leaves the node as it is, with
    /// visibility restored.
    fn enter(&self, args: TransitionArgs<'_>) -> Option<ActionRequest>;

    /// Action to run when the route leaves. `None` hides the node and
    /// completes the leave immediately.
    fn exit(&self, args: TransitionArgs<'_>) -> Option<ActionRequest>;

    /// Action to run when a leave is cancelled.
    fn re_enter(&self, _args: TransitionArgs<'_>) -> Option<ActionRequest> {
        None
    }
}

struct ElementInner {
    id: ElementId,
    label: String,
    ctx: TransitionContext,
    node: NodeRef,
    behavior: Rc<dyn TransitionBehavior>,
    props: Props,
    phase: ElementPhase,
    action: Option<ActionHandle>,
    /// Bumped every time the running action is replaced; completions of
    /// older actions are ignored.
    generation: u64,
    cache: StyleCache,
    leave_cycle: u64,
    /// Leave cycle whose canceller has not run yet.
    awaiting_reentry: Option<u64>,
}

impl ElementInner {
    fn stop_action(&mut self) -> bool {
        self.generation += 1;
        self.phase = ElementPhase::Idle;
        match self.action.take() {
            Some(mut action) => {
                action.stop();
                true
            }
            None => false,
        }
    }

    fn shared_elements(&self, path: &PathTransition) -> SharedElements {
        let from = self
            .behavior
            .shared_key(&self.props)
            .zip(path.from.as_deref())
            .and_then(|(key, from)| self.ctx.shared_element(&key, from));

        SharedElements {
            from,
            to: self.node.clone(),
        }
    }
}

impl Drop for ElementInner {
    fn drop(&mut self) {
        if let Some(mut action) = self.action.take() {
            action.stop();
        }
    }
}

/// A node animated by a [`TransitionBehavior`] under one route.
pub struct AnimatedElement {
    inner: Rc<RefCell<ElementInner>>,
}

impl AnimatedElement {
    /// Register the element with its route and run its enter step.
    ///
    /// Fails with [`TransitionError::MissingRef`] before registering when no
    /// node handle is given.
    pub fn mount(
        ctx: &TransitionContext,
        label: &str,
        node: Option<NodeRef>,
        behavior: Rc<dyn TransitionBehavior>,
        props: Props,
    ) -> Result<Self> {
        let node = node.ok_or_else(|| TransitionError::MissingRef {
            route: ctx.route().to_string(),
            element: label.to_string(),
        })?;

        let inner = Rc::new(RefCell::new(ElementInner {
            id: ElementId::new(),
            label: label.to_string(),
            ctx: ctx.clone(),
            node,
            behavior,
            props,
            phase: ElementPhase::Idle,
            action: None,
            generation: 0,
            cache: StyleCache::new(),
            leave_cycle: 0,
            awaiting_reentry: None,
        }));

        register(&inner);
        enter(&inner);
        Ok(Self { inner })
    }

    pub fn id(&self) -> ElementId {
        self.inner.borrow().id
    }

    pub fn label(&self) -> String {
        self.inner.borrow().label.clone()
    }

    pub fn phase(&self) -> ElementPhase {
        self.inner.borrow().phase
    }

    pub fn node(&self) -> NodeRef {
        self.inner.borrow().node.clone()
    }

    /// Whether an action is currently running.
    pub fn is_animating(&self) -> bool {
        self.inner.borrow().action.is_some()
    }

    /// Resting style cached for `path`, if any.
    pub fn cached_style(&self, path: &str) -> Option<Style> {
        self.inner.borrow().cache.get(path).cloned()
    }
}

impl fmt::Debug for AnimatedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("AnimatedElement")
            .field("id", &inner.id)
            .field("label", &inner.label)
            .field("route", &inner.ctx.route())
            .field("phase", &inner.phase)
            .finish()
    }
}

fn register(inner: &Rc<RefCell<ElementInner>>) {
    let weak = Rc::downgrade(inner);
    let leave_handler: LeaveHandler = Rc::new(move |path: &PathTransition| match weak.upgrade() {
        Some(inner) => leave(&inner, path),
        None => LeaveTicket::new(LeaveCompletion::resolved(), Rc::new(|_: &PathTransition| {})),
    });

    let (ctx, config) = {
        let el = inner.borrow();
        let shared_key = el.behavior.shared_key(&el.props);
        let element = shared_key.as_ref().map(|_| el.node.clone());
        let config = RegisterConfig {
            shared_key,
            element,
            element_id: el.id,
            leave_handler,
        };
        (el.ctx.clone(), config)
    };
    ctx.register(config);
}

fn enter(inner: &Rc<RefCell<ElementInner>>) {
    let (request, node) = {
        let mut guard = inner.borrow_mut();
        let el = &mut *guard;
        let path = el.ctx.path();
        let elements = el.shared_elements(&path);
        let request = el.behavior.enter(TransitionArgs {
            context: &el.ctx,
            path: &path,
            elements: &elements,
            props: &el.props,
            cache: &mut el.cache,
            was_entering: false,
        });
        (request, el.node.clone())
    };

    match request {
        Some(request) => start(inner, ElementPhase::Entering, request, None),
        None => node.remove(VISIBILITY),
    }
}

fn leave(inner: &Rc<RefCell<ElementInner>>, path: &PathTransition) -> LeaveTicket {
    let (request, node, cycle) = {
        let mut guard = inner.borrow_mut();
        let el = &mut *guard;
        let entering = matches!(el.phase, ElementPhase::Entering | ElementPhase::ReEntering);
        let was_entering = el.stop_action() && entering;

        el.leave_cycle += 1;
        el.awaiting_reentry = Some(el.leave_cycle);

        let elements = el.shared_elements(path);
        let request = el.behavior.exit(TransitionArgs {
            context: &el.ctx,
            path,
            elements: &elements,
            props: &el.props,
            cache: &mut el.cache,
            was_entering,
        });
        trace!(element = %el.label, route = %el.ctx.route(), was_entering, "element leaving");
        (request, el.node.clone(), el.leave_cycle)
    };

    let weak: Weak<RefCell<ElementInner>> = Rc::downgrade(inner);
    let cancel: Canceller = Rc::new(move |path: &PathTransition| {
        if let Some(inner) = weak.upgrade() {
            cancel_leave(&inner, cycle, path);
        }
    });

    match request {
        Some(request) => {
            let (signal, completion) = LeaveCompletion::channel();
            start(inner, ElementPhase::Leaving, request, Some(signal));
            LeaveTicket::new(completion, cancel)
        }
        None => {
            node.apply(&Style::new().with(VISIBILITY, HIDDEN));
            LeaveTicket::new(LeaveCompletion::resolved(), cancel)
        }
    }
}

fn cancel_leave(inner: &Rc<RefCell<ElementInner>>, cycle: u64, path: &PathTransition) {
    {
        let mut el = inner.borrow_mut();
        if el.awaiting_reentry != Some(cycle) {
            return;
        }
        el.awaiting_reentry = None;
    }
    re_enter(inner, path);
}

fn re_enter(inner: &Rc<RefCell<ElementInner>>, path: &PathTransition) {
    register(inner);

    let request = {
        let mut guard = inner.borrow_mut();
        let el = &mut *guard;
        // Dropping the leave action drops its signal, which resolves the
        // pending completion.
        el.stop_action();
        el.node.remove(VISIBILITY);

        let elements = el.shared_elements(path);
        trace!(element = %el.label, route = %el.ctx.route(), "element re-entering");
        el.behavior.re_enter(TransitionArgs {
            context: &el.ctx,
            path,
            elements: &elements,
            props: &el.props,
            cache: &mut el.cache,
            was_entering: false,
        })
    };

    if let Some(request) = request {
        start(inner, ElementPhase::ReEntering, request, None);
    }
}

fn start(
    inner: &Rc<RefCell<ElementInner>>,
    phase: ElementPhase,
    request: ActionRequest,
    signal: Option<LeaveSignal>,
) {
    let (engine, node, generation) = {
        let mut el = inner.borrow_mut();
        el.stop_action();
        el.phase = phase;
        trace!(element = %el.label, route = %el.ctx.route(), ?phase, "element action started");
        (el.ctx.engine().clone(), el.node.clone(), el.generation)
    };

    let weak = Rc::downgrade(inner);
    let observer = ActionObserver::new(
        move |style: &Style| node.apply(style),
        move || {
            if let Some(inner) = weak.upgrade() {
                let mut el = inner.borrow_mut();
                if el.generation == generation {
                    el.action = None;
                    el.phase = ElementPhase::Idle;
                    trace!(element = %el.label, route = %el.ctx.route(), ?phase, "element action finished");
                }
            }
            if let Some(signal) = signal {
                signal.resolve();
            }
        },
    );

    let handle = engine.start(request, observer);

    let mut el = inner.borrow_mut();
    if el.generation == generation && el.phase == phase {
        el.action = Some(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AnimationEngine, EngineRef, FrameEngine, TransitionDefinition};
    use crate::group::RouteLifecycle;
    use crate::node::{MemoryNode, StyleTarget};
    use crate::registry::StageState;
    use futures::FutureExt;
    use std::cell::Cell;

    struct Fade;

    impl TransitionBehavior for Fade {
        fn enter(&self, args: TransitionArgs<'_>) -> Option<ActionRequest> {
            args.elements.to.apply(&Style::new().with("opacity", 0.0));
            Some(ActionRequest::new(
                Style::new().with("opacity", 0.0),
                Style::new().with("opacity", 1.0),
                TransitionDefinition::tween().with_duration(100.0),
            ))
        }

        fn exit(&self, args: TransitionArgs<'_>) -> Option<ActionRequest> {
            let delay = if args.was_entering { 0.0 } else { 50.0 };
            Some(ActionRequest::new(
                Style::new().with("opacity", 1.0),
                Style::new().with("opacity", 0.0),
                TransitionDefinition::tween().with_duration(100.0).with_delay(delay),
            ))
        }
    }

    struct Static;

    impl TransitionBehavior for Static {
        fn enter(&self, _args: TransitionArgs<'_>) -> Option<ActionRequest> {
            None
        }

        fn exit(&self, _args: TransitionArgs<'_>) -> Option<ActionRequest> {
            None
        }
    }

    fn context(engine: EngineRef, state: &Rc<RefCell<StageState>>) -> TransitionContext {
        TransitionContext {
            is_first: false,
            animate_first: false,
            path: Rc::new(RefCell::new(PathTransition::new(Some("a"), Some("b")))),
            route: "b".to_string(),
            lifecycle: Rc::new(Cell::new(RouteLifecycle::Entering)),
            state: state.clone(),
            engine,
            stage_setter: None,
        }
    }

    fn leave_now(state: &Rc<RefCell<StageState>>) -> Vec<LeaveTicket> {
        let handlers = state.borrow_mut().take_leave_handlers("b");
        let path = PathTransition::new(Some("b"), Some("c"));
        handlers.iter().map(|handler| handler(&path)).collect()
    }

    #[test]
    fn test_missing_node_fails_before_registering() {
        let engine: EngineRef = Rc::new(FrameEngine::new());
        let state = Rc::new(RefCell::new(StageState::new()));
        let ctx = context(engine, &state);

        let err = AnimatedElement::mount(&ctx, "card", None, Rc::new(Fade), Props::Null).unwrap_err();
        assert_eq!(
            err,
            TransitionError::MissingRef {
                route: "b".into(),
                element: "card".into()
            }
        );
        assert!(!state.borrow().has_leave_handlers("b"));
    }

    #[test]
    fn test_mount_registers_and_enters() {
        let engine = Rc::new(FrameEngine::new());
        let state = Rc::new(RefCell::new(StageState::new()));
        let ctx = context(engine.clone(), &state);
        let node = Rc::new(MemoryNode::new("card"));

        let element = AnimatedElement::mount(&ctx, "card", Some(node.clone()), Rc::new(Fade), Props::Null).unwrap();
        assert!(state.borrow().has_leave_handlers("b"));
        assert_eq!(element.phase(), ElementPhase::Entering);
        assert_eq!(node.read("opacity").and_then(|v| v.as_number()), Some(0.0));

        engine.advance(200.0);
        assert_eq!(element.phase(), ElementPhase::Idle);
        assert!(!element.is_animating());
        assert_eq!(node.read("opacity").map(|v| v.to_string()), Some("1".to_string()));
    }

    #[test]
    fn test_leave_while_entering_skips_delay() {
        let engine = Rc::new(FrameEngine::new());
        let state = Rc::new(RefCell::new(StageState::new()));
        let ctx = context(engine.clone(), &state);
        let node = Rc::new(MemoryNode::new("card"));
        let element = AnimatedElement::mount(&ctx, "card", Some(node.clone()), Rc::new(Fade), Props::Null).unwrap();

        engine.tick(16.0);
        let mut tickets = leave_now(&state);
        assert_eq!(element.phase(), ElementPhase::Leaving);

        // Without the 50ms exit delay the fade starts on the first frame.
        engine.tick(16.0);
        let opacity = node.read("opacity").and_then(|v| v.as_number()).unwrap_or(1.0);
        assert!(opacity < 1.0);

        engine.advance(100.0);
        let ticket = tickets.remove(0);
        assert!(ticket.completion.now_or_never().is_some());
        assert_eq!(node.read("opacity").map(|v| v.to_string()), Some("0".to_string()));
    }

    #[test]
    fn test_leave_without_exit_hides_and_resolves() {
        let engine: EngineRef = Rc::new(FrameEngine::new());
        let state = Rc::new(RefCell::new(StageState::new()));
        let ctx = context(engine, &state);
        let node = Rc::new(MemoryNode::new("plain"));
        let _element = AnimatedElement::mount(&ctx, "plain", Some(node.clone()), Rc::new(Static), Props::Null).unwrap();

        let mut tickets = leave_now(&state);
        let ticket = tickets.remove(0);
        assert_eq!(node.read(VISIBILITY), Some(HIDDEN.into()));
        assert!(ticket.completion.now_or_never().is_some());

        (ticket.cancel)(&PathTransition::new(Some("c"), Some("b")));
        assert_eq!(node.read(VISIBILITY), None);
        assert!(state.borrow().has_leave_handlers("b"));
    }

    #[test]
    fn test_cancel_is_idempotent_and_resolves_completion() {
        let engine = Rc::new(FrameEngine::new());
        let state = Rc::new(RefCell::new(StageState::new()));
        let ctx = context(engine.clone(), &state);
        let node = Rc::new(MemoryNode::new("card"));
        let element = AnimatedElement::mount(&ctx, "card", Some(node.clone()), Rc::new(Fade), Props::Null).unwrap();
        engine.advance(200.0);

        let mut tickets = leave_now(&state);
        let ticket = tickets.remove(0);
        let back = PathTransition::new(Some("c"), Some("b"));
        (ticket.cancel)(&back);
        (ticket.cancel)(&back);

        assert!(ticket.completion.now_or_never().is_some());
        assert_eq!(state.borrow().leave_handler_count("b"), 1);
        assert_eq!(element.phase(), ElementPhase::Idle);
        assert_eq!(engine.active_count(), 0);
    }

    #[test]
    fn test_dropping_element_stops_its_action() {
        let engine = Rc::new(FrameEngine::new());
        let state = Rc::new(RefCell::new(StageState::new()));
        let ctx = context(engine.clone(), &state);
        let node = Rc::new(MemoryNode::new("card"));
        let element = AnimatedElement::mount(&ctx, "card", Some(node), Rc::new(Fade), Props::Null).unwrap();

        assert_eq!(engine.active_count(), 1);
        drop(element);
        assert_eq!(engine.active_count(), 0);
    }

    #[test]
    fn test_engine_trait_object_usable() {
        let engine: Rc<dyn AnimationEngine> = Rc::new(FrameEngine::snapping(10.0));
        let state = Rc::new(RefCell::new(StageState::new()));
        let ctx = context(engine, &state);
        let node = Rc::new(MemoryNode::new("card"));
        let _element = AnimatedElement::mount(&ctx, "card", Some(node.clone()), Rc::new(Fade), Props::Null).unwrap();

        assert_eq!(node.read("opacity").map(|v| v.to_string()), Some("1".to_string()));
    }
}
