//! Route-scoped context handed to animated elements.
//!
//! Every route mounted by a [`Group`](crate::group::Group) gets its own
//! [`TransitionContext`]. Elements use it to register their leave handler
//! (and optionally publish themselves as a shared element), to look up a
//! shared counterpart on another route, and to reach the animation engine.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::EngineRef;
use crate::error::{Result, TransitionError};
use crate::group::RouteLifecycle;
use crate::node::NodeRef;
use crate::registry::{ElementId, StageState};
use crate::switch::StageSetter;

/// Route change snapshot: where the stage came from and where it is going.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathTransition {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl PathTransition {
    pub fn new(from: Option<&str>, to: Option<&str>) -> Self {
        Self {
            from: from.map(String::from),
            to: to.map(String::from),
        }
    }
}

/// Sending half of a leave completion.
#[derive(Debug)]
pub struct LeaveSignal(oneshot::Sender<()>);

impl LeaveSignal {
    /// Mark the leave as finished.
    pub fn resolve(self) {
        // The receiver is gone once the route was torn down or re-entered.
        let _ = self.0.send(());
    }
}

/// Resolves when an element has finished leaving.
///
/// A completion whose signal is dropped without being resolved (the leave
/// was cancelled) resolves as well.
#[derive(Debug)]
pub struct LeaveCompletion(oneshot::Receiver<()>);

impl LeaveCompletion {
    pub fn channel() -> (LeaveSignal, LeaveCompletion) {
        let (tx, rx) = oneshot::channel();
        (LeaveSignal(tx), LeaveCompletion(rx))
    }

    /// Completion that is already resolved.
    pub fn resolved() -> Self {
        let (signal, completion) = Self::channel();
        signal.resolve();
        completion
    }
}

impl Future for LeaveCompletion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.0).poll(cx).map(|_| ())
    }
}

/// Cancels an in-flight leave and re-enters the element.
pub type Canceller = Rc<dyn Fn(&PathTransition)>;

/// Starts an element's leave for the given route change.
pub type LeaveHandler = Rc<dyn Fn(&PathTransition) -> LeaveTicket>;

/// What a leave handler hands back to the coordinator.
pub struct LeaveTicket {
    pub completion: LeaveCompletion,
    pub cancel: Canceller,
}

impl LeaveTicket {
    pub fn new(completion: LeaveCompletion, cancel: Canceller) -> Self {
        Self { completion, cancel }
    }
}

impl fmt::Debug for LeaveTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaveTicket")
            .field("completion", &self.completion)
            .finish_non_exhaustive()
    }
}

/// Registration of one element with its route.
pub struct RegisterConfig {
    pub shared_key: Option<String>,
    pub element: Option<NodeRef>,
    pub element_id: ElementId,
    pub leave_handler: LeaveHandler,
}

/// Context of one mounted route.
#[derive(Clone)]
pub struct TransitionContext {
    pub(crate) is_first: bool,
    pub(crate) animate_first: bool,
    pub(crate) path: Rc<RefCell<PathTransition>>,
    pub(crate) route: String,
    pub(crate) lifecycle: Rc<Cell<RouteLifecycle>>,
    pub(crate) state: Rc<RefCell<StageState>>,
    pub(crate) engine: EngineRef,
    pub(crate) stage_setter: Option<StageSetter>,
}

impl TransitionContext {
    /// Whether this route was mounted as part of the stage's first render.
    pub fn is_first(&self) -> bool {
        self.is_first
    }

    /// Stage-wide override that animates the first render as well.
    pub fn animate_first(&self) -> bool {
        self.animate_first
    }

    /// Live lifecycle check of the owning route.
    pub fn is_leaving(&self) -> bool {
        self.lifecycle.get() == RouteLifecycle::Leaving
    }

    pub fn lifecycle(&self) -> RouteLifecycle {
        self.lifecycle.get()
    }

    /// Latest route change seen by the stage. The group refreshes it for
    /// every mounted route, leaving ones included.
    pub fn path(&self) -> PathTransition {
        self.path.borrow().clone()
    }

    /// Path of the route this context belongs to.
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn engine(&self) -> &EngineRef {
        &self.engine
    }

    /// Register an element under this route.
    pub fn register(&self, config: RegisterConfig) {
        self.state.borrow_mut().register(&self.route, config);
    }

    /// Shared element published under `key` by the route at `path`.
    pub fn shared_element(&self, key: &str, path: &str) -> Option<NodeRef> {
        self.state.borrow().shared_element(key, path)
    }

    /// Setter that switches the owning stage.
    pub fn stage_setter(&self) -> Result<StageSetter> {
        self.stage_setter.clone().ok_or_else(|| {
            warn!(route = %self.route, "stage setter requested outside a switch group");
            TransitionError::MissingStageSetter
        })
    }
}

impl fmt::Debug for TransitionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionContext")
            .field("route", &self.route)
            .field("is_first", &self.is_first)
            .field("path", &*self.path.borrow())
            .field("lifecycle", &self.lifecycle.get())
            .finish_non_exhaustive()
    }
}
