//! Route lifecycle coordination.
//!
//! A [`Group`] keeps every route that is currently on the stage: the current
//! one (entering or active) and any number of routes that are still playing
//! their exit animations.
//!
//! General flow of a route change:
//! 1. If the next route is still on the stage and leaving, cancel its leave
//!    (its elements re-enter from wherever they are).
//! 2. Push the next route and mark every other route as leaving. Every
//!    mounted route now sees the new path transition.
//! 3. Invoke the leave handlers of every leaving route. A leaving route whose
//!    handlers were already consumed by an earlier change, or that never had
//!    any, is torn down at once.
//! 4. Once all of a route's leave completions resolved, tear it down,
//!    unless it became current again in the meantime.
//!
//! Step 4 is driven by [`Group::poll_leaving`], which the host calls after
//! each engine frame.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::future::{FutureExt, LocalBoxFuture, join_all};
use futures::task::noop_waker_ref;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::Props;
use crate::context::{PathTransition, TransitionContext};
use crate::element::{AnimatedElement, TransitionBehavior};
use crate::engine::EngineRef;
use crate::error::Result;
use crate::node::NodeRef;
use crate::registry::StageState;
use crate::switch::StageSetter;

/// Lifecycle of a route on the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteLifecycle {
    Entering,
    Active,
    Leaving,
}

/// Renders a route's content into a [`MountScope`].
pub trait RouteView {
    fn mount(&self, scope: &mut MountScope<'_>) -> Result<()>;
}

impl<F> RouteView for F
where
    F: Fn(&mut MountScope<'_>) -> Result<()>,
{
    fn mount(&self, scope: &mut MountScope<'_>) -> Result<()> {
        self(scope)
    }
}

/// Shared route content.
pub type RouteContent = Rc<dyn RouteView>;

/// Wrap a mount closure as route content.
pub fn view(f: impl Fn(&mut MountScope<'_>) -> Result<()> + 'static) -> RouteContent {
    Rc::new(f)
}

/// Everything a mounted route owns. Dropping it unmounts the route.
#[derive(Default)]
pub struct MountedRoute {
    markers: Vec<String>,
    nodes: Vec<(String, NodeRef)>,
    elements: Vec<AnimatedElement>,
}

impl MountedRoute {
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn has_marker(&self, text: &str) -> bool {
        self.markers.iter().any(|m| m == text)
    }

    pub fn node(&self, label: &str) -> Option<&NodeRef> {
        self.nodes.iter().find(|(l, _)| l == label).map(|(_, node)| node)
    }

    pub fn element(&self, label: &str) -> Option<&AnimatedElement> {
        self.elements.iter().find(|e| e.label() == label)
    }

    pub fn elements(&self) -> &[AnimatedElement] {
        &self.elements
    }
}

impl fmt::Debug for MountedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedRoute")
            .field("markers", &self.markers)
            .field("nodes", &self.nodes.len())
            .field("elements", &self.elements)
            .finish()
    }
}

/// Mount surface handed to a [`RouteView`].
pub struct MountScope<'a> {
    ctx: &'a TransitionContext,
    mounted: MountedRoute,
}

impl<'a> MountScope<'a> {
    pub fn context(&self) -> &TransitionContext {
        self.ctx
    }

    /// Render a piece of plain text.
    pub fn marker(&mut self, text: impl Into<String>) {
        self.mounted.markers.push(text.into());
    }

    /// Keep a plain, non-animated node alive with the route.
    pub fn node(&mut self, label: impl Into<String>, node: NodeRef) {
        self.mounted.nodes.push((label.into(), node));
    }

    /// Mount an animated element.
    pub fn animated(
        &mut self,
        label: &str,
        node: Option<NodeRef>,
        behavior: Rc<dyn TransitionBehavior>,
        props: Props,
    ) -> Result<()> {
        let element = AnimatedElement::mount(self.ctx, label, node, behavior, props)?;
        self.mounted.elements.push(element);
        Ok(())
    }
}

/// Options fixed for the lifetime of a group.
#[derive(Clone, Default)]
pub struct GroupOptions {
    pub stage_setter: Option<StageSetter>,
    /// Animate elements on the very first render too.
    pub animate_first: bool,
}

struct Route {
    path: String,
    /// Shared with the route's context.
    transition: Rc<RefCell<PathTransition>>,
    content: RouteContent,
    lifecycle: Rc<Cell<RouteLifecycle>>,
    mounted: MountedRoute,
}

struct PendingTeardown {
    path: String,
    join: LocalBoxFuture<'static, ()>,
}

/// Coordinates mutually exclusive routes sharing one stage.
pub struct Group {
    routes: Vec<Route>,
    is_first: bool,
    previous_path: Option<String>,
    current_path: String,
    state: Rc<RefCell<StageState>>,
    engine: EngineRef,
    pending: Vec<PendingTeardown>,
    options: GroupOptions,
}

impl Group {
    /// Mount the initial route.
    pub fn new(path: &str, content: RouteContent, engine: EngineRef) -> Result<Self> {
        Self::with_options(path, content, engine, GroupOptions::default())
    }

    pub fn with_options(
        path: &str,
        content: RouteContent,
        engine: EngineRef,
        options: GroupOptions,
    ) -> Result<Self> {
        let mut group = Self {
            routes: Vec::new(),
            is_first: true,
            previous_path: None,
            current_path: path.to_string(),
            state: Rc::new(RefCell::new(StageState::new())),
            engine,
            pending: Vec::new(),
            options,
        };

        let lifecycle = Rc::new(Cell::new(RouteLifecycle::Active));
        let transition = Rc::new(RefCell::new(PathTransition::new(None, Some(path))));
        let ctx = group.context_for(path, transition.clone(), lifecycle.clone());
        let mounted = group.mount(&ctx, &content)?;
        group.routes.push(Route {
            path: path.to_string(),
            transition,
            content,
            lifecycle,
            mounted,
        });
        debug!(path, "stage mounted");
        Ok(group)
    }

    fn context_for(
        &self,
        route: &str,
        path: Rc<RefCell<PathTransition>>,
        lifecycle: Rc<Cell<RouteLifecycle>>,
    ) -> TransitionContext {
        TransitionContext {
            is_first: self.is_first,
            animate_first: self.options.animate_first,
            path,
            route: route.to_string(),
            lifecycle,
            state: self.state.clone(),
            engine: self.engine.clone(),
            stage_setter: self.options.stage_setter.clone(),
        }
    }

    /// Mount `content`; on failure purge whatever the partial mount
    /// registered.
    fn mount(&self, ctx: &TransitionContext, content: &RouteContent) -> Result<MountedRoute> {
        let mut scope = MountScope {
            ctx,
            mounted: MountedRoute::default(),
        };

        match content.mount(&mut scope) {
            Ok(()) => Ok(scope.mounted),
            Err(err) => {
                drop(scope);
                self.state.borrow_mut().forget_route(ctx.route());
                debug!(route = %ctx.route(), error = %err, "route mount failed");
                Err(err)
            }
        }
    }

    /// Switch the stage to `next`.
    pub fn on_route_change(&mut self, next: &str, content: RouteContent) -> Result<()> {
        if next == self.current_path {
            if let Some(route) = self.routes.iter_mut().find(|r| r.path == next) {
                route.content = content;
            }
            return Ok(());
        }

        let prev = self.current_path.clone();
        let transition = PathTransition::new(Some(&prev), Some(next));

        let route = match self.routes.iter().position(|r| r.path == next) {
            Some(index) => {
                let cancellers = self.state.borrow_mut().take_cancellers(next);
                debug!(path = next, cancelled = cancellers.len(), "re-entering leaving route");
                for cancel in &cancellers {
                    cancel(&transition);
                }

                let mut route = self.routes.remove(index);
                route.content = content;
                route.lifecycle.set(RouteLifecycle::Entering);
                route
            }
            None => {
                let lifecycle = Rc::new(Cell::new(RouteLifecycle::Entering));
                let shared = Rc::new(RefCell::new(transition.clone()));
                let mut ctx = self.context_for(next, shared.clone(), lifecycle.clone());
                ctx.is_first = false;
                let mounted = self.mount(&ctx, &content)?;
                Route {
                    path: next.to_string(),
                    transition: shared,
                    content,
                    lifecycle,
                    mounted,
                }
            }
        };

        self.pending.retain(|p| p.path != next);

        let mut newly_leaving = 0;
        for route in &self.routes {
            if route.lifecycle.get() != RouteLifecycle::Leaving {
                route.lifecycle.set(RouteLifecycle::Leaving);
                newly_leaving += 1;
            }
        }
        let leaving: Vec<String> = self.routes.iter().map(|r| r.path.clone()).collect();

        self.routes.push(route);
        for route in &self.routes {
            *route.transition.borrow_mut() = transition.clone();
        }
        self.is_first = false;
        self.previous_path = Some(prev);
        self.current_path = next.to_string();
        debug!(
            from = ?transition.from,
            to = next,
            leaving = leaving.len(),
            newly_leaving,
            "route changed"
        );

        for path in leaving {
            self.start_leaving(path, &transition);
        }
        Ok(())
    }

    fn start_leaving(&mut self, path: String, transition: &PathTransition) {
        let handlers = self.state.borrow_mut().take_leave_handlers(&path);
        if handlers.is_empty() {
            self.destroy(&path);
            return;
        }

        let mut completions = Vec::with_capacity(handlers.len());
        let mut cancellers = Vec::with_capacity(handlers.len());
        for handler in &handlers {
            let ticket = handler(transition);
            completions.push(ticket.completion);
            cancellers.push(ticket.cancel);
        }
        self.state.borrow_mut().push_cancellers(&path, cancellers);

        trace!(path = %path, handlers = handlers.len(), "route leaving");
        self.pending.push(PendingTeardown {
            path,
            join: join_all(completions).map(|_| ()).boxed_local(),
        });
    }

    /// Remove a route and its bookkeeping. The current route is never
    /// destroyed.
    fn destroy(&mut self, path: &str) -> bool {
        if path == self.current_path {
            return false;
        }
        let Some(index) = self.routes.iter().position(|r| r.path == path) else {
            return false;
        };

        let route = self.routes.remove(index);
        self.pending.retain(|p| p.path != path);
        self.state.borrow_mut().forget_route(path);
        drop(route);
        debug!(path, "route torn down");
        true
    }

    /// Tear down every leaving route whose leave completions all resolved.
    /// Returns the destroyed paths.
    pub fn poll_leaving(&mut self) -> Vec<String> {
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut ready = Vec::new();
        self.pending.retain_mut(|pending| match pending.join.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                ready.push(pending.path.clone());
                false
            }
            Poll::Pending => true,
        });

        let destroyed: Vec<String> = ready.into_iter().filter(|path| self.destroy(path)).collect();

        if self.pending.is_empty() {
            if let Some(current) = self.routes.last() {
                if current.lifecycle.get() == RouteLifecycle::Entering {
                    current.lifecycle.set(RouteLifecycle::Active);
                    trace!(path = %current.path, "route active");
                }
            }
        }
        destroyed
    }

    /// Paths on the stage, leaving routes first, current route last.
    pub fn paths(&self) -> Vec<String> {
        self.routes.iter().map(|r| r.path.clone()).collect()
    }

    pub fn routes(&self) -> impl Iterator<Item = (&str, RouteLifecycle)> {
        self.routes.iter().map(|r| (r.path.as_str(), r.lifecycle.get()))
    }

    pub fn route(&self, path: &str) -> Option<&MountedRoute> {
        self.routes.iter().find(|r| r.path == path).map(|r| &r.mounted)
    }

    pub fn content(&self, path: &str) -> Option<&RouteContent> {
        self.routes.iter().find(|r| r.path == path).map(|r| &r.content)
    }

    pub fn lifecycle(&self, path: &str) -> Option<RouteLifecycle> {
        self.routes.iter().find(|r| r.path == path).map(|r| r.lifecycle.get())
    }

    pub fn is_mounted(&self, path: &str) -> bool {
        self.routes.iter().any(|r| r.path == path)
    }

    /// Whether any mounted route rendered `text`.
    pub fn has_marker(&self, text: &str) -> bool {
        self.routes.iter().any(|r| r.mounted.has_marker(text))
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn previous_path(&self) -> Option<&str> {
        self.previous_path.as_deref()
    }

    pub fn is_first(&self) -> bool {
        self.is_first
    }

    pub fn has_pending_leaves(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn shared_element(&self, key: &str, path: &str) -> Option<NodeRef> {
        self.state.borrow().shared_element(key, path)
    }

    pub fn engine(&self) -> &EngineRef {
        &self.engine
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("routes", &self.routes().collect::<Vec<_>>())
            .field("current_path", &self.current_path)
            .field("previous_path", &self.previous_path)
            .field("is_first", &self.is_first)
            .field("pending", &self.pending.len())
            .finish()
    }
}
