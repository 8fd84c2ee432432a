//! Animated transitions between routes sharing one stage.
//!
//! This crate provides:
//! - **Groups**: route lifecycle coordination (entering, active, leaving) with
//!   cancellable leaves and at-most-one teardown per route
//! - **Switch groups**: pick one stage out of a fixed set and hand it to a group
//! - **Animated elements**: per-node enter / exit / re-enter state machine
//! - **Shared elements**: continuous box animation between same-keyed
//!   elements on the outgoing and incoming routes
//! - **Engines**: the action interface plus a frame-driven reference engine
//!
//! # Architecture
//!
//! ```text
//! SwitchGroup
//!   └── Group (route arena, StageState)
//!         └── TransitionContext (one per route)
//!               └── AnimatedElement
//!                     ├── TransitionBehavior (Transposed / TransposedShared / custom)
//!                     ├── AnimationEngine ──> StyleTarget
//!                     └── StageState (leave handlers, shared elements)
//! ```
//!
//! Everything is single-threaded. The host drives the engine (for the
//! reference [`FrameEngine`] by calling `tick`) and then calls
//! [`Group::poll_leaving`] so finished routes are torn down.

pub mod config;
pub mod context;
pub mod easing;
pub mod element;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod group;
pub mod interpolate;
pub mod node;
pub mod registry;
pub mod spring;
pub mod style;
pub mod switch;

pub use config::{ConfigArgs, Direction, Props, ResolvedStyle, StyleConfig, StyleSpec, TransitionConfig};
pub use context::{
    Canceller, LeaveCompletion, LeaveHandler, LeaveSignal, LeaveTicket, PathTransition,
    RegisterConfig, TransitionContext,
};
pub use easing::EasingFunction;
pub use element::{
    AnimatedElement, ElementPhase, SharedElements, SharedKey, StyleCache, TransitionArgs,
    TransitionBehavior, Transposed, TransposedShared,
};
pub use engine::{
    ActionHandle, ActionId, ActionKind, ActionObserver, ActionRequest, AnimationEngine, EngineMode,
    EngineRef, FrameEngine, TransitionDefinition,
};
pub use error::{Result, TransitionError};
pub use geometry::{BoxDiff, BoxInfo, Rect, box_difference};
pub use group::{Group, GroupOptions, MountScope, MountedRoute, RouteContent, RouteLifecycle, RouteView, view};
pub use interpolate::Interpolate;
pub use node::{MemoryNode, NodeRef, StyleTarget};
pub use registry::{ElementId, LeaveRegistration, SharedElementRegistry, StageState};
pub use style::{Style, StyleValue};
pub use switch::{RenderFn, StageEntry, StageSetter, SwitchGroup, resolve_stage};
