//! Animation engine interface.
//!
//! Elements never interpolate styles themselves. They describe an action
//! (`from` style, `to` style, a [`TransitionDefinition`]) and hand it to an
//! [`AnimationEngine`], which pushes intermediate styles through the
//! observer's `on_update` and calls `on_complete` exactly once when the
//! action reaches its target. Stopping an action through its
//! [`ActionHandle`] suppresses `on_complete`.
//!
//! [`FrameEngine`] is the reference engine: it advances on explicit
//! [`FrameEngine::tick`] calls, which makes it usable both from a host frame
//! loop and as a fake clock in tests.

pub mod frame;

pub use frame::{EngineMode, FrameEngine};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::easing::EasingFunction;
use crate::style::Style;

/// Unique identifier for a started action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u64);

impl ActionId {
    /// Generate a new unique action ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of integrator used for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Eased interpolation over a fixed duration.
    #[default]
    Tween,
    /// Damped harmonic oscillator.
    Spring,
    /// Velocity-driven motion with friction.
    Physics,
    /// Exponential decay towards the target.
    Decay,
    /// Multi-step sequence. [`TransitionDefinition`] carries no keyframe
    /// values or offsets, so engines receive only the two end styles; the
    /// reference engine runs it as a linear tween between them.
    Keyframes,
}

/// How a transition should animate: integrator kind, its parameters and an
/// optional delay.
///
/// Unset parameters fall back to the engine's defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionDefinition {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Delay before the action starts moving, in milliseconds.
    pub delay_ms: f32,
    pub duration_ms: Option<f32>,
    pub easing: Option<EasingFunction>,
    pub stiffness: Option<f64>,
    pub damping: Option<f64>,
    pub mass: Option<f64>,
    /// Lower bound for numeric values of intermediate frames.
    pub min: Option<f64>,
    /// Upper bound for numeric values of intermediate frames.
    pub max: Option<f64>,
    /// Round numeric values of intermediate frames to whole numbers.
    pub round: bool,
}

impl TransitionDefinition {
    /// Tween with the engine's default duration and easing.
    pub fn tween() -> Self {
        Self::default()
    }

    /// Spring with the default stiffness, damping and mass.
    pub fn spring() -> Self {
        Self {
            kind: ActionKind::Spring,
            ..Self::default()
        }
    }

    pub fn of_kind(kind: ActionKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay_ms: f32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_duration(mut self, duration_ms: f32) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = Some(stiffness);
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = Some(damping);
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn rounded(mut self) -> Self {
        self.round = true;
        self
    }
}

/// Everything an engine needs to run one action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub from: Style,
    pub to: Style,
    pub transition: TransitionDefinition,
}

impl ActionRequest {
    pub fn new(from: Style, to: Style, transition: TransitionDefinition) -> Self {
        Self {
            from,
            to,
            transition,
        }
    }
}

/// Callbacks driven by a running action.
pub struct ActionObserver {
    /// Receives every intermediate style, and the exact `to` style last.
    pub on_update: Rc<dyn Fn(&Style)>,
    /// Runs once when the action reaches its target. Never runs if stopped.
    pub on_complete: Box<dyn FnOnce()>,
}

impl ActionObserver {
    pub fn new(on_update: impl Fn(&Style) + 'static, on_complete: impl FnOnce() + 'static) -> Self {
        Self {
            on_update: Rc::new(on_update),
            on_complete: Box::new(on_complete),
        }
    }
}

impl fmt::Debug for ActionObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionObserver").finish_non_exhaustive()
    }
}

/// Handle to a started action.
#[derive(Default)]
pub struct ActionHandle {
    stop: Option<Box<dyn FnOnce()>>,
}

impl ActionHandle {
    pub fn new(stop: impl FnOnce() + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    /// Handle for an action that cannot be stopped (already finished).
    pub fn detached() -> Self {
        Self::default()
    }

    /// Stop the action. Calling this more than once is a no-op.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_none()
    }
}

impl fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandle")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Runs style actions.
///
/// `start` may call `on_update` synchronously but must never call
/// `on_complete` before returning.
pub trait AnimationEngine {
    fn start(&self, request: ActionRequest, observer: ActionObserver) -> ActionHandle;
}

/// Shared engine handle.
pub type EngineRef = Rc<dyn AnimationEngine>;
