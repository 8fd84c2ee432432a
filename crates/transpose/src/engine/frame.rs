//! Frame-driven reference engine.
//!
//! The `FrameEngine` owns every running action and advances them when the
//! host calls [`FrameEngine::tick`] with the elapsed frame time. Finished
//! actions emit their exact target style, are removed, and then have their
//! completion callback invoked.
//!
//! Callbacks run with no internal borrow held, so they may start or stop
//! other actions on the same engine. Actions started from a callback are
//! first advanced on the next tick.
//!
//! # Usage
//!
//! ```
//! use transpose::engine::{ActionObserver, ActionRequest, AnimationEngine, FrameEngine, TransitionDefinition};
//! use transpose::style::Style;
//!
//! let engine = FrameEngine::new();
//! let request = ActionRequest::new(
//!     Style::new().with("opacity", 0.0),
//!     Style::new().with("opacity", 1.0),
//!     TransitionDefinition::tween().with_duration(100.0),
//! );
//! let _handle = engine.start(request, ActionObserver::new(|_style| {}, || {}));
//!
//! engine.advance(100.0);
//! assert!(engine.is_idle());
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};
use transpose_config::EngineSettings;

use super::{ActionHandle, ActionId, ActionKind, ActionObserver, ActionRequest, AnimationEngine};
use crate::easing::EasingFunction;
use crate::interpolate::Interpolate;
use crate::spring::{DEFAULT_DAMPING, DEFAULT_MASS, DEFAULT_STIFFNESS, SpringParams};
use crate::style::{Style, StyleValue};

/// Default frame step used by [`FrameEngine::advance`] (~60fps).
pub const DEFAULT_FRAME_MS: f32 = 16.0;

/// Default tween duration in milliseconds.
pub const DEFAULT_DURATION_MS: f32 = 300.0;

/// Default settle time of the snapping mode in milliseconds.
pub const DEFAULT_SNAP_SETTLE_MS: f32 = 10.0;

/// Springs that never settle are cut off after this long.
const MAX_SPRING_MS: f32 = 10_000.0;

/// Physics and decay actions settle after this many time constants.
const EXPONENTIAL_SPAN: f32 = 5.0;

/// How the engine moves actions towards their targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineMode {
    /// Emit interpolated styles every tick.
    Interpolate,
    /// Emit the target as soon as the delay has elapsed, then complete after
    /// `settle_ms`.
    Snap { settle_ms: f32 },
}

/// Progress curve of a running action.
#[derive(Debug, Clone, Copy)]
enum Curve {
    Eased {
        duration_ms: f32,
        easing: EasingFunction,
    },
    Spring(SpringParams),
    Exponential {
        time_constant_ms: f32,
    },
    Snap {
        settle_ms: f32,
    },
}

impl Curve {
    /// Eased progress after `active_ms` of motion.
    fn progress(&self, active_ms: f32) -> f32 {
        match self {
            Self::Eased {
                duration_ms,
                easing,
            } => {
                if *duration_ms <= 0.0 {
                    1.0
                } else {
                    easing.evaluate(active_ms / duration_ms)
                }
            }
            Self::Spring(params) => params.position(f64::from(active_ms) / 1000.0) as f32,
            Self::Exponential { time_constant_ms } => {
                1.0 - (-active_ms / time_constant_ms.max(f32::EPSILON)).exp()
            }
            Self::Snap { .. } => 1.0,
        }
    }

    fn is_finished(&self, active_ms: f32) -> bool {
        match self {
            Self::Eased { duration_ms, .. } => active_ms >= *duration_ms,
            Self::Spring(params) => {
                active_ms >= MAX_SPRING_MS || params.is_settled(f64::from(active_ms) / 1000.0)
            }
            Self::Exponential { time_constant_ms } => {
                active_ms >= time_constant_ms * EXPONENTIAL_SPAN
            }
            Self::Snap { settle_ms } => active_ms >= *settle_ms,
        }
    }
}

/// `min`/`max`/`round` options of a transition, applied to the numeric
/// values of every intermediate frame. The final frame is always the exact
/// target style.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct OutputLimits {
    min: Option<f64>,
    max: Option<f64>,
    round: bool,
}

impl OutputLimits {
    fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none() && !self.round
    }

    fn limit(&self, mut value: f64) -> f64 {
        if let Some(min) = self.min {
            value = value.max(min);
        }
        if let Some(max) = self.max {
            value = value.min(max);
        }
        if self.round {
            value = value.round();
        }
        value
    }

    fn apply(&self, style: Style) -> Style {
        if self.is_unbounded() {
            return style;
        }
        style
            .iter()
            .map(|(key, value)| match value {
                StyleValue::Number(n) => (key, StyleValue::Number(self.limit(*n))),
                other => (key, other.clone()),
            })
            .collect()
    }
}

/// Current state of a running action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionState {
    /// Waiting for the delay to elapse.
    Pending,
    Running,
}

/// Outcome of advancing one action by one frame.
enum Step {
    Waiting,
    Frame(Style),
    Finished,
}

struct RunningAction {
    id: ActionId,
    from: Style,
    to: Style,
    curve: Curve,
    limits: OutputLimits,
    delay_ms: f32,
    elapsed_ms: f32,
    state: ActionState,
    on_update: Rc<dyn Fn(&Style)>,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl RunningAction {
    fn advance(&mut self, delta_ms: f32) -> Step {
        self.elapsed_ms += delta_ms;

        if self.state == ActionState::Pending {
            if self.elapsed_ms < self.delay_ms {
                return Step::Waiting;
            }
            self.state = ActionState::Running;
        }

        let active_ms = self.elapsed_ms - self.delay_ms;
        if self.curve.is_finished(active_ms) {
            return Step::Finished;
        }

        let t = self.curve.progress(active_ms);
        Step::Frame(self.limits.apply(self.from.interpolate(&self.to, t)))
    }
}

#[derive(Default)]
struct FrameState {
    actions: Vec<RunningAction>,
}

/// Deterministic engine advanced by explicit frame ticks.
pub struct FrameEngine {
    state: Rc<RefCell<FrameState>>,
    mode: EngineMode,
    frame_ms: f32,
    default_duration_ms: f32,
    default_easing: EasingFunction,
}

impl Default for FrameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEngine {
    /// Interpolating engine with default timings.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(FrameState::default())),
            mode: EngineMode::Interpolate,
            frame_ms: DEFAULT_FRAME_MS,
            default_duration_ms: DEFAULT_DURATION_MS,
            default_easing: EasingFunction::default(),
        }
    }

    /// Engine in snapping mode.
    pub fn snapping(settle_ms: f32) -> Self {
        Self {
            mode: EngineMode::Snap { settle_ms },
            ..Self::new()
        }
    }

    /// Build an engine from loaded settings.
    pub fn from_settings(settings: &EngineSettings) -> Self {
        let mode = if settings.snap {
            EngineMode::Snap {
                settle_ms: settings.snap_settle_ms,
            }
        } else {
            EngineMode::Interpolate
        };

        let default_easing = EasingFunction::from_name(&settings.default_easing).unwrap_or_else(|| {
            warn!(easing = %settings.default_easing, "unknown default easing, using ease_out");
            EasingFunction::default()
        });

        Self {
            state: Rc::new(RefCell::new(FrameState::default())),
            mode,
            frame_ms: if settings.frame_ms > 0.0 {
                settings.frame_ms
            } else {
                DEFAULT_FRAME_MS
            },
            default_duration_ms: settings.default_duration_ms,
            default_easing,
        }
    }

    pub fn with_frame_ms(mut self, frame_ms: f32) -> Self {
        if frame_ms > 0.0 {
            self.frame_ms = frame_ms;
        }
        self
    }

    pub fn with_default_duration(mut self, duration_ms: f32) -> Self {
        self.default_duration_ms = duration_ms;
        self
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn frame_ms(&self) -> f32 {
        self.frame_ms
    }

    /// Number of actions still running or waiting for their delay.
    pub fn active_count(&self) -> usize {
        self.state.borrow().actions.len()
    }

    pub fn is_idle(&self) -> bool {
        self.state.borrow().actions.is_empty()
    }

    /// Advance every running action by `delta_ms`.
    pub fn tick(&self, delta_ms: f32) {
        let ids: Vec<ActionId> = self.state.borrow().actions.iter().map(|a| a.id).collect();
        if ids.is_empty() {
            return;
        }
        trace!(delta_ms, actions = ids.len(), "engine frame");

        for id in ids {
            let step = {
                let mut state = self.state.borrow_mut();
                let Some(index) = state.actions.iter().position(|a| a.id == id) else {
                    // Stopped by a callback earlier in this frame.
                    continue;
                };
                match state.actions[index].advance(delta_ms) {
                    Step::Waiting => None,
                    Step::Frame(style) => Some((state.actions[index].on_update.clone(), style, None)),
                    Step::Finished => {
                        let mut action = state.actions.remove(index);
                        trace!(action = action.id.0, "action finished");
                        Some((action.on_update.clone(), action.to, action.on_complete.take()))
                    }
                }
            };

            if let Some((on_update, style, on_complete)) = step {
                on_update(&style);
                if let Some(on_complete) = on_complete {
                    on_complete();
                }
            }
        }
    }

    /// Advance by `total_ms` in frame-sized steps.
    pub fn advance(&self, total_ms: f32) {
        let mut remaining = total_ms;
        while remaining > 0.0 {
            let step = remaining.min(self.frame_ms);
            self.tick(step);
            remaining -= step;
        }
    }

    /// Tick until no action is left or `limit_ms` has elapsed. Returns the
    /// simulated time spent.
    pub fn run_until_idle(&self, limit_ms: f32) -> f32 {
        let mut spent = 0.0;
        while !self.is_idle() && spent < limit_ms {
            self.tick(self.frame_ms);
            spent += self.frame_ms;
        }
        spent
    }

    fn curve_for(&self, request: &ActionRequest) -> Curve {
        if let EngineMode::Snap { settle_ms } = self.mode {
            return Curve::Snap { settle_ms };
        }

        let def = &request.transition;
        let duration_ms = def.duration_ms.unwrap_or(self.default_duration_ms);
        match def.kind {
            ActionKind::Tween => Curve::Eased {
                duration_ms,
                easing: def.easing.unwrap_or(self.default_easing),
            },
            // No keyframe values travel with a request; run the two ends.
            ActionKind::Keyframes => Curve::Eased {
                duration_ms,
                easing: def.easing.unwrap_or(EasingFunction::Linear),
            },
            ActionKind::Spring => Curve::Spring(SpringParams::new(
                def.stiffness.unwrap_or(DEFAULT_STIFFNESS),
                def.damping.unwrap_or(DEFAULT_DAMPING),
                def.mass.unwrap_or(DEFAULT_MASS),
            )),
            ActionKind::Physics | ActionKind::Decay => Curve::Exponential {
                time_constant_ms: duration_ms / EXPONENTIAL_SPAN,
            },
        }
    }
}

impl AnimationEngine for FrameEngine {
    fn start(&self, request: ActionRequest, observer: ActionObserver) -> ActionHandle {
        let curve = self.curve_for(&request);
        let limits = OutputLimits {
            min: request.transition.min,
            max: request.transition.max,
            round: request.transition.round,
        };
        let delay_ms = request.transition.delay_ms.max(0.0);
        let id = ActionId::new();

        trace!(
            action = id.0,
            kind = ?request.transition.kind,
            delay_ms,
            "action started"
        );

        if matches!(curve, Curve::Snap { .. }) && delay_ms <= 0.0 {
            (observer.on_update)(&request.to);
        }

        self.state.borrow_mut().actions.push(RunningAction {
            id,
            from: request.from,
            to: request.to,
            curve,
            limits,
            delay_ms,
            elapsed_ms: 0.0,
            state: if delay_ms > 0.0 {
                ActionState::Pending
            } else {
                ActionState::Running
            },
            on_update: observer.on_update,
            on_complete: Some(observer.on_complete),
        });

        let state: Weak<RefCell<FrameState>> = Rc::downgrade(&self.state);
        ActionHandle::new(move || {
            if let Some(state) = state.upgrade() {
                state.borrow_mut().actions.retain(|a| a.id != id);
                trace!(action = id.0, "action stopped");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TransitionDefinition;
    use std::cell::Cell;

    fn recorder() -> (Rc<RefCell<Vec<Style>>>, Rc<Cell<u32>>, ActionObserver) {
        let frames = Rc::new(RefCell::new(Vec::new()));
        let completed = Rc::new(Cell::new(0));
        let (f, c) = (frames.clone(), completed.clone());
        let observer = ActionObserver::new(
            move |style: &Style| f.borrow_mut().push(style.clone()),
            move || c.set(c.get() + 1),
        );
        (frames, completed, observer)
    }

    fn fade(duration_ms: f32) -> ActionRequest {
        ActionRequest::new(
            Style::new().with("opacity", 0.0),
            Style::new().with("opacity", 1.0),
            TransitionDefinition::tween()
                .with_duration(duration_ms)
                .with_easing(EasingFunction::Linear),
        )
    }

    #[test]
    fn test_tween_interpolates_and_completes_once() {
        let engine = FrameEngine::new();
        let (frames, completed, observer) = recorder();
        let _handle = engine.start(fade(100.0), observer);

        engine.tick(50.0);
        assert_eq!(
            frames.borrow().last().and_then(|s| s.get("opacity").cloned()),
            Some(StyleValue::Number(0.5))
        );
        assert_eq!(completed.get(), 0);

        engine.tick(50.0);
        engine.tick(50.0);
        assert_eq!(completed.get(), 1);
        assert_eq!(frames.borrow().last(), Some(&Style::new().with("opacity", 1.0)));
        assert!(engine.is_idle());
    }

    #[test]
    fn test_delay_holds_action_pending() {
        let engine = FrameEngine::new();
        let (frames, _completed, observer) = recorder();
        let mut request = fade(100.0);
        request.transition.delay_ms = 40.0;
        let _handle = engine.start(request, observer);

        engine.tick(30.0);
        assert!(frames.borrow().is_empty());
        engine.tick(20.0);
        assert_eq!(frames.borrow().len(), 1);
    }

    #[test]
    fn test_stopped_action_never_completes() {
        let engine = FrameEngine::new();
        let (_frames, completed, observer) = recorder();
        let mut handle = engine.start(fade(100.0), observer);

        engine.tick(16.0);
        handle.stop();
        engine.advance(200.0);
        assert_eq!(completed.get(), 0);
        assert!(engine.is_idle());
    }

    #[test]
    fn test_snap_mode_emits_target_immediately() {
        let engine = FrameEngine::snapping(DEFAULT_SNAP_SETTLE_MS);
        let (frames, completed, observer) = recorder();
        let _handle = engine.start(fade(1000.0), observer);

        assert_eq!(frames.borrow().first(), Some(&Style::new().with("opacity", 1.0)));
        engine.tick(5.0);
        assert_eq!(completed.get(), 0);
        engine.tick(5.0);
        assert_eq!(completed.get(), 1);
    }

    #[test]
    fn test_spring_reaches_exact_target() {
        let engine = FrameEngine::new();
        let (frames, completed, observer) = recorder();
        let request = ActionRequest::new(
            Style::new().with("x", 0.0),
            Style::new().with("x", 100.0),
            TransitionDefinition::spring(),
        );
        let _handle = engine.start(request, observer);

        let spent = engine.run_until_idle(MAX_SPRING_MS + 100.0);
        assert!(spent < MAX_SPRING_MS);
        assert_eq!(completed.get(), 1);
        assert_eq!(frames.borrow().last(), Some(&Style::new().with("x", 100.0)));
    }

    #[test]
    fn test_callbacks_may_start_actions() {
        let engine = Rc::new(FrameEngine::new());
        let chained = Rc::new(Cell::new(false));
        let (inner_engine, flag) = (engine.clone(), chained.clone());

        let _handle = engine.start(
            fade(16.0),
            ActionObserver::new(
                |_: &Style| {},
                move || {
                    let flag = flag.clone();
                    let _next = inner_engine.start(
                        fade(16.0),
                        ActionObserver::new(|_: &Style| {}, move || flag.set(true)),
                    );
                },
            ),
        );

        engine.tick(16.0);
        assert_eq!(engine.active_count(), 1);
        engine.tick(16.0);
        assert!(chained.get());
    }

    #[test]
    fn test_intermediate_frames_respect_bounds_and_rounding() {
        let engine = FrameEngine::new();
        let (frames, completed, observer) = recorder();
        let request = ActionRequest::new(
            Style::new().with("x", 0.0).with("color", "red"),
            Style::new().with("x", 100.0).with("color", "blue"),
            TransitionDefinition::tween()
                .with_duration(100.0)
                .with_easing(EasingFunction::Linear)
                .with_max(30.0)
                .rounded(),
        );
        let _handle = engine.start(request, observer);

        engine.tick(17.0);
        engine.tick(17.0);
        assert_eq!(frames.borrow()[0].get("x"), Some(&StyleValue::Number(17.0)));
        assert_eq!(frames.borrow()[1].get("x"), Some(&StyleValue::Number(30.0)));
        assert!(matches!(frames.borrow()[1].get("color"), Some(StyleValue::Color(_))));

        engine.advance(100.0);
        assert_eq!(completed.get(), 1);
        let last = frames.borrow().last().cloned().unwrap();
        assert_eq!(last.get("x"), Some(&StyleValue::Number(100.0)));
    }

    #[test]
    fn test_from_settings() {
        let settings = EngineSettings {
            snap: true,
            snap_settle_ms: 20.0,
            default_easing: "linear".to_string(),
            ..EngineSettings::default()
        };
        let engine = FrameEngine::from_settings(&settings);
        assert_eq!(engine.mode(), EngineMode::Snap { settle_ms: 20.0 });
    }
}
