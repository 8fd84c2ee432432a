//! Easing functions for tween timing.
//!
//! Covers the named curves a transition definition may ask for:
//! - Linear
//! - EaseIn, EaseOut, EaseInOut (standard CSS curves)
//! - CircIn, CircOut, CircInOut
//! - BackIn, BackOut, BackInOut, Anticipate (overshooting curves)
//! - CubicBezier (custom bezier curves)
//!
//! # Usage
//!
//! ```
//! use transpose::easing::EasingFunction;
//!
//! let ease = EasingFunction::EaseOut;
//! let progress = ease.evaluate(0.5);
//! assert!(progress > 0.5);
//!
//! let custom = EasingFunction::cubic_bezier(0.4, 0.0, 0.2, 1.0);
//! let progress = custom.evaluate(0.5);
//! assert!(progress > 0.0 && progress < 1.0);
//! ```

use serde::{Deserialize, Serialize};

/// Overshoot amount used by the back curves.
const BACK_POWER: f32 = 1.525;

/// Easing function for animation timing.
///
/// Easing functions map a linear progress value (0.0 to 1.0) to an eased
/// output value, controlling the rate of change over time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EasingFunction {
    /// Linear interpolation (no easing).
    Linear,

    /// Slow start, accelerating. `cubic-bezier(0.42, 0, 1, 1)`.
    EaseIn,

    /// Fast start, decelerating. `cubic-bezier(0, 0, 0.58, 1)`.
    EaseOut,

    /// Slow start and end, fast middle. `cubic-bezier(0.42, 0, 0.58, 1)`.
    EaseInOut,

    /// Circular acceleration.
    CircIn,

    /// Circular deceleration.
    CircOut,

    /// Circular acceleration then deceleration.
    CircInOut,

    /// Pulls back slightly before moving forward.
    BackIn,

    /// Overshoots the target before settling.
    BackOut,

    /// Pulls back, then overshoots.
    BackInOut,

    /// Pulls back, then shoots to the target with an exponential tail.
    Anticipate,

    /// Custom cubic bezier curve.
    /// Parameters: (x1, y1, x2, y2) - control points.
    /// x values must be in [0, 1], y values can be any float.
    CubicBezier { x1: f32, y1: f32, x2: f32, y2: f32 },
}

impl Default for EasingFunction {
    fn default() -> Self {
        Self::EaseOut
    }
}

impl EasingFunction {
    /// Evaluate the easing function at the given progress.
    ///
    /// # Arguments
    /// * `t` - Progress value from 0.0 to 1.0
    ///
    /// # Returns
    /// Eased progress value (may be outside 0.0-1.0 for overshooting curves)
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::EaseIn => Bezier::css(0.42, 1.0).at(t),
            Self::EaseOut => Bezier::css(0.0, 0.58).at(t),
            Self::EaseInOut => Bezier::css(0.42, 0.58).at(t),
            Self::CircIn => circ_in(t),
            Self::CircOut => reversed(circ_in, t),
            Self::CircInOut => mirrored(circ_in, t),
            Self::BackIn => back_in(t),
            Self::BackOut => reversed(back_in, t),
            Self::BackInOut => mirrored(back_in, t),
            Self::Anticipate => anticipate(t),
            Self::CubicBezier { x1, y1, x2, y2 } => Bezier::new(*x1, *y1, *x2, *y2).at(t),
        }
    }

    /// Create a custom cubic bezier easing function.
    ///
    /// # Panics
    /// Panics if x1 or x2 are outside [0, 1].
    pub fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2),
            "Bezier x values must be in [0, 1]"
        );
        Self::CubicBezier { x1, y1, x2, y2 }
    }

    /// Look up a named curve, accepting both `ease_in` and `easeIn` spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Some(match normalized.as_str() {
            "linear" => Self::Linear,
            "easein" => Self::EaseIn,
            "easeout" => Self::EaseOut,
            "easeinout" => Self::EaseInOut,
            "circin" => Self::CircIn,
            "circout" => Self::CircOut,
            "circinout" => Self::CircInOut,
            "backin" => Self::BackIn,
            "backout" => Self::BackOut,
            "backinout" => Self::BackInOut,
            "anticipate" => Self::Anticipate,
            _ => return None,
        })
    }
}

fn circ_in(t: f32) -> f32 {
    1.0 - (1.0 - t * t).max(0.0).sqrt()
}

fn back_in(t: f32) -> f32 {
    t * t * ((BACK_POWER + 1.0) * t - BACK_POWER)
}

fn anticipate(t: f32) -> f32 {
    let p = t * 2.0;
    if p < 1.0 {
        0.5 * back_in(p)
    } else {
        0.5 * (2.0 - 2.0_f32.powf(-10.0 * (p - 1.0)))
    }
}

/// Turn an ease-in curve into its ease-out counterpart.
#[inline]
fn reversed(curve: fn(f32) -> f32, t: f32) -> f32 {
    1.0 - curve(1.0 - t)
}

/// Turn an ease-in curve into an ease-in-out curve.
#[inline]
fn mirrored(curve: fn(f32) -> f32, t: f32) -> f32 {
    if t <= 0.5 {
        curve(2.0 * t) / 2.0
    } else {
        (2.0 - curve(2.0 * (1.0 - t))) / 2.0
    }
}

/// Halvings used to invert x(t); 20 steps resolve t to about 1e-6.
const BISECTION_STEPS: usize = 20;

/// A cubic bezier running from (0, 0) to (1, 1), kept as polynomial
/// coefficients `[a, b, c]` of `a·t³ + b·t² + c·t` per axis.
#[derive(Debug, Clone, Copy)]
struct Bezier {
    x: [f32; 3],
    y: [f32; 3],
}

impl Bezier {
    fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: coefficients(x1, x2),
            y: coefficients(y1, y2),
        }
    }

    /// CSS timing curve: both end tangents anchored on y = 0 and y = 1.
    fn css(x1: f32, x2: f32) -> Self {
        Self::new(x1, 0.0, x2, 1.0)
    }

    /// Output for input progress `x`.
    ///
    /// With both x control values in [0, 1], x(t) is monotonic, so plain
    /// bisection always converges.
    fn at(&self, x: f32) -> f32 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }

        let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
        for _ in 0..BISECTION_STEPS {
            let mid = (lo + hi) * 0.5;
            if horner(self.x, mid) < x {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        horner(self.y, (lo + hi) * 0.5)
    }
}

fn coefficients(p1: f32, p2: f32) -> [f32; 3] {
    let c = 3.0 * p1;
    let b = 3.0 * (p2 - p1) - c;
    [1.0 - c - b, b, c]
}

#[inline]
fn horner([a, b, c]: [f32; 3], t: f32) -> f32 {
    ((a * t + b) * t + c) * t
}
