//! Spring physics for `spring` transitions.
//!
//! Uses the analytical solution of the damped harmonic oscillator, normalised
//! so the spring travels from 0.0 to 1.0:
//! ```text
//! x''(t) + 2ζω₀x'(t) + ω₀²x(t) = ω₀²
//! ```
//!
//! Where:
//! - ζ (zeta) = damping ratio = c / (2√(km))
//! - ω₀ = natural frequency = √(k/m)

/// Default spring stiffness (k).
pub const DEFAULT_STIFFNESS: f64 = 100.0;

/// Default spring damping (c).
pub const DEFAULT_DAMPING: f64 = 10.0;

/// Default spring mass (m).
pub const DEFAULT_MASS: f64 = 1.0;

/// Distance from the target below which the spring counts as settled.
const REST_DELTA: f64 = 0.001;

/// Envelope amplitude below which oscillation is considered finished.
const REST_ENVELOPE: f64 = 0.005;

/// Spring physics parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub omega_0: f64,
    pub damping_ratio: f64,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self::new(DEFAULT_STIFFNESS, DEFAULT_DAMPING, DEFAULT_MASS)
    }
}

impl SpringParams {
    /// Derive oscillator parameters from stiffness, damping and mass.
    pub fn new(stiffness: f64, damping: f64, mass: f64) -> Self {
        let stiffness = stiffness.max(f64::EPSILON);
        let mass = mass.max(f64::EPSILON);
        Self {
            omega_0: (stiffness / mass).sqrt(),
            damping_ratio: damping.max(0.0) / (2.0 * (stiffness * mass).sqrt()),
        }
    }

    /// Spring position (0.0 at rest start, 1.0 at target) after `t` seconds.
    pub fn position(&self, t: f64) -> f64 {
        let omega_0 = self.omega_0;
        let zeta = self.damping_ratio;

        if zeta < 1.0 {
            underdamped_position(t, omega_0, zeta)
        } else if (zeta - 1.0).abs() < 0.001 {
            critically_damped_position(t, omega_0)
        } else {
            overdamped_position(t, omega_0, zeta)
        }
    }

    /// Whether the spring has come to rest at time `t` seconds.
    pub fn is_settled(&self, t: f64) -> bool {
        let envelope = (-self.damping_ratio.min(1.0) * self.omega_0 * t).exp()
            * self.omega_0.mul_add(t, 1.0);
        (self.position(t) - 1.0).abs() < REST_DELTA && envelope < REST_ENVELOPE
    }
}

#[inline]
fn underdamped_position(t: f64, omega_0: f64, zeta: f64) -> f64 {
    let zeta_sq_complement = zeta.mul_add(-zeta, 1.0);
    let omega_d = omega_0 * zeta_sq_complement.sqrt();
    let decay = (-zeta * omega_0 * t).exp();
    let cos_term = (omega_d * t).cos();
    let sin_term = (zeta / zeta_sq_complement.sqrt()) * (omega_d * t).sin();

    decay.mul_add(-(cos_term + sin_term), 1.0)
}

#[inline]
fn critically_damped_position(t: f64, omega_0: f64) -> f64 {
    let decay = (-omega_0 * t).exp();
    decay.mul_add(-omega_0.mul_add(t, 1.0), 1.0)
}

#[inline]
fn overdamped_position(t: f64, omega_0: f64, zeta: f64) -> f64 {
    let zeta_sq_minus_one = zeta.mul_add(zeta, -1.0);
    let gamma = omega_0 * zeta_sq_minus_one.sqrt();
    let decay = (-zeta * omega_0 * t).exp();
    let cosh_term = (gamma * t).cosh();
    let sinh_term = (zeta / zeta_sq_minus_one.sqrt()) * (gamma * t).sinh();

    decay.mul_add(-(cosh_term + sinh_term), 1.0)
}
