//! Interpolation between style values.
//!
//! Numbers are interpolated linearly. Colours are interpolated per RGBA
//! component; keywords that parse as CSS colours (`"red"`, `"#00ff00"`,
//! `"rgb(...)"`) are converted on the fly. Anything else switches discretely
//! at the halfway point. Both endpoints are returned verbatim, so a keyword
//! like `"blue"` is still `"blue"` once an animation settles.

use csscolorparser::Color as CssColor;
use std::str::FromStr;

use crate::style::{Style, StyleValue};

/// Trait for types that can be interpolated between two values.
pub trait Interpolate: Sized {
    /// Interpolate between self and `to`.
    ///
    /// When t = 0.0, returns self. When t = 1.0, returns `to`.
    fn interpolate(&self, to: &Self, t: f32) -> Self;
}

#[inline]
fn lerp_f64(from: f64, to: f64, t: f32) -> f64 {
    from + (to - from) * f64::from(t)
}

#[inline]
fn lerp_f32(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

impl Interpolate for f64 {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        lerp_f64(*self, *to, t)
    }
}

impl Interpolate for [f32; 4] {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        [
            lerp_f32(self[0], to[0], t),
            lerp_f32(self[1], to[1], t),
            lerp_f32(self[2], to[2], t),
            lerp_f32(self[3], to[3], t),
        ]
    }
}

/// Resolve a style value to RGBA, parsing colour keywords.
pub fn as_rgba(value: &StyleValue) -> Option<[f32; 4]> {
    match value {
        StyleValue::Color(rgba) => Some(*rgba),
        StyleValue::Keyword(raw) => CssColor::from_str(raw)
            .ok()
            .map(|c| [c.r as f32, c.g as f32, c.b as f32, c.a as f32]),
        StyleValue::Number(_) => None,
    }
}

impl Interpolate for StyleValue {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        if t <= 0.0 {
            return self.clone();
        }
        if t >= 1.0 {
            return to.clone();
        }

        if let (Some(from), Some(to_val)) = (self.as_number(), to.as_number()) {
            return Self::Number(from.interpolate(&to_val, t));
        }

        if let (Some(from), Some(to_val)) = (as_rgba(self), as_rgba(to)) {
            return Self::Color(from.interpolate(&to_val, t));
        }

        // Not interpolatable - flip halfway like CSS discrete animation
        if t < 0.5 { self.clone() } else { to.clone() }
    }
}

impl Interpolate for Style {
    /// Interpolate every key of `to`.
    ///
    /// Keys missing from `self` jump straight to the target value; keys only
    /// present in `self` are not part of the output.
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        to.iter()
            .map(|(key, target)| {
                let value = match self.get(key) {
                    Some(from) => from.interpolate(target, t),
                    None => target.clone(),
                };
                (key.to_string(), value)
            })
            .collect()
    }
}
