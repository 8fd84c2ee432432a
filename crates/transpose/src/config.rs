//! Enter/exit style configuration.
//!
//! A style config is either a static [`StyleSpec`] or a function of the
//! element's props, the path transition and the direction being resolved.
//! Configs are resolved once per transition.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::context::PathTransition;
use crate::engine::TransitionDefinition;
use crate::style::Style;

/// Free-form element props handed to config and shared-key functions.
pub type Props = serde_json::Value;

/// Which way a style is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Resolving the initial style of an entering element.
    In,
    /// Resolving the target style of a leaving element.
    Out,
}

/// Arguments passed to computed configs.
#[derive(Debug, Clone, Copy)]
pub struct ConfigArgs<'a> {
    pub props: &'a Props,
    pub path: &'a PathTransition,
    pub direction: Direction,
}

/// A style plus an optional transition descriptor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSpec {
    pub style: Style,
    pub transition: Option<TransitionDefinition>,
}

impl StyleSpec {
    pub fn new(style: Style) -> Self {
        Self {
            style,
            transition: None,
        }
    }

    pub fn with_transition(mut self, transition: TransitionDefinition) -> Self {
        self.transition = Some(transition);
        self
    }
}

impl From<Style> for StyleSpec {
    fn from(style: Style) -> Self {
        Self::new(style)
    }
}

/// Style resolved for one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub style: Style,
    /// Defaults to a tween with no delay.
    pub transition: TransitionDefinition,
}

/// Enter or exit style configuration.
#[derive(Clone)]
pub enum StyleConfig {
    Static(StyleSpec),
    Computed(Rc<dyn Fn(&ConfigArgs<'_>) -> StyleSpec>),
}

impl StyleConfig {
    pub fn computed(f: impl Fn(&ConfigArgs<'_>) -> StyleSpec + 'static) -> Self {
        Self::Computed(Rc::new(f))
    }

    pub fn resolve(&self, path: &PathTransition, props: &Props, direction: Direction) -> ResolvedStyle {
        let spec = match self {
            Self::Static(spec) => spec.clone(),
            Self::Computed(f) => f(&ConfigArgs {
                props,
                path,
                direction,
            }),
        };

        ResolvedStyle {
            style: spec.style,
            transition: spec.transition.unwrap_or_default(),
        }
    }
}

impl From<Style> for StyleConfig {
    fn from(style: Style) -> Self {
        Self::Static(StyleSpec::new(style))
    }
}

impl From<StyleSpec> for StyleConfig {
    fn from(spec: StyleSpec) -> Self {
        Self::Static(spec)
    }
}

impl fmt::Debug for StyleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(spec) => f.debug_tuple("Static").field(spec).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Transition descriptor on its own, static or computed.
#[derive(Clone)]
pub enum TransitionConfig {
    Static(TransitionDefinition),
    Computed(Rc<dyn Fn(&ConfigArgs<'_>) -> TransitionDefinition>),
}

impl TransitionConfig {
    pub fn computed(f: impl Fn(&ConfigArgs<'_>) -> TransitionDefinition + 'static) -> Self {
        Self::Computed(Rc::new(f))
    }

    pub fn resolve(&self, path: &PathTransition, props: &Props, direction: Direction) -> TransitionDefinition {
        match self {
            Self::Static(def) => def.clone(),
            Self::Computed(f) => f(&ConfigArgs {
                props,
                path,
                direction,
            }),
        }
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self::Static(TransitionDefinition::default())
    }
}

impl From<TransitionDefinition> for TransitionConfig {
    fn from(def: TransitionDefinition) -> Self {
        Self::Static(def)
    }
}

impl fmt::Debug for TransitionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(def) => f.debug_tuple("Static").field(def).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ActionKind;
    use serde_json::json;

    #[test]
    fn test_static_config_defaults_to_tween() {
        let config = StyleConfig::from(Style::new().with("opacity", 1.0));
        let resolved = config.resolve(&PathTransition::default(), &Props::Null, Direction::In);

        assert_eq!(resolved.style, Style::new().with("opacity", 1.0));
        assert_eq!(resolved.transition.kind, ActionKind::Tween);
        assert_eq!(resolved.transition.delay_ms, 0.0);
    }

    #[test]
    fn test_computed_config_sees_props_and_direction() {
        let config = StyleConfig::computed(|args| {
            let offset = args.props["offset"].as_f64().unwrap_or(0.0);
            let x = match args.direction {
                Direction::In => -offset,
                Direction::Out => offset,
            };
            StyleSpec::new(Style::new().with("x", x)).with_transition(TransitionDefinition::spring())
        });
        let props = json!({ "offset": 40 });
        let path = PathTransition::new(Some("one"), Some("two"));

        let inbound = config.resolve(&path, &props, Direction::In);
        let outbound = config.resolve(&path, &props, Direction::Out);
        assert_eq!(inbound.style.get("x").and_then(|v| v.as_number()), Some(-40.0));
        assert_eq!(outbound.style.get("x").and_then(|v| v.as_number()), Some(40.0));
        assert_eq!(outbound.transition.kind, ActionKind::Spring);
    }

    #[test]
    fn test_spec_from_toml() {
        let spec: StyleSpec = toml::from_str(
            r#"
            style = { opacity = 0 }
            transition = { type = "tween", duration_ms = 120.0 }
            "#,
        )
        .unwrap();
        assert_eq!(spec.style.get("opacity").and_then(|v| v.as_number()), Some(0.0));
        assert_eq!(spec.transition.and_then(|t| t.duration_ms), Some(120.0));
    }
}
