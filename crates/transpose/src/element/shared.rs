//! Shared-element behaviour.
//!
//! An element published under a shared key animates from the box of its
//! counterpart on the route being left (same key, registered under
//! `path.from`) to its own box. Box keys (`x`, `y`, `width`, `height`) come
//! from [`box_difference`](crate::geometry::box_difference); any other
//! animated key is read from the two nodes.

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::config::{Direction, Props, TransitionConfig};
use crate::engine::ActionRequest;
use crate::geometry::{BoxInfo, shared_styles, style_for_box};
use crate::style::Style;

use super::{Transposed, TransitionArgs, TransitionBehavior};

/// Key an element is shared under.
#[derive(Clone)]
pub enum SharedKey {
    Static(String),
    FromProps(Rc<dyn Fn(&Props) -> String>),
}

impl SharedKey {
    pub fn from_props(f: impl Fn(&Props) -> String + 'static) -> Self {
        Self::FromProps(Rc::new(f))
    }

    pub fn resolve(&self, props: &Props) -> String {
        match self {
            Self::Static(key) => key.clone(),
            Self::FromProps(f) => f(props),
        }
    }
}

impl From<&str> for SharedKey {
    fn from(key: &str) -> Self {
        Self::Static(key.to_string())
    }
}

impl From<String> for SharedKey {
    fn from(key: String) -> Self {
        Self::Static(key)
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(key) => f.debug_tuple("Static").field(key).finish(),
            Self::FromProps(_) => f.write_str("FromProps(..)"),
        }
    }
}

/// Box animation between elements sharing a key across routes.
#[derive(Debug, Clone)]
pub struct TransposedShared {
    pub shared_key: SharedKey,
    /// Keys to animate; box keys are derived from the element boxes.
    pub animation_props: Vec<String>,
    pub transition: TransitionConfig,
    /// Enter/exit styles used when there is no counterpart.
    pub when_not_shared: Option<Transposed>,
}

impl TransposedShared {
    pub fn new<I, S>(shared_key: impl Into<SharedKey>, animation_props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shared_key: shared_key.into(),
            animation_props: animation_props.into_iter().map(Into::into).collect(),
            transition: TransitionConfig::default(),
            when_not_shared: None,
        }
    }

    pub fn with_transition(mut self, transition: impl Into<TransitionConfig>) -> Self {
        self.transition = transition.into();
        self
    }

    pub fn when_not_shared(mut self, fallback: Transposed) -> Self {
        self.when_not_shared = Some(fallback);
        self
    }

    fn animates_first(&self, args: &TransitionArgs<'_>) -> bool {
        args.context.animate_first()
            || self
                .when_not_shared
                .as_ref()
                .is_some_and(|fallback| fallback.animated_first)
    }
}

impl TransitionBehavior for TransposedShared {
    fn shared_key(&self, props: &Props) -> Option<String> {
        Some(self.shared_key.resolve(props))
    }

    fn enter(&self, args: TransitionArgs<'_>) -> Option<ActionRequest> {
        let to = args.elements.to.clone();

        if args.context.is_first() && !self.animates_first(&args) {
            // Remember the resting box in case this route re-enters later.
            if let Some(path_to) = args.path.to.clone() {
                let rect = to.bounding_rect();
                let resting = style_for_box(
                    &*to,
                    &BoxInfo::identity(rect.width, rect.height),
                    &self.animation_props,
                );
                args.cache.insert(path_to, resting);
            }
            return None;
        }

        if let Some(from) = &args.elements.from {
            let transition = self.transition.resolve(args.path, args.props, Direction::In);
            let styles = shared_styles(&**from, &*to, &self.animation_props);
            if let Some(path_to) = args.path.to.clone() {
                args.cache.insert(path_to, styles.to.clone());
            }

            trace!(
                route = %args.context.route(),
                from = ?args.path.from,
                "shared element entering"
            );
            to.apply(&styles.from);
            return Some(ActionRequest::new(styles.from, styles.to, transition));
        }

        self.when_not_shared
            .as_ref()
            .map(|fallback| fallback.enter_request(args.path, args.props, &*to))
    }

    fn exit(&self, args: TransitionArgs<'_>) -> Option<ActionRequest> {
        self.when_not_shared
            .as_ref()
            .map(|fallback| fallback.exit_request(args.path, args.props, args.was_entering))
    }

    fn re_enter(&self, args: TransitionArgs<'_>) -> Option<ActionRequest> {
        let to = &args.elements.to;

        let Some(from) = &args.elements.from else {
            return self
                .when_not_shared
                .as_ref()
                .map(|fallback| fallback.re_enter_request(args.path, args.props, &**to));
        };

        let mut transition = self.transition.resolve(args.path, args.props, Direction::In);
        transition.delay_ms = 0.0;

        let (fallback_from, fallback_to) = match &self.when_not_shared {
            Some(fallback) => {
                let (from, to, _) = fallback.re_enter_styles(args.path, args.props, &**to);
                (from, to)
            }
            None => (Style::new(), Style::new()),
        };

        let styles = shared_styles(&**from, &**to, &self.animation_props);
        let resting = args
            .path
            .to
            .as_deref()
            .and_then(|path_to| args.cache.get(path_to))
            .unwrap_or(&styles.to);

        Some(ActionRequest::new(
            fallback_from.merged(&styles.from),
            fallback_to.merged(resting),
            transition,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shared_key_from_props() {
        let key = SharedKey::from_props(|props| format!("item-{}", props["id"]));
        assert_eq!(key.resolve(&json!({ "id": 7 })), "item-7");
        assert_eq!(SharedKey::from("hero").resolve(&Props::Null), "hero");
    }

    #[test]
    fn test_builder_collects_props() {
        let shared = TransposedShared::new("test", ["x", "backgroundColor"]);
        assert_eq!(shared.animation_props, vec!["x".to_string(), "backgroundColor".to_string()]);
        assert!(shared.when_not_shared.is_none());
    }
}
