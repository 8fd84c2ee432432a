//! Enter/exit style behaviour.

use crate::config::{Direction, Props, StyleConfig};
use crate::context::PathTransition;
use crate::engine::{ActionRequest, TransitionDefinition};
use crate::node::StyleTarget;
use crate::style::Style;

use super::{TransitionArgs, TransitionBehavior};

/// Animates between an enter style and an exit style.
///
/// Entering elements start from the exit style (resolved for
/// [`Direction::In`]) and animate to the enter style. Leaving elements
/// animate from the enter style to the exit style (both resolved for
/// [`Direction::Out`]). A cancelled leave animates from wherever the node
/// currently is back to the enter style.
#[derive(Debug, Clone)]
pub struct Transposed {
    pub enter: StyleConfig,
    pub exit: StyleConfig,
    /// Animate the stage's first render instead of applying the enter style.
    pub animated_first: bool,
}

impl Transposed {
    pub fn new(enter: impl Into<StyleConfig>, exit: impl Into<StyleConfig>) -> Self {
        Self {
            enter: enter.into(),
            exit: exit.into(),
            animated_first: false,
        }
    }

    pub fn animated_first(mut self, animated_first: bool) -> Self {
        self.animated_first = animated_first;
        self
    }

    /// Apply the initial style and build the enter action.
    pub(crate) fn enter_request(
        &self,
        path: &PathTransition,
        props: &Props,
        node: &dyn StyleTarget,
    ) -> ActionRequest {
        let enter = self.enter.resolve(path, props, Direction::In);
        let initial = self.exit.resolve(path, props, Direction::In);

        node.apply(&initial.style);
        ActionRequest::new(initial.style, enter.style, enter.transition)
    }

    pub(crate) fn exit_request(
        &self,
        path: &PathTransition,
        props: &Props,
        was_entering: bool,
    ) -> ActionRequest {
        let enter = self.enter.resolve(path, props, Direction::Out);
        let exit = self.exit.resolve(path, props, Direction::Out);

        let mut transition = exit.transition;
        if was_entering {
            transition.delay_ms = 0.0;
        }
        ActionRequest::new(enter.style, exit.style, transition)
    }

    /// Live node values for the enter keys, and the enter style itself.
    pub(crate) fn re_enter_styles(
        &self,
        path: &PathTransition,
        props: &Props,
        node: &dyn StyleTarget,
    ) -> (Style, Style, TransitionDefinition) {
        let enter = self.enter.resolve(path, props, Direction::Out);
        let from = enter
            .style
            .iter()
            .map(|(key, target)| (key, node.read(key).unwrap_or_else(|| target.clone())))
            .collect();

        let mut transition = enter.transition;
        transition.delay_ms = 0.0;
        (from, enter.style, transition)
    }

    pub(crate) fn re_enter_request(
        &self,
        path: &PathTransition,
        props: &Props,
        node: &dyn StyleTarget,
    ) -> ActionRequest {
        let (from, to, transition) = self.re_enter_styles(path, props, node);
        ActionRequest::new(from, to, transition)
    }
}

impl TransitionBehavior for Transposed {
    fn enter(&self, args: TransitionArgs<'_>) -> Option<ActionRequest> {
        let ctx = args.context;
        if ctx.is_first() && !(self.animated_first || ctx.animate_first()) {
            let enter = self.enter.resolve(args.path, args.props, Direction::In);
            args.elements.to.apply(&enter.style);
            return None;
        }

        Some(self.enter_request(args.path, args.props, &*args.elements.to))
    }

    fn exit(&self, args: TransitionArgs<'_>) -> Option<ActionRequest> {
        Some(self.exit_request(args.path, args.props, args.was_entering))
    }

    fn re_enter(&self, args: TransitionArgs<'_>) -> Option<ActionRequest> {
        Some(self.re_enter_request(args.path, args.props, &*args.elements.to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleSpec;
    use crate::node::MemoryNode;
    use crate::style::StyleValue;

    fn fade() -> Transposed {
        Transposed::new(
            Style::new().with("opacity", 1.0),
            StyleSpec::new(Style::new().with("opacity", 0.0))
                .with_transition(TransitionDefinition::tween().with_delay(80.0)),
        )
    }

    #[test]
    fn test_enter_request_applies_initial_style() {
        let node = MemoryNode::new("n");
        let path = PathTransition::new(Some("a"), Some("b"));
        let request = fade().enter_request(&path, &Props::Null, &node);

        assert_eq!(node.read("opacity"), Some(StyleValue::Number(0.0)));
        assert_eq!(request.from, Style::new().with("opacity", 0.0));
        assert_eq!(request.to, Style::new().with("opacity", 1.0));
    }

    #[test]
    fn test_exit_delay_skipped_when_interrupting_enter() {
        let path = PathTransition::new(Some("b"), Some("c"));
        let calm = fade().exit_request(&path, &Props::Null, false);
        let hurried = fade().exit_request(&path, &Props::Null, true);

        assert_eq!(calm.transition.delay_ms, 80.0);
        assert_eq!(hurried.transition.delay_ms, 0.0);
        assert_eq!(hurried.to, Style::new().with("opacity", 0.0));
    }

    #[test]
    fn test_re_enter_starts_from_live_values() {
        let node = MemoryNode::new("n").with_style(Style::new().with("opacity", 0.4));
        let path = PathTransition::new(Some("c"), Some("b"));
        let request = fade().re_enter_request(&path, &Props::Null, &node);

        assert_eq!(request.from, Style::new().with("opacity", 0.4));
        assert_eq!(request.to, Style::new().with("opacity", 1.0));
        assert_eq!(request.transition.delay_ms, 0.0);
    }
}
