//! Screen boxes and shared-element box diffing.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::node::StyleTarget;
use crate::style::{Style, StyleValue};

/// Style keys that are derived from an element's box instead of its style.
pub const BOX_KEYS: [&str; 4] = ["x", "y", "width", "height"];

/// Whether `key` is one of [`BOX_KEYS`].
pub fn is_box_key(key: &str) -> bool {
    BOX_KEYS.contains(&key)
}

/// Axis-aligned screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Offset and size of an element relative to another element's box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxInfo {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxInfo {
    /// No offset at the given size.
    pub fn identity(width: f64, height: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    /// Value for a box key, `None` for any other key.
    pub fn value(&self, key: &str) -> Option<f64> {
        match key {
            "x" => Some(self.x),
            "y" => Some(self.y),
            "width" => Some(self.width),
            "height" => Some(self.height),
            _ => None,
        }
    }
}

/// Result of diffing two screen boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxDiff {
    /// Outgoing box expressed relative to the incoming one.
    pub from: BoxInfo,
    /// Incoming box: always no offset, since the new element already sits at
    /// its final position.
    pub to: BoxInfo,
}

/// Diff the outgoing element's box against the incoming element's box.
pub fn box_difference(from: &Rect, to: &Rect) -> BoxDiff {
    BoxDiff {
        from: BoxInfo {
            x: from.x - to.x,
            y: from.y - to.y,
            width: from.width,
            height: from.height,
        },
        to: BoxInfo::identity(to.width, to.height),
    }
}

/// Build a style for `keys`, taking box keys from `info` and every other key
/// from the node's live style.
pub fn style_for_box(node: &dyn StyleTarget, info: &BoxInfo, keys: &[String]) -> Style {
    let mut style = Style::new();
    for key in keys {
        if let Some(value) = info.value(key) {
            style.set(key.clone(), StyleValue::Number(value));
        } else if let Some(value) = node.read(key) {
            style.set(key.clone(), value);
        } else {
            warn!(property = %key, "shared element has no value for animated property");
        }
    }
    style
}

/// Styles for a shared-element transition between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedStyles {
    pub from: Style,
    pub to: Style,
}

/// Diff two nodes and build the from/to styles for `keys`.
pub fn shared_styles(from: &dyn StyleTarget, to: &dyn StyleTarget, keys: &[String]) -> SharedStyles {
    let diff = box_difference(&from.bounding_rect(), &to.bounding_rect());
    SharedStyles {
        from: style_for_box(from, &diff.from, keys),
        to: style_for_box(to, &diff.to, keys),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::MemoryNode;

    #[test]
    fn test_box_difference_is_relative_to_target() {
        let from = Rect::new(10.0, 20.0, 100.0, 100.0);
        let to = Rect::new(400.0, 32.0, 300.0, 200.0);

        let diff = box_difference(&from, &to);
        assert_eq!(diff.from, BoxInfo { x: -390.0, y: -12.0, width: 100.0, height: 100.0 });
        assert_eq!(diff.to, BoxInfo::identity(300.0, 200.0));
    }

    #[test]
    fn test_identical_boxes_diff_to_identity() {
        let rect = Rect::new(5.0, 5.0, 10.0, 10.0);
        let diff = box_difference(&rect, &rect);
        assert_eq!(diff.from, diff.to);
    }

    #[test]
    fn test_shared_styles_mix_box_and_style_keys() {
        let from = MemoryNode::new("a")
            .with_layout(Rect::new(0.0, 0.0, 10.0, 10.0))
            .with_style(Style::new().with("backgroundColor", "red"));
        let to = MemoryNode::new("b")
            .with_layout(Rect::new(50.0, 60.0, 20.0, 30.0))
            .with_style(Style::new().with("backgroundColor", "blue"));
        let keys: Vec<String> = ["x", "y", "width", "backgroundColor"]
            .into_iter()
            .map(String::from)
            .collect();

        let styles = shared_styles(&from, &to, &keys);
        assert_eq!(
            styles.from,
            Style::new()
                .with("x", -50.0)
                .with("y", -60.0)
                .with("width", 10.0)
                .with("backgroundColor", "red")
        );
        assert_eq!(
            styles.to,
            Style::new()
                .with("x", 0.0)
                .with("y", 0.0)
                .with("width", 20.0)
                .with("backgroundColor", "blue")
        );
    }
}
