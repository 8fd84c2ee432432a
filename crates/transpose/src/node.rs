//! Host node abstraction.
//!
//! The renderer owns real nodes; the transition engine only needs to push a
//! flat style map onto a node, read a resolved style value back, and measure
//! the node's screen box. [`MemoryNode`] is an in-memory implementation used
//! by headless hosts and tests.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::geometry::Rect;
use crate::style::{Style, StyleValue};

/// Style application surface of a rendered node.
pub trait StyleTarget {
    /// Apply every entry of `style` synchronously.
    fn apply(&self, style: &Style);

    /// Reset a key to the host default.
    fn remove(&self, key: &str);

    /// Read the current resolved value of `key`.
    fn read(&self, key: &str) -> Option<StyleValue>;

    /// Screen-space box of the node, including any applied translation.
    fn bounding_rect(&self) -> Rect;
}

/// Live handle to a rendered node.
pub type NodeRef = Rc<dyn StyleTarget>;

/// Non-owning handle, used by lookup tables.
pub type WeakNodeRef = Weak<dyn StyleTarget>;

/// In-memory node with a layout box and an inline style.
///
/// `x`/`y` style values translate the layout box and `width`/`height`
/// override its size, mirroring how a transformed DOM node reports its
/// bounding rect.
#[derive(Debug, Default)]
pub struct MemoryNode {
    label: String,
    layout: RefCell<Rect>,
    style: RefCell<Style>,
}

impl MemoryNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_layout(self, layout: Rect) -> Self {
        *self.layout.borrow_mut() = layout;
        self
    }

    pub fn with_style(self, style: Style) -> Self {
        *self.style.borrow_mut() = style;
        self
    }

    /// Wrap into a shared node handle.
    pub fn into_ref(self) -> NodeRef {
        Rc::new(self)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Move the node's layout box (what a re-layout would do).
    pub fn set_layout(&self, layout: Rect) {
        *self.layout.borrow_mut() = layout;
    }

    /// Snapshot of the inline style.
    pub fn style(&self) -> Style {
        self.style.borrow().clone()
    }
}

impl StyleTarget for MemoryNode {
    fn apply(&self, style: &Style) {
        self.style.borrow_mut().merge(style);
    }

    fn remove(&self, key: &str) {
        self.style.borrow_mut().remove(key);
    }

    fn read(&self, key: &str) -> Option<StyleValue> {
        self.style.borrow().get(key).cloned()
    }

    fn bounding_rect(&self) -> Rect {
        let layout = *self.layout.borrow();
        let style = self.style.borrow();
        let number = |key: &str| style.get(key).and_then(StyleValue::as_number);

        Rect {
            x: layout.x + number("x").unwrap_or(0.0),
            y: layout.y + number("y").unwrap_or(0.0),
            width: number("width").unwrap_or(layout.width),
            height: number("height").unwrap_or(layout.height),
        }
    }
}
