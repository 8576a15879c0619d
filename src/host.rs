/// Seams between the focus logic and the page it runs in
///
/// The host document is treated as an untyped, externally mutated data
/// source. Nothing returned from a `Dom` is meant to be kept across
/// reconciliation passes: every pass looks things up again.

use crate::selector::Selector;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Keeps a timer, listener or observer alive. Dropping it cancels.
pub struct Guard(#[allow(dead_code)] Box<dyn Any>);

impl Guard {
    pub fn new<T: 'static>(inner: T) -> Guard {
        Guard(Box::new(inner))
    }

    /// Keep the inner resource alive for the rest of the page's life
    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard")
    }
}

/// Rendered geometry and computed visibility of one element
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub width: f64,
    pub height: f64,
    pub top: f64,
    pub left: f64,
    pub display: String,
    pub visibility: String,
    pub opacity: String,
}

impl Layout {
    /// On screen, with a non-zero box and not hidden by computed style
    pub fn is_visible(&self) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.top >= 0.0
            && self.left >= 0.0
            && self.display != "none"
            && self.visibility != "hidden"
    }

    /// Collapsed or faded out in any of the ways focus mode hides things
    pub fn is_hidden(&self) -> bool {
        self.visibility == "hidden"
            || self.opacity == "0"
            || self.display == "none"
            || self.width == 0.0
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            width: 0.0,
            height: 0.0,
            top: 0.0,
            left: 0.0,
            display: String::new(),
            visibility: "visible".to_string(),
            opacity: "1".to_string(),
        }
    }
}

pub trait Dom {
    type Node: Clone + PartialEq + fmt::Debug;

    fn body(&self) -> Option<Self::Node>;
    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// First element under `scope` (the whole document when `None`) matching `selector`
    fn query(&self, scope: Option<&Self::Node>, selector: &Selector) -> Option<Self::Node>;
    fn query_all(&self, scope: Option<&Self::Node>, selector: &Selector) -> Vec<Self::Node>;
    fn matches(&self, node: &Self::Node, selector: &Selector) -> bool;

    /// Lower-case tag name
    fn tag_name(&self, node: &Self::Node) -> String;
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
    fn previous_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;
    fn add_class(&self, node: &Self::Node, class: &str);
    fn remove_class(&self, node: &Self::Node, class: &str);

    /// Inline style value, empty when unset
    fn style(&self, node: &Self::Node, property: &str) -> String;
    fn set_style(&self, node: &Self::Node, property: &str, value: &str);
    fn remove_style(&self, node: &Self::Node, property: &str);

    fn layout(&self, node: &Self::Node) -> Layout;
    /// Flush pending style so a following change animates from the current value
    fn force_reflow(&self, node: &Self::Node);

    fn create_element(&self, tag: &str) -> Option<Self::Node>;
    fn create_svg_element(&self, tag: &str) -> Option<Self::Node>;
    fn set_text(&self, node: &Self::Node, text: &str);
    fn append_child(&self, parent: &Self::Node, child: &Self::Node);
    /// Insert `child` into `parent` before `reference`, or at the end
    fn insert_before(
        &self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: Option<&Self::Node>,
    );
    fn clear_children(&self, node: &Self::Node);

    fn on_click(&self, node: &Self::Node, handler: Rc<dyn Fn()>);

    /// Call `callback` on any child-list change anywhere under `<body>`
    fn observe_mutations(&self, callback: Box<dyn FnMut()>) -> Option<Guard>;
}

/// Insert `node` directly after `reference`. False when `reference` is detached.
pub fn insert_after<D: Dom + ?Sized>(dom: &D, node: &D::Node, reference: &D::Node) -> bool {
    match dom.parent(reference) {
        Some(parent) => {
            let next = dom.next_sibling(reference);
            dom.insert_before(&parent, node, next.as_ref());
            true
        }
        None => false,
    }
}

pub trait Timers {
    /// Milliseconds since the epoch
    fn now(&self) -> f64;
    fn timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Guard;
    fn interval(&self, period_ms: u32, callback: Box<dyn FnMut()>) -> Guard;
}
