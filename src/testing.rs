/// In-memory page and clock for exercising the focus logic without a browser

use crate::host::{Dom, Guard, Layout, Timers};
use crate::selector::Selector;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

struct FakeNode {
    tag: String,
    attrs: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    text: String,
    rendered: Layout,
}

fn rendered_default() -> Layout {
    Layout {
        width: 48.0,
        height: 48.0,
        top: 0.0,
        left: 0.0,
        display: "block".to_string(),
        visibility: "visible".to_string(),
        opacity: "1".to_string(),
    }
}

pub struct FakeDom {
    nodes: RefCell<Vec<FakeNode>>,
    root: NodeId,
    body: NodeId,
    dirty: Cell<bool>,
    observer: RefCell<Option<Box<dyn FnMut()>>>,
    observer_alive: Rc<Cell<bool>>,
    clicks: RefCell<HashMap<NodeId, Rc<dyn Fn()>>>,
    /// Layout given to elements created by the code under test
    created_layout: RefCell<Layout>,
}

impl FakeDom {
    pub fn new() -> FakeDom {
        let dom = FakeDom {
            nodes: RefCell::new(Vec::new()),
            root: NodeId(0),
            body: NodeId(1),
            dirty: Cell::new(false),
            observer: RefCell::new(None),
            observer_alive: Rc::new(Cell::new(false)),
            clicks: RefCell::new(HashMap::new()),
            created_layout: RefCell::new(rendered_default()),
        };
        let root = dom.new_node("html");
        let body = dom.new_node("body");
        dom.attach(root, body, None);
        dom.dirty.set(false);
        dom
    }

    /// A host page shaped like the chat client: a navigation rail with four
    /// entries and a chat list column, each in its own layout container.
    pub fn chat_page() -> FakeDom {
        let dom = FakeDom::new();
        let body = dom.body;

        let app = dom.el(body, "div", &[("id", "app")]);

        let rail = dom.el(app, "div", &[("class", "x18dvir5"), ("id", "rail")]);
        dom.set_rendered(rail, |l| l.width = 64.0);
        let header = dom.el(rail, "header", &[("data-tab", "2")]);
        let row = dom.el(
            header,
            "div",
            &[("class", "x1c4vz4f xs83m0k xdl72j9 x1g77sc7 x78zum5"), ("id", "nav-row")],
        );
        let labels = ["Chats", "Status", "Channels", "Communities"];
        for (index, label) in labels.into_iter().enumerate() {
            let id = format!("nav-{}", label.to_lowercase());
            let index = index.to_string();
            let entry = dom.el(
                row,
                "div",
                &[
                    ("class", "x1c4vz4f xs83m0k xdl72j9 x100vrsf x1vqgdyp xhslqc4"),
                    ("id", id.as_str()),
                ],
            );
            let span = dom.el(entry, "span", &[]);
            dom.el(
                span,
                "button",
                &[
                    ("aria-label", label),
                    ("data-navbar-item", "true"),
                    ("data-navbar-item-index", index.as_str()),
                ],
            );
        }
        dom.el(row, "div", &[("id", "nav-settings")]);

        let column = dom.el(app, "div", &[("class", "x18dvir5"), ("id", "chat-column")]);
        dom.set_rendered(column, |l| l.width = 400.0);
        let side = dom.el(column, "div", &[("id", "side")]);
        let pane = dom.el(side, "div", &[("id", "pane-side")]);
        dom.set_rendered(pane, |l| l.width = 400.0);

        dom.el(app, "div", &[("id", "main")]);

        dom.dirty.set(false);
        dom
    }

    fn new_node(&self, tag: &str) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(FakeNode {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            style: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            text: String::new(),
            rendered: self.created_layout.borrow().clone(),
        });
        NodeId(nodes.len() - 1)
    }

    /// Append a new element with attributes under `parent`
    pub fn el(&self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let node = self.new_node(tag);
        {
            let mut nodes = self.nodes.borrow_mut();
            for (k, v) in attrs {
                nodes[node.0].attrs.insert(k.to_string(), v.to_string());
            }
            nodes[node.0].rendered = rendered_default();
        }
        self.attach(parent, node, None);
        node
    }

    pub fn set_rendered(&self, node: NodeId, f: impl FnOnce(&mut Layout)) {
        f(&mut self.nodes.borrow_mut()[node.0].rendered);
    }

    /// Layout for elements the code under test creates from now on
    pub fn set_created_layout(&self, f: impl FnOnce(&mut Layout)) {
        f(&mut self.created_layout.borrow_mut());
    }

    pub fn id(&self, id: &str) -> NodeId {
        self.element_by_id(id)
            .unwrap_or_else(|| panic!("no element #{}", id))
    }

    pub fn has(&self, id: &str) -> bool {
        self.element_by_id(id).is_some()
    }

    pub fn inline(&self, id: &str, property: &str) -> String {
        self.style(&self.id(id), property)
    }

    pub fn classes(&self, id: &str) -> String {
        self.attribute(&self.id(id), "class").unwrap_or_default()
    }

    pub fn classes_of_body(&self) -> String {
        self.attribute(&self.body, "class").unwrap_or_default()
    }

    /// Detach a node the way the host page would when re-rendering
    pub fn remove(&self, node: NodeId) {
        self.detach(node);
        self.dirty.set(true);
    }

    /// Move `node` to the end of `parent`
    pub fn move_to_end(&self, node: NodeId, parent: NodeId) {
        self.detach(node);
        self.attach(parent, node, None);
    }

    pub fn children_ids(&self, node: NodeId) -> Vec<String> {
        let nodes = self.nodes.borrow();
        nodes[node.0]
            .children
            .iter()
            .map(|c| nodes[c.0].attrs.get("id").cloned().unwrap_or_default())
            .collect()
    }

    pub fn click(&self, node: NodeId) {
        let handler = self.clicks.borrow().get(&node).cloned();
        if let Some(handler) = handler {
            handler();
        }
    }

    pub fn is_observed(&self) -> bool {
        self.observer_alive.get()
    }

    /// Deliver pending child-list mutations to the observer, once.
    /// Returns whether anything was delivered.
    pub fn flush_mutations(&self) -> bool {
        if !self.dirty.replace(false) || !self.observer_alive.get() {
            return false;
        }
        let callback = self.observer.borrow_mut().take();
        if let Some(mut callback) = callback {
            callback();
            let mut slot = self.observer.borrow_mut();
            if slot.is_none() && self.observer_alive.get() {
                *slot = Some(callback);
            }
        }
        true
    }

    /// Deliver mutations until the page stops changing
    pub fn settle(&self) -> usize {
        let mut rounds = 0;
        while self.flush_mutations() {
            rounds += 1;
            assert!(rounds < 50, "page never settled");
        }
        rounds
    }

    /// Structural dump of the attached tree, for comparing end states
    pub fn snapshot(&self) -> String {
        let mut out = String::new();
        self.dump(self.root, 0, &mut out);
        out
    }

    fn dump(&self, node: NodeId, depth: usize, out: &mut String) {
        let nodes = self.nodes.borrow();
        let n = &nodes[node.0];
        out.push_str(&"  ".repeat(depth));
        out.push_str(&n.tag);
        for (k, v) in &n.attrs {
            out.push_str(&format!(" {}={:?}", k, v));
        }
        if !n.style.is_empty() {
            out.push_str(&format!(" style={:?}", n.style));
        }
        if !n.text.is_empty() {
            out.push_str(&format!(" text={:?}", n.text));
        }
        out.push('\n');
        let children = n.children.clone();
        drop(nodes);
        for child in children {
            self.dump(child, depth + 1, out);
        }
    }

    fn attach(&self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        let mut nodes = self.nodes.borrow_mut();
        let index = before
            .and_then(|b| nodes[parent.0].children.iter().position(|c| *c == b))
            .unwrap_or(nodes[parent.0].children.len());
        nodes[parent.0].children.insert(index, child);
        nodes[child.0].parent = Some(parent);
        self.dirty.set(true);
    }

    fn detach(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[node.0].parent.take() {
            nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(node);
        while let Some(n) = current {
            if n == self.root {
                return true;
            }
            current = nodes[n.0].parent;
        }
        false
    }

    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = nodes[scope.0].children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(nodes[n.0].children.iter().rev().copied());
        }
        out
    }

    fn sibling(&self, node: NodeId, offset: isize) -> Option<NodeId> {
        let nodes = self.nodes.borrow();
        let parent = nodes[node.0].parent?;
        let siblings = &nodes[parent.0].children;
        let index = siblings.iter().position(|c| *c == node)? as isize + offset;
        if index < 0 {
            return None;
        }
        siblings.get(index as usize).copied()
    }
}

impl Dom for FakeDom {
    type Node = NodeId;

    fn body(&self) -> Option<NodeId> {
        Some(self.body)
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.nodes.borrow()[n.0].attrs.get("id").map(String::as_str) == Some(id))
    }

    fn query(&self, scope: Option<&NodeId>, selector: &Selector) -> Option<NodeId> {
        self.query_all(scope, selector).into_iter().next()
    }

    fn query_all(&self, scope: Option<&NodeId>, selector: &Selector) -> Vec<NodeId> {
        self.descendants(*scope.unwrap_or(&self.root))
            .into_iter()
            .filter(|n| self.matches(n, selector))
            .collect()
    }

    fn matches(&self, node: &NodeId, selector: &Selector) -> bool {
        let nodes = self.nodes.borrow();
        let n = &nodes[node.0];
        selector.matches(&n.tag, |name| n.attrs.get(name).cloned())
    }

    fn tag_name(&self, node: &NodeId) -> String {
        self.nodes.borrow()[node.0].tag.clone()
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes.borrow()[node.0].parent
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        self.sibling(*node, 1)
    }

    fn previous_sibling(&self, node: &NodeId) -> Option<NodeId> {
        self.sibling(*node, -1)
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.nodes.borrow()[node.0].attrs.get(name).cloned()
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) {
        self.nodes.borrow_mut()[node.0]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|c| c.split_whitespace().any(|x| x == class))
    }

    fn add_class(&self, node: &NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let current = self.attribute(node, "class").unwrap_or_default();
        let next = if current.is_empty() {
            class.to_string()
        } else {
            format!("{} {}", current, class)
        };
        self.set_attribute(node, "class", &next);
    }

    fn remove_class(&self, node: &NodeId, class: &str) {
        if let Some(current) = self.attribute(node, "class") {
            let next: Vec<&str> = current.split_whitespace().filter(|c| *c != class).collect();
            self.set_attribute(node, "class", &next.join(" "));
        }
    }

    fn style(&self, node: &NodeId, property: &str) -> String {
        self.nodes.borrow()[node.0]
            .style
            .get(property)
            .cloned()
            .unwrap_or_default()
    }

    fn set_style(&self, node: &NodeId, property: &str, value: &str) {
        let mut nodes = self.nodes.borrow_mut();
        if value.is_empty() {
            nodes[node.0].style.remove(property);
        } else {
            nodes[node.0]
                .style
                .insert(property.to_string(), value.to_string());
        }
    }

    fn remove_style(&self, node: &NodeId, property: &str) {
        self.nodes.borrow_mut()[node.0].style.remove(property);
    }

    fn layout(&self, node: &NodeId) -> Layout {
        let attached = self.is_attached(*node);
        let nodes = self.nodes.borrow();
        let n = &nodes[node.0];
        let mut layout = n.rendered.clone();
        if !attached {
            layout.width = 0.0;
            layout.height = 0.0;
        }
        let px = |p: &str| {
            n.style
                .get(p)
                .and_then(|v| v.trim_end_matches("px").parse::<f64>().ok())
        };
        if attached {
            if let Some(w) = px("min-width") {
                layout.width = layout.width.max(w);
            }
            if let Some(h) = px("min-height") {
                layout.height = layout.height.max(h);
            }
        }
        for (property, slot) in [
            ("display", &mut layout.display),
            ("visibility", &mut layout.visibility),
            ("opacity", &mut layout.opacity),
        ] {
            if let Some(v) = n.style.get(property) {
                *slot = v.clone();
            }
        }
        layout
    }

    fn force_reflow(&self, _node: &NodeId) {}

    fn create_element(&self, tag: &str) -> Option<NodeId> {
        Some(self.new_node(tag))
    }

    fn create_svg_element(&self, tag: &str) -> Option<NodeId> {
        Some(self.new_node(tag))
    }

    fn set_text(&self, node: &NodeId, text: &str) {
        self.nodes.borrow_mut()[node.0].text = text.to_string();
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) {
        self.detach(*child);
        self.attach(*parent, *child, None);
    }

    fn insert_before(&self, parent: &NodeId, child: &NodeId, reference: Option<&NodeId>) {
        self.detach(*child);
        self.attach(*parent, *child, reference.copied());
    }

    fn clear_children(&self, node: &NodeId) {
        let children = std::mem::take(&mut self.nodes.borrow_mut()[node.0].children);
        let mut nodes = self.nodes.borrow_mut();
        for child in children {
            nodes[child.0].parent = None;
        }
        self.dirty.set(true);
    }

    fn on_click(&self, node: &NodeId, handler: Rc<dyn Fn()>) {
        self.clicks.borrow_mut().insert(*node, handler);
    }

    fn observe_mutations(&self, callback: Box<dyn FnMut()>) -> Option<Guard> {
        *self.observer.borrow_mut() = Some(callback);
        self.observer_alive.set(true);
        Some(Guard::new(Disconnect(self.observer_alive.clone())))
    }
}

struct Disconnect(Rc<Cell<bool>>);

impl Drop for Disconnect {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

enum Task {
    Once(Box<dyn FnOnce()>),
    Repeat(Box<dyn FnMut()>, u32),
}

struct Scheduled {
    id: u64,
    due: f64,
    task: Task,
}

#[derive(Default)]
struct Schedule {
    now: f64,
    next_id: u64,
    queue: Vec<Scheduled>,
    cancelled: HashSet<u64>,
}

/// Virtual clock. Nothing runs until `advance` is called.
pub struct ManualTimers {
    schedule: Rc<RefCell<Schedule>>,
}

struct CancelOnDrop {
    id: u64,
    schedule: Weak<RefCell<Schedule>>,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(schedule) = self.schedule.upgrade() {
            let mut s = schedule.borrow_mut();
            let before = s.queue.len();
            s.queue.retain(|t| t.id != self.id);
            if s.queue.len() == before {
                s.cancelled.insert(self.id);
            }
        }
    }
}

impl ManualTimers {
    pub fn new() -> ManualTimers {
        ManualTimers {
            schedule: Rc::new(RefCell::new(Schedule {
                now: 1_700_000_000_000.0,
                ..Schedule::default()
            })),
        }
    }

    fn push(&self, delay_ms: u32, task: Task) -> Guard {
        let mut s = self.schedule.borrow_mut();
        let id = s.next_id;
        s.next_id += 1;
        let due = s.now + delay_ms as f64;
        s.queue.push(Scheduled { id, due, task });
        Guard::new(CancelOnDrop {
            id,
            schedule: Rc::downgrade(&self.schedule),
        })
    }

    pub fn pending(&self) -> usize {
        self.schedule.borrow().queue.len()
    }

    /// Run everything that falls due within the next `ms` milliseconds
    pub fn advance(&self, ms: u32) {
        let target = self.schedule.borrow().now + ms as f64;
        loop {
            let next = {
                let mut s = self.schedule.borrow_mut();
                let earliest = s
                    .queue
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by(|a, b| a.1.due.total_cmp(&b.1.due).then(a.1.id.cmp(&b.1.id)))
                    .map(|(i, _)| i);
                earliest.map(|i| {
                    let task = s.queue.remove(i);
                    s.now = task.due;
                    task
                })
            };
            let Some(scheduled) = next else { break };
            match scheduled.task {
                Task::Once(f) => f(),
                Task::Repeat(mut f, period) => {
                    f();
                    let mut s = self.schedule.borrow_mut();
                    if !s.cancelled.remove(&scheduled.id) {
                        let due = scheduled.due + period as f64;
                        s.queue.push(Scheduled {
                            id: scheduled.id,
                            due,
                            task: Task::Repeat(f, period),
                        });
                    }
                }
            }
        }
        self.schedule.borrow_mut().now = target;
    }
}

impl Timers for ManualTimers {
    fn now(&self) -> f64 {
        self.schedule.borrow().now
    }

    fn timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Guard {
        self.push(delay_ms, Task::Once(callback))
    }

    fn interval(&self, period_ms: u32, callback: Box<dyn FnMut()>) -> Guard {
        self.push(period_ms.max(1), Task::Repeat(callback, period_ms.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_page_shape() {
        let dom = FakeDom::chat_page();
        assert!(dom.has("pane-side"));
        assert_eq!(
            dom.children_ids(dom.id("nav-row")),
            vec!["nav-chats", "nav-status", "nav-channels", "nav-communities", "nav-settings"]
        );
    }

    #[test]
    fn test_timeouts_fire_in_order_and_cancel_on_drop() {
        let timers = ManualTimers::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        let _a = timers.timeout(200, Box::new(move || l.borrow_mut().push("a")));
        let l = log.clone();
        let b = timers.timeout(100, Box::new(move || l.borrow_mut().push("b")));
        let l = log.clone();
        let c = timers.timeout(150, Box::new(move || l.borrow_mut().push("c")));
        drop(c);

        timers.advance(250);
        assert_eq!(*log.borrow(), vec!["b", "a"]);
        drop(b);
    }

    #[test]
    fn test_interval_repeats_until_dropped() {
        let timers = ManualTimers::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let guard = timers.interval(100, Box::new(move || c.set(c.get() + 1)));

        timers.advance(350);
        assert_eq!(count.get(), 3);

        drop(guard);
        timers.advance(500);
        assert_eq!(count.get(), 3);
    }
}
