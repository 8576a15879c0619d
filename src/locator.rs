/// Finding the chat list, the navigation anchor and the layout containers
///
/// Every lookup starts from the live document. Absence is a normal answer:
/// the host page renders in many states, so misses come back as
/// `FocusError::NotFound` and the caller decides whether to retry.

use crate::config::FocusConfig;
use crate::error::{FocusError, Result};
use crate::host::Dom;
use crate::selector::Selector;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    ChatSidebar,
    /// The navigation entry the toggle button is inserted after
    NavigationAnchor,
    CollapsibleContainers,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::ChatSidebar => "chat sidebar",
            Role::NavigationAnchor => "navigation anchor",
            Role::CollapsibleContainers => "collapsible containers",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Located<N> {
    Element(N),
    Set(Vec<N>),
}

pub struct Locator<'a, D: Dom> {
    dom: &'a D,
    config: &'a FocusConfig,
}

impl<'a, D: Dom> Locator<'a, D> {
    pub fn new(dom: &'a D, config: &'a FocusConfig) -> Self {
        Locator { dom, config }
    }

    pub fn locate(&self, role: Role) -> Result<Located<D::Node>> {
        match role {
            Role::ChatSidebar => self.chat_sidebar().map(Located::Element),
            Role::NavigationAnchor => self.navigation_anchor().map(Located::Element),
            Role::CollapsibleContainers => {
                let set = self.collapsible_containers();
                if set.is_empty() {
                    Err(FocusError::NotFound(role))
                } else {
                    Ok(Located::Set(set))
                }
            }
        }
    }

    pub fn chat_sidebar(&self) -> Result<D::Node> {
        self.first_match(&self.config.selectors.chat_sidebar)
            .ok_or(FocusError::NotFound(Role::ChatSidebar))
    }

    /// Strategies in order: anchor button by label, anchor button by
    /// navigation index, then the first entry of the navigation row.
    pub fn navigation_anchor(&self) -> Result<D::Node> {
        let selectors = &self.config.selectors;

        let button = self
            .first_match(&selectors.anchor_buttons)
            .or_else(|| self.navbar_item_at(&selectors.anchor_item_index));

        if let Some(anchor) = button.and_then(|b| self.entry_container(&b)) {
            return Ok(anchor);
        }

        self.structural_anchor()
            .ok_or(FocusError::NotFound(Role::NavigationAnchor))
    }

    /// All layout containers, navigation rail included
    pub fn layout_containers(&self) -> Vec<D::Node> {
        self.dom
            .query_all(None, &self.config.selectors.layout_container)
    }

    /// Layout containers that may be collapsed: everything but the navigation rail
    pub fn collapsible_containers(&self) -> Vec<D::Node> {
        self.layout_containers()
            .into_iter()
            .filter(|c| !self.is_navigation_bar(c))
            .collect()
    }

    pub fn toggle_button(&self) -> Option<D::Node> {
        self.dom.element_by_id(&self.config.ids.toggle_button)
    }

    pub fn toggle_container(&self) -> Option<D::Node> {
        self.dom.element_by_id(&self.config.ids.toggle_container)
    }

    /// Whether `container` holds the always-visible navigation rail
    pub fn is_navigation_bar(&self, container: &D::Node) -> bool {
        let selectors = &self.config.selectors;
        let nav = &self.config.nav;
        let dom = self.dom;

        let header = dom.query(Some(container), &selectors.nav_header);
        if let Some(header) = &header {
            let in_header = dom.query_all(Some(header), &selectors.navbar_item).len();
            if in_header >= nav.header_button_min {
                return true;
            }
        }

        let buttons = dom.query_all(Some(container), &selectors.navbar_item).len();

        let holds_toggle = self
            .toggle_button()
            .is_some_and(|toggle| self.contains(container, &toggle));
        if holds_toggle && (buttons >= nav.toggle_button_min || header.is_some()) {
            return true;
        }

        if buttons >= nav.container_button_min {
            return true;
        }

        let aria_labels: Vec<String> = dom
            .query_all(Some(container), &selectors.labelled_button)
            .iter()
            .filter_map(|b| dom.attribute(b, "aria-label"))
            .collect();
        let found_labels = nav
            .labels
            .iter()
            .filter(|label| aria_labels.iter().any(|aria| aria.contains(label.as_str())))
            .count();
        if found_labels >= nav.label_min {
            return true;
        }

        let width = dom.layout(container).width;
        if width > 0.0 && width < nav.narrow_width_px {
            if header.is_some() || buttons >= nav.narrow_button_min {
                return true;
            }
        }

        false
    }

    fn first_match(&self, selectors: &[Selector]) -> Option<D::Node> {
        selectors.iter().find_map(|s| self.dom.query(None, s))
    }

    fn navbar_item_at(&self, index: &str) -> Option<D::Node> {
        self.dom
            .query_all(None, &self.config.selectors.navbar_item)
            .into_iter()
            .find(|b| self.dom.attribute(b, "data-navbar-item-index").as_deref() == Some(index))
    }

    /// Walk up from a navigation button to the wrapper of its entry,
    /// stopping at the boundary tag.
    fn entry_container(&self, button: &D::Node) -> Option<D::Node> {
        let selectors = &self.config.selectors;
        let mut current = self.dom.parent(button).and_then(|p| self.dom.parent(&p));
        while let Some(node) = current {
            if self.dom.tag_name(&node) == selectors.anchor_boundary_tag {
                return None;
            }
            if self.dom.matches(&node, &selectors.anchor_container) {
                return Some(node);
            }
            current = self.dom.parent(&node);
        }
        None
    }

    fn structural_anchor(&self) -> Option<D::Node> {
        let selectors = &self.config.selectors;
        let header = self.dom.query(None, &selectors.fallback_header)?;
        let row = self.dom.query(Some(&header), &selectors.fallback_nav_row)?;
        let own = self.toggle_container();
        self.dom
            .query_all(Some(&row), &selectors.fallback_anchor)
            .into_iter()
            .find(|entry| Some(entry) != own.as_ref())
    }

    fn contains(&self, ancestor: &D::Node, node: &D::Node) -> bool {
        let mut current = self.dom.parent(node);
        while let Some(n) = current {
            if &n == ancestor {
                return true;
            }
            current = self.dom.parent(&n);
        }
        false
    }
}
