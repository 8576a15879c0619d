/// Collapsing and restoring the chat list
///
/// Collapsing sets overrides; showing removes them rather than writing
/// "natural" values, so the host page's own layout rules take over again.

use crate::config::FocusConfig;
use crate::host::Dom;
use crate::locator::Locator;

const COLLAPSE_TRANSITION: &str = "flex 0.4s cubic-bezier(0.4, 0, 0.2, 1), \
    width 0.4s cubic-bezier(0.4, 0, 0.2, 1), \
    min-width 0.4s cubic-bezier(0.4, 0, 0.2, 1), \
    max-width 0.4s cubic-bezier(0.4, 0, 0.2, 1)";
const COLLAPSED_FLEX: &str = "0 0 0%";
const FADE_TRANSITION: &str = "opacity 0.3s ease, visibility 0.3s ease";

const CONTAINER_OVERRIDES: [&str; 4] = ["flex", "width", "min-width", "max-width"];
const SIDEBAR_OVERRIDES: [&str; 4] = ["opacity", "visibility", "pointer-events", "display"];

/// Result of one `apply` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    /// Something on the page was found and brought to the desired state
    pub applied: bool,
    /// Containers are collapsing and the sidebar itself still has to be
    /// hidden once the animation settles
    pub sidebar_hide_due: bool,
}

pub struct VisualState<'a, D: Dom> {
    dom: &'a D,
    config: &'a FocusConfig,
}

impl<'a, D: Dom> VisualState<'a, D> {
    pub fn new(dom: &'a D, config: &'a FocusConfig) -> Self {
        VisualState { dom, config }
    }

    /// Bring `sidebar` and `containers` to the desired visibility. Calling
    /// it again with the same arguments changes nothing.
    pub fn apply(
        &self,
        visible: bool,
        sidebar: Option<&D::Node>,
        containers: &[D::Node],
    ) -> Applied {
        if containers.is_empty() {
            if let Some(sidebar) = sidebar {
                self.dom
                    .set_style(sidebar, "display", if visible { "" } else { "none" });
            }
            return Applied {
                applied: sidebar.is_some(),
                sidebar_hide_due: false,
            };
        }

        if visible {
            self.expand(sidebar, containers);
            Applied {
                applied: true,
                sidebar_hide_due: false,
            }
        } else {
            self.collapse(containers);
            Applied {
                applied: true,
                sidebar_hide_due: sidebar.is_some_and(|s| !self.is_sidebar_hidden(s)),
            }
        }
    }

    fn expand(&self, sidebar: Option<&D::Node>, containers: &[D::Node]) {
        let classes = &self.config.classes;
        if let Some(body) = self.dom.body() {
            self.dom.remove_class(&body, &classes.body_active);
        }
        if let Some(sidebar) = sidebar {
            self.clear_sidebar(sidebar);
        }
        for container in containers {
            self.clear_container(container);
        }
        self.mark_navigation();
    }

    fn collapse(&self, containers: &[D::Node]) {
        let classes = &self.config.classes;
        if let Some(body) = self.dom.body() {
            self.dom.add_class(&body, &classes.body_active);
        }
        for container in containers {
            if self.dom.has_class(container, &classes.collapsed)
                && self.dom.style(container, "flex") == COLLAPSED_FLEX
            {
                continue;
            }
            self.dom.set_style(container, "transition", COLLAPSE_TRANSITION);
            self.dom.force_reflow(container);
            self.dom.add_class(container, &classes.collapsed);
            self.dom.set_style(container, "flex", COLLAPSED_FLEX);
        }
        self.mark_navigation();
    }

    /// Second half of a collapse: take the sidebar out of view and out of
    /// the interaction surface.
    pub fn hide_sidebar(&self, sidebar: &D::Node) {
        self.dom.set_style(sidebar, "transition", FADE_TRANSITION);
        self.dom.set_style(sidebar, "opacity", "0");
        self.dom.set_style(sidebar, "visibility", "hidden");
        self.dom.set_style(sidebar, "pointer-events", "none");
    }

    pub fn is_sidebar_hidden(&self, sidebar: &D::Node) -> bool {
        self.dom.style(sidebar, "visibility") == "hidden"
            && self.dom.style(sidebar, "opacity") == "0"
    }

    /// Remove every override from every layout container, navigation rail
    /// included, and from the sidebar.
    pub fn reset(&self, sidebar: Option<&D::Node>) {
        if let Some(body) = self.dom.body() {
            self.dom.remove_class(&body, &self.config.classes.body_active);
        }
        for container in Locator::new(self.dom, self.config).layout_containers() {
            self.clear_container(&container);
        }
        if let Some(sidebar) = sidebar {
            self.clear_sidebar(sidebar);
        }
        self.mark_navigation();
    }

    /// Tag navigation containers so stylesheet rules can keep them on top
    pub fn mark_navigation(&self) {
        let locator = Locator::new(self.dom, self.config);
        let navbar = &self.config.classes.navbar;
        for container in locator.layout_containers() {
            if locator.is_navigation_bar(&container) {
                self.dom.add_class(&container, navbar);
                let header = self
                    .dom
                    .query(Some(&container), &self.config.selectors.nav_header);
                if let Some(header) = header {
                    self.dom.set_style(&header, "z-index", "999");
                    self.dom.set_style(&header, "position", "relative");
                }
            } else {
                self.dom.remove_class(&container, navbar);
            }
        }
    }

    fn clear_container(&self, container: &D::Node) {
        for property in CONTAINER_OVERRIDES {
            self.dom.remove_style(container, property);
        }
        self.dom.remove_class(container, &self.config.classes.collapsed);
    }

    fn clear_sidebar(&self, sidebar: &D::Node) {
        for property in SIDEBAR_OVERRIDES {
            self.dom.remove_style(sidebar, property);
        }
    }
}
