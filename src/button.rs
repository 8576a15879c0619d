/// The toggle button in the navigation rail, and the floating indicator

use crate::config::FocusConfig;
use crate::error::{FocusError, Result};
use crate::host::{Dom, insert_after};
use crate::locator::{Locator, Role};
use crate::selector::Selector;
use lazy_static::lazy_static;
use std::rc::Rc;

// Host utility classes copied from a native navigation entry so the button
// inherits the rail's look.
const CONTAINER_CLASSES: &str = "x1c4vz4f xs83m0k xdl72j9 x1g77sc7 x78zum5 xozqiw3 x1oa3qoh \
    x12fk4p8 xeuugli x2lwn1j x1nhvcw1 x1q0g3np x1cy8zhl x100vrsf x1vqgdyp xhslqc4 x1ekkm8c \
    x1143rjc xum4auv xj21bgg x1277o0a x13i9f1t xr9ek0c xjpr12u";
const SPAN_CLASSES: &str = "html-span xdj266r x14z9mp xat24cr x1lziwak xexx8yu xyri2b x18d9i69 \
    x1c1uobl x1hl2dhg x16tdsg8 x1vvkbs x4k7w5x x1h91t0o x1h9r5lt x1jfb8zj xv2umb2 x1beo9mf \
    xaigb6o x12ejxvf x3igimt xarpa2k xedcshv x1lytzrv x1t2pt76 x7ja8zs x1qrby5j";
const BUTTON_CLASSES: &str = "xjb2p0i xk390pu x1heor9g x1ypdohk xjbqb8w x972fbf x10w94by \
    x1qhh985 x14e42zd xtnn1bt x9v5kkp xmw7ebm xrdum7p xt8t1vi x1xc408v x129tdwq x15urzxu \
    xh8yej3 x1y1aw1k xf159sx xwib8y2 xmzvs34";
const OUTER_ROW_CLASSES: &str = "x1c4vz4f xs83m0k xdl72j9 x1g77sc7 x78zum5 xozqiw3 x1oa3qoh \
    x12fk4p8 xeuugli x2lwn1j x1nhvcw1 x1q0g3np x6s0dn4 xh8yej3";
const INNER_ROW_CLASSES: &str = "x1c4vz4f xs83m0k xdl72j9 x1g77sc7 x78zum5 xozqiw3 x1oa3qoh \
    x12fk4p8 xeuugli x2lwn1j x1nhvcw1 x1q0g3np x6s0dn4 x1n2onr6";

const EYE_PATH: &str = "M12 4.5C7 4.5 2.73 7.61 1 12c1.73 4.39 6 7.5 11 7.5s9.27-3.11 \
    11-7.5c-1.73-4.39-6-7.5-11-7.5zM12 17c-2.76 0-5-2.24-5-5s2.24-5 5-5 5 2.24 5 5-2.24 \
    5-5 5zm0-8c-1.66 0-3 1.34-3 3s1.34 3 3 3 3-1.34 3-3-1.34-3-3-3z";
const SLASH_PATH: &str = "M1 1l22 22";

/// Marks which glyph the icon currently shows
const ICON_STATE_ATTR: &str = "data-focus-icon";

lazy_static! {
    static ref ICON_SVG: Selector =
        Selector::parse("svg").unwrap_or_else(|_| Selector::unmatched());
}

pub struct ButtonController<'a, D: Dom> {
    dom: &'a D,
    config: &'a FocusConfig,
}

impl<'a, D: Dom> ButtonController<'a, D> {
    pub fn new(dom: &'a D, config: &'a FocusConfig) -> Self {
        ButtonController { dom, config }
    }

    fn locator(&self) -> Locator<'a, D> {
        Locator::new(self.dom, self.config)
    }

    /// Create the button next to the navigation anchor unless it already
    /// exists. `Ok(true)` when a button was inserted by this call.
    pub fn ensure_present(&self, active: bool, on_click: Rc<dyn Fn()>) -> Result<bool> {
        if self.locator().toggle_button().is_some() {
            return Ok(false);
        }

        let anchor = self.locator().navigation_anchor()?;
        let container = self.build(active, on_click)?;

        if !insert_after(self.dom, &container, &anchor) {
            return Err(FocusError::NotFound(Role::NavigationAnchor));
        }

        log::info!("Toggle button inserted");
        self.repair_if_hidden();
        Ok(true)
    }

    fn build(&self, active: bool, on_click: Rc<dyn Fn()>) -> Result<D::Node> {
        let ids = &self.config.ids;

        let container = self.element("div")?;
        self.dom.set_attribute(&container, "id", &ids.toggle_container);
        self.dom.set_attribute(&container, "class", CONTAINER_CLASSES);
        self.force_shown(&container);

        let span = self.element("span")?;
        self.dom.set_attribute(&span, "class", SPAN_CLASSES);

        let button = self.element("button")?;
        for (name, value) in [
            ("id", ids.toggle_button.as_str()),
            ("class", BUTTON_CLASSES),
            ("aria-pressed", "false"),
            ("aria-label", "Focus Mode"),
            ("tabindex", "-1"),
            ("data-navbar-item", "true"),
            ("data-navbar-item-selected", "false"),
            ("title", "Toggle focus mode (Hide/Show chat list)"),
        ] {
            self.dom.set_attribute(&button, name, value);
        }
        self.force_shown(&button);
        self.dom.set_style(&button, "width", "auto");
        self.dom.set_style(&button, "height", "auto");

        let outer = self.element("div")?;
        self.dom.set_attribute(&outer, "class", OUTER_ROW_CLASSES);
        let inner = self.element("div")?;
        self.dom.set_attribute(&inner, "class", INNER_ROW_CLASSES);
        self.dom.set_style(&inner, "flex-grow", "1");

        let icon = self.element("span")?;
        self.dom.set_attribute(&icon, "aria-hidden", "true");
        self.dom.set_attribute(&icon, "data-icon", "eye");
        let svg = self.icon(24)?;

        self.dom.append_child(&icon, &svg);
        self.dom.append_child(&inner, &icon);
        self.dom.append_child(&outer, &inner);
        self.dom.append_child(&button, &outer);
        self.dom.append_child(&span, &button);
        self.dom.append_child(&container, &span);

        self.draw_icon(&svg, active)?;
        self.mark_pressed(&button, active);
        self.dom.on_click(&button, on_click);

        Ok(container)
    }

    /// Keep the button directly after the anchor entry. Returns whether the
    /// button is currently visible.
    pub fn ensure_position(&self) -> bool {
        let locator = self.locator();
        let Some(button) = locator.toggle_button() else {
            return false;
        };
        let container = locator.toggle_container();
        if let Some(container) = &container {
            self.force_shown(container);
        }

        let visible = self.dom.layout(&button).is_visible();
        if !visible {
            self.repair(&button, container.as_ref());
        }

        if let (Some(container), Ok(anchor)) = (container, locator.navigation_anchor()) {
            if self.dom.previous_sibling(&container).as_ref() != Some(&anchor) {
                log::debug!("Moving toggle button back next to its anchor");
                insert_after(self.dom, &container, &anchor);
            }
        }

        visible
    }

    /// Show the "active" (focus on) or "inactive" glyph and pressed state
    pub fn set_visual_state(&self, active: bool) {
        let Some(button) = self.locator().toggle_button() else {
            return;
        };
        self.mark_pressed(&button, active);
        if let Some(svg) = self.dom.query(Some(&button), &ICON_SVG) {
            if let Err(e) = self.draw_icon(&svg, active) {
                log::warn!("Could not redraw toggle icon: {}", e);
            }
        }
    }

    pub fn is_visible(&self) -> bool {
        self.locator()
            .toggle_button()
            .is_some_and(|b| self.dom.layout(&b).is_visible())
    }

    /// Force explicit visible styles when host CSS has hidden the button
    pub fn repair_if_hidden(&self) {
        let locator = self.locator();
        if let Some(button) = locator.toggle_button() {
            if !self.dom.layout(&button).is_visible() {
                self.repair(&button, locator.toggle_container().as_ref());
            }
        }
    }

    fn repair(&self, button: &D::Node, container: Option<&D::Node>) {
        log::debug!("Toggle button hidden by host styles, forcing it visible");
        self.force_shown(button);
        for (property, value) in [
            ("width", "auto"),
            ("height", "auto"),
            ("min-width", "48px"),
            ("min-height", "48px"),
        ] {
            self.dom.set_style(button, property, value);
        }
        if let Some(container) = container {
            self.force_shown(container);
        }
    }

    fn force_shown(&self, node: &D::Node) {
        self.dom.set_style(node, "display", "flex");
        self.dom.set_style(node, "visibility", "visible");
        self.dom.set_style(node, "opacity", "1");
    }

    fn mark_pressed(&self, button: &D::Node, active: bool) {
        let pressed = if active { "true" } else { "false" };
        self.dom.set_attribute(button, "aria-pressed", pressed);
        self.dom.set_attribute(button, "data-navbar-item-selected", pressed);
        self.dom.set_attribute(
            button,
            "title",
            if active { "Show chat list" } else { "Hide chat list" },
        );
    }

    /// Redraw only when the glyph differs; rewriting children on every pass
    /// would feed the mutation observer forever.
    fn draw_icon(&self, svg: &D::Node, active: bool) -> Result<()> {
        let wanted = if active { "on" } else { "off" };
        if self.dom.attribute(svg, ICON_STATE_ATTR).as_deref() == Some(wanted) {
            return Ok(());
        }

        self.dom.clear_children(svg);
        let title = self.svg_element("title")?;
        self.dom.set_text(&title, "eye");
        self.dom.append_child(svg, &title);
        self.dom.append_child(svg, &self.eye_path()?);
        if active {
            self.dom.append_child(svg, &self.slash_path()?);
        }
        self.dom.set_attribute(svg, ICON_STATE_ATTR, wanted);
        Ok(())
    }

    fn icon(&self, size: u32) -> Result<D::Node> {
        let svg = self.svg_element("svg")?;
        let size = size.to_string();
        for (name, value) in [
            ("viewBox", "0 0 24 24"),
            ("height", size.as_str()),
            ("width", size.as_str()),
            ("preserveAspectRatio", "xMidYMid meet"),
            ("fill", "none"),
        ] {
            self.dom.set_attribute(&svg, name, value);
        }
        Ok(svg)
    }

    fn eye_path(&self) -> Result<D::Node> {
        let path = self.svg_element("path")?;
        self.dom.set_attribute(&path, "d", EYE_PATH);
        self.dom.set_attribute(&path, "fill", "currentColor");
        Ok(path)
    }

    fn slash_path(&self) -> Result<D::Node> {
        let path = self.svg_element("path")?;
        for (name, value) in [
            ("d", SLASH_PATH),
            ("stroke", "currentColor"),
            ("stroke-width", "2"),
            ("stroke-linecap", "round"),
        ] {
            self.dom.set_attribute(&path, name, value);
        }
        Ok(path)
    }

    fn element(&self, tag: &str) -> Result<D::Node> {
        self.dom
            .create_element(tag)
            .ok_or_else(|| FocusError::Dom(format!("cannot create <{}>", tag)))
    }

    fn svg_element(&self, tag: &str) -> Result<D::Node> {
        self.dom
            .create_svg_element(tag)
            .ok_or_else(|| FocusError::Dom(format!("cannot create <{}>", tag)))
    }

    /// Floating badge shown while focus mode is on
    pub fn update_indicator(&self, active: bool) {
        match self.ensure_indicator() {
            Ok(indicator) => {
                self.dom
                    .set_style(&indicator, "display", if active { "flex" } else { "none" });
            }
            Err(e) => log::debug!("Indicator unavailable: {}", e),
        }
    }

    fn ensure_indicator(&self) -> Result<D::Node> {
        let id = &self.config.ids.indicator;
        if let Some(existing) = self.dom.element_by_id(id) {
            return Ok(existing);
        }
        let body = self
            .dom
            .body()
            .ok_or_else(|| FocusError::Dom("document has no body".to_string()))?;

        let indicator = self.element("div")?;
        self.dom.set_attribute(&indicator, "id", id);
        let svg = self.icon(20)?;
        self.dom.append_child(&svg, &self.eye_path()?);
        self.dom.append_child(&svg, &self.slash_path()?);
        self.dom.append_child(&indicator, &svg);
        self.dom.append_child(&body, &indicator);
        Ok(indicator)
    }
}
