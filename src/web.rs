/// `Dom` and `Timers` over the real browser document

use crate::error::{FocusError, Result, describe_js};
use crate::host::{Dom, Guard, Layout, Timers};
use crate::selector::Selector;
use gloo_timers::callback::{Interval, Timeout};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Document, Element, HtmlElement, MouseEvent, MutationObserver,
    MutationObserverInit, Node, NodeList, Window,
};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

pub struct WebDom {
    window: Window,
    document: Document,
}

impl WebDom {
    /// `None` outside a document context (e.g. in a service worker)
    pub fn new() -> Option<WebDom> {
        let window = web_sys::window()?;
        let document = window.document()?;
        Some(WebDom { window, document })
    }

    /// Resolves once the initial document has been parsed
    pub async fn ready(&self) -> Result<()> {
        if self.document.ready_state() != "loading" {
            return Ok(());
        }
        let document = self.document.clone();
        let mut listening = Ok(());
        let loaded = js_sys::Promise::new(&mut |resolve, _reject| {
            listening = document.add_event_listener_with_callback("DOMContentLoaded", &resolve);
        });
        if let Err(e) = listening {
            return Err(FocusError::Dom(format!(
                "cannot wait for DOMContentLoaded: {}",
                describe_js(&e)
            )));
        }
        JsFuture::from(loaded)
            .await
            .map(|_| ())
            .map_err(|e| FocusError::Dom(describe_js(&e)))
    }

    fn collect(list: NodeList) -> Vec<Element> {
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }
}

fn html(node: &Element) -> Option<&HtmlElement> {
    node.dyn_ref::<HtmlElement>()
}

/// Keeps the observer callback alive and disconnects on drop
struct ObserverGuard {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

impl Dom for WebDom {
    type Node = Element;

    fn body(&self) -> Option<Element> {
        self.document.body().map(Element::from)
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn query(&self, scope: Option<&Element>, selector: &Selector) -> Option<Element> {
        let css = selector.as_css();
        let found = match scope {
            Some(scope) => scope.query_selector(&css),
            None => self.document.query_selector(&css),
        };
        found.ok().flatten()
    }

    fn query_all(&self, scope: Option<&Element>, selector: &Selector) -> Vec<Element> {
        let css = selector.as_css();
        let found = match scope {
            Some(scope) => scope.query_selector_all(&css),
            None => self.document.query_selector_all(&css),
        };
        found.map(WebDom::collect).unwrap_or_default()
    }

    fn matches(&self, node: &Element, selector: &Selector) -> bool {
        node.matches(&selector.as_css()).unwrap_or(false)
    }

    fn tag_name(&self, node: &Element) -> String {
        node.tag_name().to_ascii_lowercase()
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn next_sibling(&self, node: &Element) -> Option<Element> {
        node.next_element_sibling()
    }

    fn previous_sibling(&self, node: &Element) -> Option<Element> {
        node.previous_element_sibling()
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) {
        if node.get_attribute(name).as_deref() == Some(value) {
            return;
        }
        if let Err(e) = node.set_attribute(name, value) {
            log::debug!("setAttribute({}) failed: {:?}", name, e);
        }
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn add_class(&self, node: &Element, class: &str) {
        if let Err(e) = node.class_list().add_1(class) {
            log::debug!("classList.add({}) failed: {:?}", class, e);
        }
    }

    fn remove_class(&self, node: &Element, class: &str) {
        if let Err(e) = node.class_list().remove_1(class) {
            log::debug!("classList.remove({}) failed: {:?}", class, e);
        }
    }

    fn style(&self, node: &Element, property: &str) -> String {
        html(node)
            .and_then(|h| h.style().get_property_value(property).ok())
            .unwrap_or_default()
    }

    fn set_style(&self, node: &Element, property: &str, value: &str) {
        if let Some(h) = html(node) {
            if let Err(e) = h.style().set_property(property, value) {
                log::debug!("style.setProperty({}) failed: {:?}", property, e);
            }
        }
    }

    fn remove_style(&self, node: &Element, property: &str) {
        if let Some(h) = html(node) {
            if let Err(e) = h.style().remove_property(property) {
                log::debug!("style.removeProperty({}) failed: {:?}", property, e);
            }
        }
    }

    fn layout(&self, node: &Element) -> Layout {
        let rect = node.get_bounding_client_rect();
        let mut layout = Layout {
            width: rect.width(),
            height: rect.height(),
            top: rect.top(),
            left: rect.left(),
            ..Layout::default()
        };
        if let Ok(Some(computed)) = self.window.get_computed_style(node) {
            let read = |p: &str| computed.get_property_value(p).unwrap_or_default();
            layout.display = read("display");
            layout.visibility = read("visibility");
            layout.opacity = read("opacity");
        }
        layout
    }

    fn force_reflow(&self, node: &Element) {
        if let Some(h) = html(node) {
            let _ = h.offset_width();
        }
    }

    fn create_element(&self, tag: &str) -> Option<Element> {
        self.document.create_element(tag).ok()
    }

    fn create_svg_element(&self, tag: &str) -> Option<Element> {
        self.document.create_element_ns(Some(SVG_NS), tag).ok()
    }

    fn set_text(&self, node: &Element, text: &str) {
        node.set_text_content(Some(text));
    }

    fn append_child(&self, parent: &Element, child: &Element) {
        if let Err(e) = parent.append_child(child) {
            log::debug!("appendChild failed: {:?}", e);
        }
    }

    fn insert_before(&self, parent: &Element, child: &Element, reference: Option<&Element>) {
        let reference: Option<&Node> = reference.map(|r| r.as_ref());
        if let Err(e) = parent.insert_before(child, reference) {
            log::debug!("insertBefore failed: {:?}", e);
        }
    }

    fn clear_children(&self, node: &Element) {
        while let Some(child) = node.first_child() {
            if node.remove_child(&child).is_err() {
                break;
            }
        }
    }

    fn on_click(&self, node: &Element, handler: Rc<dyn Fn()>) {
        let closure = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |event: MouseEvent| {
            event.prevent_default();
            event.stop_propagation();
            handler();
        }));
        if let Err(e) =
            node.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())
        {
            log::warn!("Could not attach click handler: {:?}", e);
        }
        // Lives as long as the element; the page owns its lifetime
        closure.forget();
    }

    fn observe_mutations(&self, mut callback: Box<dyn FnMut()>) -> Option<Guard> {
        let body = self.document.body()?;
        let closure = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::wrap(Box::new(
            move |_records: js_sys::Array, _observer: MutationObserver| callback(),
        ));
        let observer = MutationObserver::new(closure.as_ref().unchecked_ref()).ok()?;

        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer.observe_with_options(&body, &init).ok()?;

        Some(Guard::new(ObserverGuard {
            observer,
            _callback: closure,
        }))
    }
}

/// Browser clock and `setTimeout`/`setInterval` through gloo
pub struct BrowserTimers;

impl Timers for BrowserTimers {
    fn now(&self) -> f64 {
        js_sys::Date::now()
    }

    fn timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Guard {
        Guard::new(Timeout::new(delay_ms, callback))
    }

    fn interval(&self, period_ms: u32, callback: Box<dyn FnMut()>) -> Guard {
        Guard::new(Interval::new(period_ms, callback))
    }
}
