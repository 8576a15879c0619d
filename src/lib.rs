/// WhatsApp Focus - hides the WhatsApp Web chat list on demand
/// Built with Rust + WASM + Yew

mod applier;
mod background;
mod button;
mod chrome;
mod content;
pub mod config;
pub mod error;
pub mod focus_state;
pub mod host;
pub mod locator;
pub mod messages;
pub mod reconciler;
pub mod selector;
pub mod store;
pub mod ui;
pub mod web;

#[cfg(test)]
mod testing;

use config::FocusConfig;
use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Entry point for the content script on the host page
#[wasm_bindgen]
pub fn start_content_script() {
    content::start(FocusConfig::default());
}

/// Same as `start_content_script`, with a JSON override of the defaults
#[wasm_bindgen]
pub fn start_content_script_with_config(json: &str) -> Result<(), JsValue> {
    let config = FocusConfig::from_json(json)?;
    content::start(config);
    Ok(())
}

// Entry point for the background service worker
#[wasm_bindgen]
pub fn start_background() {
    background::start(FocusConfig::default());
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}
