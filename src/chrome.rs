/// Extension API access: storage, messaging, tabs and commands

use crate::error::{self, FocusError, describe_js};
use crate::focus_state::{FOCUS_MODE_KEY, FocusState, LAST_UPDATE_KEY, StorageChange};
use crate::messages::{Request, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

// Import JS bridge functions
#[wasm_bindgen(module = "/js/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(items: JsValue) -> Result<(), JsValue>;

    fn onStorageChanged(callback: &Closure<dyn FnMut(JsValue, String)>);

    fn onMessage(handler: &Closure<dyn FnMut(JsValue) -> JsValue>);

    #[wasm_bindgen(catch)]
    async fn sendToTab(tab_id: i32, message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendToRuntime(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryTabs(query: JsValue) -> Result<JsValue, JsValue>;

    fn onCommand(callback: &Closure<dyn FnMut(String)>);

    fn onInstalled(callback: &Closure<dyn FnMut(String)>);
}

/// The subset of `chrome.tabs.Tab` we read
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tab {
    pub id: Option<i32>,
    pub url: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_window: Option<bool>,
}

impl TabQuery {
    pub fn matching(url_pattern: &str) -> TabQuery {
        TabQuery {
            url: Some(url_pattern.to_string()),
            ..TabQuery::default()
        }
    }

    pub fn active() -> TabQuery {
        TabQuery {
            active: Some(true),
            current_window: Some(true),
            ..TabQuery::default()
        }
    }
}

#[derive(Deserialize)]
struct RawChange {
    #[serde(rename = "oldValue", default)]
    old_value: Option<serde_json::Value>,
    #[serde(rename = "newValue", default)]
    new_value: Option<serde_json::Value>,
}

fn storage_error(e: JsValue) -> FocusError {
    FocusError::Storage(describe_js(&e))
}

fn delivery_error(e: JsValue) -> FocusError {
    FocusError::DeliveryFailure(describe_js(&e))
}

pub async fn load_focus_state() -> error::Result<FocusState> {
    let keys = serde_wasm_bindgen::to_value(&[FOCUS_MODE_KEY, LAST_UPDATE_KEY])?;
    let raw = getStorage(keys).await.map_err(storage_error)?;
    Ok(serde_wasm_bindgen::from_value(raw)?)
}

pub async fn save_focus_state(state: &FocusState) -> error::Result<()> {
    let items = serde_wasm_bindgen::to_value(state)?;
    setStorage(items).await.map_err(storage_error)
}

/// Listen for changes in the local storage area. Lives as long as the page.
pub fn on_storage_changed(mut callback: impl FnMut(Vec<StorageChange>) + 'static) {
    let closure = Closure::wrap(Box::new(move |changes: JsValue, area: String| {
        if area != "local" {
            return;
        }
        match serde_wasm_bindgen::from_value::<BTreeMap<String, RawChange>>(changes) {
            Ok(raw) => callback(
                raw.into_iter()
                    .map(|(key, change)| StorageChange {
                        key,
                        old_value: change.old_value,
                        new_value: change.new_value,
                    })
                    .collect(),
            ),
            Err(e) => log::warn!("Unreadable storage change: {}", e),
        }
    }) as Box<dyn FnMut(JsValue, String)>);
    onStorageChanged(&closure);
    closure.forget();
}

/// Answer runtime messages. Requests that do not parse, or that the handler
/// declines, get no response.
pub fn on_message(handler: impl Fn(Request) -> Option<Response> + 'static) {
    let closure = Closure::wrap(Box::new(move |raw: JsValue| {
        let request = match serde_wasm_bindgen::from_value::<Request>(raw) {
            Ok(request) => request,
            Err(e) => {
                log::debug!("Ignoring unknown message: {}", e);
                return JsValue::UNDEFINED;
            }
        };
        handler(request)
            .and_then(|response| serde_wasm_bindgen::to_value(&response).ok())
            .unwrap_or(JsValue::UNDEFINED)
    }) as Box<dyn FnMut(JsValue) -> JsValue>);
    onMessage(&closure);
    closure.forget();
}

fn parse_response(raw: JsValue) -> error::Result<Option<Response>> {
    if raw.is_undefined() || raw.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_wasm_bindgen::from_value(raw)?))
}

/// Send to the content script of one tab. Fails with `DeliveryFailure` when
/// the tab has no listener yet.
pub async fn send_to_tab(tab_id: i32, request: &Request) -> error::Result<Option<Response>> {
    let message = serde_wasm_bindgen::to_value(request)?;
    let raw = sendToTab(tab_id, message).await.map_err(delivery_error)?;
    parse_response(raw)
}

pub async fn send_to_runtime(request: &Request) -> error::Result<Option<Response>> {
    let message = serde_wasm_bindgen::to_value(request)?;
    let raw = sendToRuntime(message).await.map_err(delivery_error)?;
    parse_response(raw)
}

pub async fn query_tabs(query: &TabQuery) -> error::Result<Vec<Tab>> {
    let query = serde_wasm_bindgen::to_value(query)?;
    let raw = queryTabs(query).await.map_err(delivery_error)?;
    Ok(serde_wasm_bindgen::from_value(raw)?)
}

pub fn on_command(callback: impl FnMut(String) + 'static) {
    let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut(String)>);
    onCommand(&closure);
    closure.forget();
}

/// Called with the install reason (`install`, `update`, ...)
pub fn on_installed(callback: impl FnMut(String) + 'static) {
    let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut(String)>);
    onInstalled(&closure);
    closure.forget();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tab_query_omits_unset_fields() {
        assert_eq!(
            serde_json::to_value(TabQuery::matching("https://web.whatsapp.com/*")).unwrap(),
            json!({"url": "https://web.whatsapp.com/*"})
        );
        assert_eq!(
            serde_json::to_value(TabQuery::active()).unwrap(),
            json!({"active": true, "currentWindow": true})
        );
    }

    #[test]
    fn test_tab_ignores_other_fields() {
        let tab: Tab = serde_json::from_value(json!({
            "id": 7,
            "url": "https://web.whatsapp.com/",
            "title": "WhatsApp",
            "pinned": false
        }))
        .unwrap();
        assert_eq!(tab.id, Some(7));
    }
}
