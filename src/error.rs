/// Error taxonomy for the focus-mode extension

use crate::locator::Role;
use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FocusError {
    /// The locator could not resolve a role. Expected while the host page loads.
    #[error("could not locate {0}")]
    NotFound(Role),

    /// A message was sent to a context that is not listening yet.
    #[error("message delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("setup gave up after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid selector {0:?}")]
    InvalidSelector(String),

    #[error("document error: {0}")]
    Dom(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FocusError>;

impl From<serde_wasm_bindgen::Error> for FocusError {
    fn from(e: serde_wasm_bindgen::Error) -> Self {
        FocusError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for FocusError {
    fn from(e: serde_json::Error) -> Self {
        FocusError::Config(e.to_string())
    }
}

impl From<FocusError> for JsValue {
    fn from(e: FocusError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

/// Render a raw JS exception for logging and error payloads
pub fn describe_js(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(value, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", value))
}
