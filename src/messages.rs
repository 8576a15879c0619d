/// Wire format for messages between the popup, background and content scripts

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Flip focus mode and reconcile
    Toggle,
    GetState,
    /// Force a value and reconcile
    SetState { enabled: bool },
    /// Clear every trace of focus mode and force it off
    Reset,
    /// Content script telling the background a toggle happened
    FocusModeChanged { enabled: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    State { enabled: bool },
    Ack { success: bool },
}

impl Response {
    pub fn ok() -> Response {
        Response::Ack { success: true }
    }

    pub fn enabled(&self) -> Option<bool> {
        match self {
            Response::State { enabled } => Some(*enabled),
            Response::Ack { .. } => None,
        }
    }
}
