/// The persisted focus-mode flag and its change notifications

use serde::{Deserialize, Serialize};

pub const FOCUS_MODE_KEY: &str = "focusMode";
pub const LAST_UPDATE_KEY: &str = "lastUpdate";

/// Root storage structure, as laid out in `chrome.storage.local`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusState {
    #[serde(rename = "focusMode", default)]
    pub enabled: bool,
    #[serde(rename = "lastUpdate", default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<f64>,
}

impl FocusState {
    pub fn new(enabled: bool, now: f64) -> FocusState {
        FocusState {
            enabled,
            last_update: Some(now),
        }
    }
}

impl Default for FocusState {
    fn default() -> Self {
        FocusState {
            enabled: false,
            last_update: None,
        }
    }
}

/// One key's change as delivered to every listening context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageChange {
    pub key: String,
    #[serde(rename = "oldValue", default)]
    pub old_value: Option<serde_json::Value>,
    #[serde(rename = "newValue", default)]
    pub new_value: Option<serde_json::Value>,
}

impl StorageChange {
    /// Desired focus state carried by this change, if it concerns the flag.
    /// A removed key counts as "off".
    pub fn focus_mode(&self) -> Option<bool> {
        if self.key != FOCUS_MODE_KEY {
            return None;
        }
        Some(
            self.new_value
                .as_ref()
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        )
    }

    /// Changes produced by writing `next` over `previous`
    pub fn diff(previous: &FocusState, next: &FocusState) -> Vec<StorageChange> {
        let mut changes = Vec::new();
        if previous.enabled != next.enabled {
            changes.push(StorageChange {
                key: FOCUS_MODE_KEY.to_string(),
                old_value: Some(previous.enabled.into()),
                new_value: Some(next.enabled.into()),
            });
        }
        if previous.last_update != next.last_update {
            changes.push(StorageChange {
                key: LAST_UPDATE_KEY.to_string(),
                old_value: previous.last_update.map(Into::into),
                new_value: next.last_update.map(Into::into),
            });
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_layout() {
        let state = FocusState::new(true, 1698508200000.0);
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["focusMode"], true);
        assert_eq!(json["lastUpdate"], 1698508200000.0);
    }

    #[test]
    fn test_missing_keys_default_to_off() {
        let state: FocusState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, FocusState::default());
        assert!(!state.enabled);
    }

    #[test]
    fn test_change_focus_mode() {
        let change = StorageChange {
            key: FOCUS_MODE_KEY.to_string(),
            old_value: Some(false.into()),
            new_value: Some(true.into()),
        };
        assert_eq!(change.focus_mode(), Some(true));

        let removed = StorageChange {
            new_value: None,
            ..change.clone()
        };
        assert_eq!(removed.focus_mode(), Some(false));

        let other = StorageChange {
            key: LAST_UPDATE_KEY.to_string(),
            ..change
        };
        assert_eq!(other.focus_mode(), None);
    }

    #[test]
    fn test_diff_only_reports_changed_keys() {
        let a = FocusState::new(false, 1.0);
        let b = FocusState::new(false, 2.0);
        let changes = StorageChange::diff(&a, &b);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].key, LAST_UPDATE_KEY);

        assert!(StorageChange::diff(&a, &a).is_empty());
    }
}
