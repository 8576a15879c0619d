/// Tunable parameters: selectors, identifiers, timings and heuristics
///
/// Everything here describes a page we do not control, so none of it is
/// hardcoded in the logic. `FocusConfig::default()` matches the host page as
/// it is currently shipped; a JSON override may replace any subset.

use crate::error::Result;
use crate::selector::{self, Selector};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct FocusConfig {
    pub selectors: Selectors,
    pub ids: Identifiers,
    pub classes: ClassNames,
    pub timing: Timing,
    pub retry: RetryPolicy,
    pub nav: NavHeuristics,
    /// Host name of the page the content script runs on
    pub host_name: String,
    /// Match pattern used when broadcasting to every open host tab
    pub host_url_pattern: String,
    /// Name of the keyboard command declared in the manifest
    pub toggle_command: String,
}

impl FocusConfig {
    pub fn from_json(json: &str) -> Result<FocusConfig> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        FocusConfig {
            selectors: Selectors::default(),
            ids: Identifiers::default(),
            classes: ClassNames::default(),
            timing: Timing::default(),
            retry: RetryPolicy::default(),
            nav: NavHeuristics::default(),
            host_name: "web.whatsapp.com".to_string(),
            host_url_pattern: "https://web.whatsapp.com/*".to_string(),
            toggle_command: "toggle-focus".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct Selectors {
    /// Tried in order; first hit is the chat list
    #[serde(deserialize_with = "selector::lenient_list")]
    pub chat_sidebar: Vec<Selector>,
    /// Layout containers that may be collapsed
    pub layout_container: Selector,
    /// Navigation button the toggle is inserted after, by label
    #[serde(deserialize_with = "selector::lenient_list")]
    pub anchor_buttons: Vec<Selector>,
    /// Any navigation rail button
    pub navbar_item: Selector,
    /// Buttons whose label is compared against `NavHeuristics::labels`
    pub labelled_button: Selector,
    /// `data-navbar-item-index` of the anchor when no label matches
    pub anchor_item_index: String,
    /// Wrapper around one navigation entry
    pub anchor_container: Selector,
    /// Tag that bounds the upward search for `anchor_container`
    pub anchor_boundary_tag: String,
    pub nav_header: Selector,
    pub fallback_header: Selector,
    pub fallback_nav_row: Selector,
    pub fallback_anchor: Selector,
}

impl Default for Selectors {
    fn default() -> Self {
        Selectors {
            chat_sidebar: Selector::parse_all(&[
                "#pane-side",
                r#"[data-testid="chatlist"]"#,
                r#"div[role="complementary"]"#,
                r#"div[data-testid="chatlist-container"]"#,
            ]),
            layout_container: default_selector(".x18dvir5"),
            anchor_buttons: Selector::parse_all(&[
                r#"button[aria-label="Communities"]"#,
                r#"button[aria-label="Comunidades"]"#,
            ]),
            navbar_item: default_selector(r#"button[data-navbar-item="true"]"#),
            labelled_button: default_selector("button[aria-label]"),
            anchor_item_index: "3".to_string(),
            anchor_container: default_selector(
                "div.x1c4vz4f.xs83m0k.xdl72j9.x100vrsf.x1vqgdyp.xhslqc4",
            ),
            anchor_boundary_tag: "header".to_string(),
            nav_header: default_selector("header[data-tab]"),
            fallback_header: default_selector(r#"header[data-tab="2"]"#),
            fallback_nav_row: default_selector("div.x1c4vz4f.xs83m0k.xdl72j9.x1g77sc7.x78zum5"),
            fallback_anchor: default_selector("div.x100vrsf.x1vqgdyp.xhslqc4"),
        }
    }
}

fn default_selector(source: &str) -> Selector {
    Selector::parse(source).unwrap_or_else(|e| {
        log::error!("Built-in selector rejected: {}", e);
        Selector::unmatched()
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct Identifiers {
    pub toggle_button: String,
    pub toggle_container: String,
    pub indicator: String,
}

impl Default for Identifiers {
    fn default() -> Self {
        Identifiers {
            toggle_button: "whatsapp-focus-toggle".to_string(),
            toggle_container: "whatsapp-focus-toggle-container".to_string(),
            indicator: "whatsapp-focus-indicator".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ClassNames {
    /// Set on `<body>` while focus mode is on
    pub body_active: String,
    pub collapsed: String,
    pub navbar: String,
}

impl Default for ClassNames {
    fn default() -> Self {
        ClassNames {
            body_active: "whatsapp-focus-active".to_string(),
            collapsed: "whatsapp-focus-collapsed".to_string(),
            navbar: "whatsapp-focus-navbar".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct Timing {
    /// Wait after document-ready before the first setup attempt
    pub settle_delay_ms: u32,
    /// Collapse animation length; the sidebar is hidden once it elapses
    pub hide_delay_ms: u32,
    pub safety_interval_ms: u32,
    /// After showing, how long to wait before checking the sidebar came back
    pub recovery_check_ms: u32,
    pub popup_poll_ms: u32,
    pub popup_refresh_delay_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            settle_delay_ms: 1000,
            hide_delay_ms: 300,
            safety_interval_ms: 2000,
            recovery_check_ms: 400,
            popup_poll_ms: 1000,
            popup_refresh_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct BackoffStep {
    /// Applies to attempts strictly below this number
    pub below: u32,
    pub delay_ms: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub steps: Vec<BackoffStep>,
    pub final_delay_ms: u32,
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> u32 {
        self.steps
            .iter()
            .find(|step| attempt < step.below)
            .map_or(self.final_delay_ms, |step| step.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 20,
            steps: vec![
                BackoffStep { below: 5, delay_ms: 300 },
                BackoffStep { below: 10, delay_ms: 500 },
            ],
            final_delay_ms: 1000,
        }
    }
}

/// Thresholds that decide whether a layout container is the navigation rail.
/// These were tuned by hand against the live page and are expected to drift.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct NavHeuristics {
    /// Navigation buttons inside a `header[data-tab]`
    pub header_button_min: usize,
    /// Navigation buttons next to our own toggle
    pub toggle_button_min: usize,
    /// Navigation buttons anywhere in the container
    pub container_button_min: usize,
    /// Distinct navigation labels found in the container
    pub label_min: usize,
    pub narrow_width_px: f64,
    pub narrow_button_min: usize,
    pub labels: Vec<String>,
}

impl Default for NavHeuristics {
    fn default() -> Self {
        NavHeuristics {
            header_button_min: 2,
            toggle_button_min: 2,
            container_button_min: 4,
            label_min: 4,
            narrow_width_px: 150.0,
            narrow_button_min: 3,
            labels: [
                "Chats", "Status", "Communities", "Comunidades", "Channels", "Canales",
                "Settings", "Profile",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}
