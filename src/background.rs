/// Background worker: keyboard command, change persistence, install defaults

use crate::chrome::{self, Tab, TabQuery};
use crate::config::FocusConfig;
use crate::error::FocusError;
use crate::focus_state::FocusState;
use crate::messages::{Request, Response};
use wasm_bindgen_futures::spawn_local;

pub fn start(config: FocusConfig) {
    let FocusConfig {
        toggle_command,
        host_url_pattern,
        ..
    } = config;

    chrome::on_command(move |command| {
        if command != toggle_command {
            log::debug!("Ignoring command {}", command);
            return;
        }
        let pattern = host_url_pattern.clone();
        spawn_local(async move {
            let delivered = broadcast_toggle(&pattern).await;
            log::info!("Toggle sent to {} tab(s)", delivered);
        });
    });

    chrome::on_message(|request| {
        let state = persisted_change(&request, js_sys::Date::now())?;
        spawn_local(async move {
            if let Err(e) = chrome::save_focus_state(&state).await {
                log::warn!("Failed to persist focus state: {}", e);
            }
        });
        Some(Response::ok())
    });

    chrome::on_installed(|reason| {
        log::info!("Extension {}: focus mode off", reason);
        spawn_local(async {
            if let Err(e) = chrome::save_focus_state(&FocusState::default()).await {
                log::warn!("Failed to write defaults: {}", e);
            }
        });
    });
}

/// Send `toggle` to every open host tab. Tabs whose content script is not
/// listening yet are skipped. Returns how many tabs accepted it.
async fn broadcast_toggle(url_pattern: &str) -> usize {
    let tabs = match chrome::query_tabs(&TabQuery::matching(url_pattern)).await {
        Ok(tabs) => tabs,
        Err(e) => {
            log::warn!("Could not list host tabs: {}", e);
            return 0;
        }
    };

    let mut delivered = 0;
    for tab_id in toggle_targets(&tabs) {
        match chrome::send_to_tab(tab_id, &Request::Toggle).await {
            Ok(_) => delivered += 1,
            Err(FocusError::DeliveryFailure(reason)) => {
                log::debug!("Tab {} not ready: {}", tab_id, reason)
            }
            Err(e) => log::warn!("Toggle to tab {} failed: {}", tab_id, e),
        }
    }
    delivered
}

fn toggle_targets(tabs: &[Tab]) -> Vec<i32> {
    tabs.iter().filter_map(|tab| tab.id).collect()
}

/// State to persist for a request, if the request is a change report
fn persisted_change(request: &Request, now: f64) -> Option<FocusState> {
    match request {
        Request::FocusModeChanged { enabled } => Some(FocusState::new(*enabled, now)),
        _ => None,
    }
}
