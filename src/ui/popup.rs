/// Popup UI for the focus mode extension

use crate::chrome::{self, TabQuery};
use crate::config::FocusConfig;
use crate::messages::Request;
use crate::ui::components::{StatusCard, status_lines};
use gloo_timers::callback::{Interval, Timeout};
use patternfly_yew::prelude::*;
use url::Url;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

pub const NOT_ON_HOST: &str =
    "Please open WhatsApp Web (https://web.whatsapp.com) to use this extension.";

#[function_component(App)]
pub fn app() -> Html {
    let config = use_memo((), |_| FocusConfig::default());
    let enabled = use_state(|| false);
    let notice = use_state(|| None::<String>);

    let refresh = {
        let enabled = enabled.clone();
        let host = config.host_name.clone();
        Callback::from(move |_: ()| {
            let enabled = enabled.clone();
            let host = host.clone();
            spawn_local(async move {
                enabled.set(current_state(&host).await);
            });
        })
    };

    // Initial read, storage listener and periodic poll
    {
        let refresh = refresh.clone();
        let enabled = enabled.clone();
        let poll_ms = config.timing.popup_poll_ms;
        use_effect_with((), move |_| {
            refresh.emit(());
            chrome::on_storage_changed(move |changes| {
                if let Some(value) = changes.iter().find_map(|c| c.focus_mode()) {
                    enabled.set(value);
                }
            });
            let poll = Interval::new(poll_ms, move || refresh.emit(()));
            move || drop(poll)
        });
    }

    let send = {
        let notice = notice.clone();
        let refresh = refresh.clone();
        let host = config.host_name.clone();
        let delay = config.timing.popup_refresh_delay_ms;
        move |request: Request| {
            let notice = notice.clone();
            let refresh = refresh.clone();
            let host = host.clone();
            Callback::from(move |_: MouseEvent| {
                let notice = notice.clone();
                let refresh = refresh.clone();
                let host = host.clone();
                let request = request.clone();
                spawn_local(async move {
                    match send_to_active_host(&host, &request).await {
                        Ok(()) => {
                            notice.set(None);
                            let _ = Timeout::new(delay, move || refresh.emit(())).forget();
                        }
                        Err(message) => notice.set(Some(message)),
                    }
                });
            })
        }
    };
    let on_toggle = send(Request::Toggle);
    let on_reset = send(Request::Reset);

    let lines = status_lines(*enabled);
    let toggle_variant = if *enabled {
        ButtonVariant::Primary
    } else {
        ButtonVariant::Secondary
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"WhatsApp Focus"}</h1>

            <StatusCard enabled={*enabled} />

            if let Some(message) = (*notice).clone() {
                <Alert r#type={AlertType::Warning} title={message} inline={true}>
                </Alert>
            }

            <div class="flex-column-gap">
                <Button
                    onclick={on_toggle}
                    variant={toggle_variant}
                    block={true}
                >
                    {lines.action}
                </Button>
                <Button onclick={on_reset} variant={ButtonVariant::Tertiary} block={true}>
                    {"Reset"}
                </Button>
            </div>

            <p class="footer-popup">
                {concat!("WhatsApp Focus v", env!("CARGO_PKG_VERSION"))}
            </p>
        </div>
    }
}

/// Whether `url` points at the host page
pub fn is_host_tab(url: &str, host: &str) -> bool {
    Url::parse(url)
        .ok()
        .is_some_and(|u| u.host_str() == Some(host))
}

/// The active tab's id, when the active tab shows the host page
async fn active_host_tab(host: &str) -> Option<i32> {
    let tabs = match chrome::query_tabs(&TabQuery::active()).await {
        Ok(tabs) => tabs,
        Err(e) => {
            log::warn!("Could not read the active tab: {}", e);
            return None;
        }
    };
    let tab = tabs.into_iter().next()?;
    if tab.url.as_deref().is_some_and(|url| is_host_tab(url, host)) {
        tab.id
    } else {
        None
    }
}

/// Stored flag, overridden by the live page when it answers
async fn current_state(host: &str) -> bool {
    let mut enabled = match chrome::load_focus_state().await {
        Ok(state) => state.enabled,
        Err(e) => {
            log::warn!("Could not read focus state: {}", e);
            false
        }
    };

    if let Some(tab_id) = active_host_tab(host).await {
        match chrome::send_to_tab(tab_id, &Request::GetState).await {
            Ok(Some(response)) => {
                if let Some(live) = response.enabled() {
                    enabled = live;
                }
            }
            Ok(None) => {}
            Err(e) => log::debug!("Content script not available yet: {}", e),
        }
    }
    enabled
}

async fn send_to_active_host(host: &str, request: &Request) -> Result<(), String> {
    let tab_id = active_host_tab(host)
        .await
        .ok_or_else(|| NOT_ON_HOST.to_string())?;
    chrome::send_to_tab(tab_id, request).await.map_err(|e| {
        log::warn!("{:?} not delivered: {}", request, e);
        "Could not reach the page. Make sure WhatsApp Web is open and loaded.".to_string()
    })?;
    Ok(())
}
