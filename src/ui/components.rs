/// Reusable UI components

use yew::prelude::*;

/// What the popup says for each state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLines {
    pub title: &'static str,
    pub description: &'static str,
    pub action: &'static str,
}

pub fn status_lines(enabled: bool) -> StatusLines {
    if enabled {
        StatusLines {
            title: "Focus Mode: ACTIVE",
            description: "Chat list is hidden",
            action: "Disable Focus Mode",
        }
    } else {
        StatusLines {
            title: "Focus Mode: INACTIVE",
            description: "Chat list is visible",
            action: "Enable Focus Mode",
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct StatusCardProps {
    pub enabled: bool,
}

/// Inline style of the status card, green-edged while focus mode is on
pub fn status_style(enabled: bool) -> String {
    let (background, border) = if enabled {
        ("#e8f5e9", "#25d366")
    } else {
        ("#f5f5f5", "#9e9e9e")
    };
    format!(
        "padding: 12px; border-radius: 4px; margin: 10px 0; \
         background-color: {}; border-left: 4px solid {};",
        background, border
    )
}

#[function_component(StatusCard)]
pub fn status_card(props: &StatusCardProps) -> Html {
    let lines = status_lines(props.enabled);

    html! {
        <div
            class={classes!("status", if props.enabled { "active" } else { "inactive" })}
            style={status_style(props.enabled)}
        >
            <p class="status-title">{lines.title}</p>
            <p class="message-paragraph">{lines.description}</p>
        </div>
    }
}
