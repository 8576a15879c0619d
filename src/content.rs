/// Content script bootstrap: wires the focus context to the live page

use crate::chrome;
use crate::config::FocusConfig;
use crate::error::{FocusError, Result};
use crate::messages::Request;
use crate::reconciler::FocusContext;
use crate::store::ChromeStore;
use crate::web::{BrowserTimers, WebDom};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;

thread_local! {
    // The page's single context. Listeners only hold weak references to it.
    static CONTEXT: RefCell<Option<Rc<FocusContext<WebDom>>>> = const { RefCell::new(None) };
}

pub fn start(config: FocusConfig) {
    spawn_local(async move {
        if let Err(e) = run(config).await {
            log::error!("Focus mode unavailable on this page: {}", e);
        }
    });
}

async fn run(config: FocusConfig) -> Result<()> {
    let dom = WebDom::new().ok_or_else(|| FocusError::Dom("no document".to_string()))?;
    let initial = ChromeStore::load().await;
    dom.ready().await?;

    let ctx = FocusContext::new(dom, config, Rc::new(BrowserTimers), Rc::new(ChromeStore));
    ctx.set_announcer(|enabled| {
        spawn_local(async move {
            let changed = Request::FocusModeChanged { enabled };
            if let Err(e) = chrome::send_to_runtime(&changed).await {
                log::debug!("Background not told about change: {}", e);
            }
        });
    });

    let weak = Rc::downgrade(&ctx);
    ChromeStore::subscribe(move |change| {
        if let Some(ctx) = weak.upgrade() {
            ctx.on_storage_change(change);
        }
    });

    let weak = Rc::downgrade(&ctx);
    chrome::on_message(move |request| {
        let ctx = weak.upgrade()?;
        log::debug!("Content script received {:?}", request);
        ctx.handle_request(request)
    });

    ctx.start(initial);
    CONTEXT.with(|slot| *slot.borrow_mut() = Some(ctx));
    Ok(())
}
