/// The reconciliation loop
///
/// One `FocusContext` lives per host page. Every trigger (mutation observer,
/// safety interval, storage change, message, click) funnels into the same
/// level-triggered `reconcile` pass, which re-derives everything from the
/// live page and the desired flag.

use crate::applier::VisualState;
use crate::button::ButtonController;
use crate::config::FocusConfig;
use crate::error::FocusError;
use crate::focus_state::{FocusState, StorageChange};
use crate::host::{Dom, Guard, Timers};
use crate::locator::Locator;
use crate::messages::{Request, Response};
use crate::store::StateStore;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initializing { attempt: u32 },
    Steady,
}

struct LoopState {
    enabled: bool,
    phase: Phase,
    /// Sidebar hide waiting for the collapse animation. At most one.
    pending_hide: Option<Guard>,
    retry: Option<Guard>,
    recovery: Option<Guard>,
    observer: Option<Guard>,
    safety: Option<Guard>,
}

pub struct FocusContext<D: Dom> {
    dom: D,
    config: FocusConfig,
    timers: Rc<dyn Timers>,
    store: Rc<dyn StateStore>,
    announcer: RefCell<Option<Rc<dyn Fn(bool)>>>,
    inner: RefCell<LoopState>,
    this: Weak<FocusContext<D>>,
}

impl<D: Dom + 'static> FocusContext<D> {
    pub fn new(
        dom: D,
        config: FocusConfig,
        timers: Rc<dyn Timers>,
        store: Rc<dyn StateStore>,
    ) -> Rc<FocusContext<D>> {
        Rc::new_cyclic(|this| FocusContext {
            dom,
            config,
            timers,
            store,
            announcer: RefCell::new(None),
            inner: RefCell::new(LoopState {
                enabled: false,
                phase: Phase::Uninitialized,
                pending_hide: None,
                retry: None,
                recovery: None,
                observer: None,
                safety: None,
            }),
            this: this.clone(),
        })
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn enabled(&self) -> bool {
        self.inner.borrow().enabled
    }

    pub fn phase(&self) -> Phase {
        self.inner.borrow().phase
    }

    /// Called with the new flag whenever this page flips focus mode itself
    pub fn set_announcer(&self, announcer: impl Fn(bool) + 'static) {
        *self.announcer.borrow_mut() = Some(Rc::new(announcer));
    }

    fn button(&self) -> ButtonController<'_, D> {
        ButtonController::new(&self.dom, &self.config)
    }

    fn visual(&self) -> VisualState<'_, D> {
        VisualState::new(&self.dom, &self.config)
    }

    fn locator(&self) -> Locator<'_, D> {
        Locator::new(&self.dom, &self.config)
    }

    /// Run `action` against this context later, if it is still alive
    fn later(&self, delay_ms: u32, action: impl FnOnce(&FocusContext<D>) + 'static) -> Guard {
        let weak = self.this.clone();
        self.timers.timeout(
            delay_ms,
            Box::new(move || {
                if let Some(ctx) = weak.upgrade() {
                    action(ctx.as_ref());
                }
            }),
        )
    }

    fn click_handler(&self) -> Rc<dyn Fn()> {
        let weak = self.this.clone();
        Rc::new(move || {
            if let Some(ctx) = weak.upgrade() {
                ctx.toggle();
            }
        })
    }

    /// Adopt the persisted flag, wait for the host page to settle, then set up
    pub fn start(&self, initial: FocusState) {
        self.inner.borrow_mut().enabled = initial.enabled;
        log::info!(
            "Focus context starting, focus mode {}",
            if initial.enabled { "on" } else { "off" }
        );
        let settle = self
            .later(self.config.timing.settle_delay_ms, |ctx| ctx.setup_attempt(0));
        self.inner.borrow_mut().retry = Some(settle);
    }

    fn setup_attempt(&self, attempt: u32) {
        self.inner.borrow_mut().phase = Phase::Initializing { attempt };
        let button = self.button();

        let ready = match button.ensure_present(self.enabled(), self.click_handler()) {
            Ok(_) => button.is_visible(),
            Err(e) => {
                log::debug!("Setup attempt {} failed: {}", attempt + 1, e);
                false
            }
        };
        if ready {
            log::info!("Toggle button ready after {} attempt(s)", attempt + 1);
            self.enter_steady();
            return;
        }

        // The first attempt is not a retry
        if attempt >= self.config.retry.max_retries {
            let attempts = attempt + 1;
            log::warn!("{}", FocusError::ExhaustedRetries { attempts });
            self.enter_steady();
            return;
        }

        button.repair_if_hidden();
        let delay = self.config.retry.delay_for(attempt);
        let retry = self.later(delay, move |ctx| ctx.setup_attempt(attempt + 1));
        let previous = self.inner.borrow_mut().retry.replace(retry);
        drop(previous);
    }

    fn enter_steady(&self) {
        let retry = self.inner.borrow_mut().retry.take();
        drop(retry);

        self.reconcile();

        let weak = self.this.clone();
        let observer = self.dom.observe_mutations(Box::new(move || {
            if let Some(ctx) = weak.upgrade() {
                ctx.reconcile();
            }
        }));
        if observer.is_none() {
            log::warn!("Mutation observer unavailable, relying on the safety interval");
        }

        let weak = self.this.clone();
        let safety = self.timers.interval(
            self.config.timing.safety_interval_ms,
            Box::new(move || {
                if let Some(ctx) = weak.upgrade() {
                    ctx.reconcile();
                }
            }),
        );

        let mut inner = self.inner.borrow_mut();
        inner.observer = observer;
        inner.safety = Some(safety);
        inner.phase = Phase::Steady;
    }

    /// One reconciliation pass. Safe to call at any time, any number of times.
    pub fn reconcile(&self) {
        let enabled = self.enabled();
        let button = self.button();

        match button.ensure_present(enabled, self.click_handler()) {
            Ok(true) => log::debug!("Toggle button was missing and has been recreated"),
            Ok(false) => {
                button.ensure_position();
            }
            Err(e) => log::debug!("Toggle button not placed: {}", e),
        }

        self.apply_visual_state(enabled);
        button.set_visual_state(enabled);
        button.update_indicator(enabled);
    }

    fn apply_visual_state(&self, enabled: bool) {
        if !enabled {
            let pending = self.inner.borrow_mut().pending_hide.take();
            if pending.is_some() {
                log::debug!("Cancelled pending sidebar hide");
            }
            drop(pending);
        }

        let locator = self.locator();
        let sidebar = locator.chat_sidebar().ok();
        let containers = locator.collapsible_containers();
        let applied = self.visual().apply(!enabled, sidebar.as_ref(), &containers);
        if !applied.applied {
            log::debug!("Nothing to collapse or expand yet");
        }

        if applied.sidebar_hide_due && self.inner.borrow().pending_hide.is_none() {
            let hide = self.later(self.config.timing.hide_delay_ms, |ctx| ctx.finish_hide());
            self.inner.borrow_mut().pending_hide = Some(hide);
        }
    }

    fn finish_hide(&self) {
        let pending = self.inner.borrow_mut().pending_hide.take();
        drop(pending);
        if !self.enabled() {
            return;
        }
        if let Ok(sidebar) = self.locator().chat_sidebar() {
            self.visual().hide_sidebar(&sidebar);
        }
    }

    /// Flip focus mode from this page. Returns the new value.
    pub fn toggle(&self) -> bool {
        let enabled = !self.enabled();
        self.update(enabled);

        let announcer = self.announcer.borrow().clone();
        if let Some(announce) = announcer {
            announce(enabled);
        }
        if !enabled {
            self.schedule_recovery();
        }
        enabled
    }

    /// Force a value, as asked by the popup
    pub fn set_state(&self, enabled: bool) {
        self.update(enabled);
    }

    fn update(&self, enabled: bool) {
        self.inner.borrow_mut().enabled = enabled;
        self.store.save(FocusState::new(enabled, self.timers.now()));
        log::info!("Focus mode {}", if enabled { "on" } else { "off" });
        self.reconcile();
    }

    /// Drop every trace of focus mode and force it off
    pub fn reset(&self) {
        let (pending, recovery) = {
            let mut inner = self.inner.borrow_mut();
            inner.enabled = false;
            (inner.pending_hide.take(), inner.recovery.take())
        };
        drop(pending);
        drop(recovery);

        self.store.save(FocusState::new(false, self.timers.now()));
        log::info!("Focus mode reset");

        let sidebar = self.locator().chat_sidebar().ok();
        self.visual().reset(sidebar.as_ref());
        let button = self.button();
        button.ensure_position();
        button.set_visual_state(false);
        button.update_indicator(false);
    }

    /// The host page sometimes keeps the list hidden after a show; check
    /// again once the transition is over and fall back to a full reset.
    fn schedule_recovery(&self) {
        let recovery = self.later(self.config.timing.recovery_check_ms, |ctx| {
            ctx.inner.borrow_mut().recovery = None;
            if ctx.enabled() {
                return;
            }
            let Ok(sidebar) = ctx.locator().chat_sidebar() else {
                return;
            };
            if ctx.dom.layout(&sidebar).is_hidden() {
                log::info!("Chat list still hidden after showing, resetting");
                ctx.reset();
            }
        });
        let previous = self.inner.borrow_mut().recovery.replace(recovery);
        drop(previous);
    }

    /// Another view (or this one) changed the shared flag
    pub fn on_storage_change(&self, change: &StorageChange) {
        let Some(enabled) = change.focus_mode() else {
            return;
        };
        log::debug!("Focus mode changed elsewhere: {}", enabled);
        self.inner.borrow_mut().enabled = enabled;
        self.reconcile();
    }

    /// Answer a request from the popup or background. `None` for requests
    /// meant for someone else.
    pub fn handle_request(&self, request: Request) -> Option<Response> {
        match request {
            Request::Toggle => {
                self.toggle();
                Some(Response::ok())
            }
            Request::GetState => Some(Response::State {
                enabled: self.enabled(),
            }),
            Request::SetState { enabled } => {
                self.set_state(enabled);
                Some(Response::ok())
            }
            Request::Reset => {
                self.reset();
                Some(Response::ok())
            }
            Request::FocusModeChanged { .. } => None,
        }
    }
}
