/// The shared focus-mode flag: persistence plus change notification
///
/// Writes are last-write-wins. Every open context hears about every change
/// through its subscription, including its own writes, and re-derives its
/// desired state from the notification rather than applying deltas.

use crate::chrome;
use crate::focus_state::{FocusState, StorageChange};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;

pub trait StateStore {
    /// Persist `state`. Completion is not awaited; failures are logged.
    fn save(&self, state: FocusState);
}

/// `chrome.storage.local`, shared by every tab, the popup and the background
pub struct ChromeStore;

impl ChromeStore {
    pub async fn load() -> FocusState {
        match chrome::load_focus_state().await {
            Ok(state) => state,
            Err(e) => {
                log::warn!("Could not read focus state, assuming off: {}", e);
                FocusState::default()
            }
        }
    }

    /// Forward `chrome.storage.onChanged` for the local area
    pub fn subscribe(listener: impl Fn(&StorageChange) + 'static) {
        chrome::on_storage_changed(move |changes| {
            for change in &changes {
                listener(change);
            }
        });
    }
}

impl StateStore for ChromeStore {
    fn save(&self, state: FocusState) {
        spawn_local(async move {
            if let Err(e) = chrome::save_focus_state(&state).await {
                log::warn!("Failed to persist focus state: {}", e);
            }
        });
    }
}

type Listener = Rc<dyn Fn(&StorageChange)>;

/// In-process store. Change notifications are queued and handed out by
/// `flush`, the way the browser delivers them on a later turn.
pub struct MemoryStore {
    state: RefCell<FocusState>,
    listeners: RefCell<Vec<Listener>>,
    queue: RefCell<VecDeque<StorageChange>>,
}

impl MemoryStore {
    pub fn new(initial: FocusState) -> MemoryStore {
        MemoryStore {
            state: RefCell::new(initial),
            listeners: RefCell::new(Vec::new()),
            queue: RefCell::new(VecDeque::new()),
        }
    }

    pub fn load(&self) -> FocusState {
        *self.state.borrow()
    }

    pub fn subscribe(&self, listener: impl Fn(&StorageChange) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Deliver queued changes to every listener. Returns how many changes went out.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(change) = next else {
                break;
            };
            let listeners: Vec<Listener> = self.listeners.borrow().clone();
            for listener in listeners {
                listener(&change);
            }
            delivered += 1;
        }
        delivered
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new(FocusState::default())
    }
}

impl StateStore for MemoryStore {
    fn save(&self, state: FocusState) {
        let previous = self.state.replace(state);
        self.queue
            .borrow_mut()
            .extend(StorageChange::diff(&previous, &state));
    }
}
