//! In-memory collection state for a page.
//!
//! Holds the samples of the list page or the comments of a detail page as
//! last fetched, and applies targeted local patches after server-confirmed
//! mutations so the page never re-fetches the whole collection. All
//! operations are synchronous and perform no I/O; interested parties
//! subscribe a callback at composition time and are notified after every
//! change.

use tracing::debug;

/// A resource addressable by its server-assigned id.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Loading lifecycle of a page's collection view.
///
/// `Loaded` goes back to `Loading` only through an explicit refresh request;
/// `Failed` keeps its message and never auto-retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

pub struct ResourceListStore<T: Keyed> {
    items: Vec<T>,
    state: LoadState,
    subscribers: Vec<Box<dyn Fn(&[T])>>,
}

impl<T: Keyed> Default for ResourceListStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> ResourceListStore<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            state: LoadState::Idle,
            subscribers: Vec::new(),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Register a change callback, fired after every collection mutation.
    pub fn subscribe(&mut self, callback: impl Fn(&[T]) + 'static) {
        self.subscribers.push(Box::new(callback));
    }

    /// Enter `Loading` for the initial fetch. No-op once `Loaded`; a loaded
    /// collection re-enters `Loading` only via [`begin_refresh`].
    ///
    /// [`begin_refresh`]: Self::begin_refresh
    pub fn begin_load(&mut self) -> bool {
        match self.state {
            LoadState::Idle | LoadState::Failed(_) => {
                self.state = LoadState::Loading;
                true
            }
            _ => false,
        }
    }

    /// Explicit refresh request: re-enter `Loading` from `Loaded`.
    pub fn begin_refresh(&mut self) -> bool {
        match self.state {
            LoadState::Loaded => {
                self.state = LoadState::Loading;
                true
            }
            _ => self.begin_load(),
        }
    }

    /// Complete a load with the server's collection, in server order.
    pub fn finish_load(&mut self, items: Vec<T>) {
        self.state = LoadState::Loaded;
        self.replace_all(items);
    }

    /// Record a failed load. The message is shown to the user as-is.
    pub fn fail_load(&mut self, message: String) {
        self.state = LoadState::Failed(message);
    }

    /// Full replacement after a fetch or refresh.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
        self.notify();
    }

    /// Apply `updater` to the one element with the given id, leaving the
    /// rest and their order untouched. No-op when the id is absent (the
    /// resource is already gone).
    pub fn patch_by_id(&mut self, id: &str, updater: impl FnOnce(&mut T)) -> bool {
        match self.items.iter_mut().find(|item| item.key() == id) {
            Some(item) => {
                updater(item);
                self.notify();
                true
            }
            None => {
                debug!(id, "Patch target not in collection, ignoring");
                false
            }
        }
    }

    /// Append a newly created resource.
    pub fn insert_one(&mut self, item: T) {
        self.items.push(item);
        self.notify();
    }

    /// Remove the element with the given id. No-op when absent.
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.key() != id);
        if self.items.len() != before {
            self.notify();
            true
        } else {
            debug!(id, "Removal target not in collection, ignoring");
            false
        }
    }

    fn notify(&self) {
        for subscriber in &self.subscribers {
            subscriber(&self.items);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        text: String,
    }

    impl Keyed for Item {
        fn key(&self) -> &str {
            &self.id
        }
    }

    fn item(id: &str, text: &str) -> Item {
        Item {
            id: id.to_string(),
            text: text.to_string(),
        }
    }

    fn seeded() -> ResourceListStore<Item> {
        let mut store = ResourceListStore::new();
        store.finish_load(vec![item("a", "one"), item("b", "two"), item("c", "three")]);
        store
    }

    #[test]
    fn test_patch_by_id_updates_only_target() {
        let mut store = seeded();
        assert!(store.patch_by_id("b", |i| i.text = "TWO".to_string()));
        assert_eq!(store.items()[0], item("a", "one"));
        assert_eq!(store.items()[1], item("b", "TWO"));
        assert_eq!(store.items()[2], item("c", "three"));
    }

    #[test]
    fn test_patch_missing_id_is_noop() {
        let mut store = seeded();
        let before = store.items().to_vec();
        assert!(!store.patch_by_id("zzz", |i| i.text = "nope".to_string()));
        assert_eq!(store.items(), before.as_slice());
    }

    #[test]
    fn test_insert_then_remove_restores_original() {
        let mut store = seeded();
        let before = store.items().to_vec();
        store.insert_one(item("d", "four"));
        assert_eq!(store.items().len(), 4);
        assert!(store.remove_by_id("d"));
        assert_eq!(store.items(), before.as_slice());
    }

    #[test]
    fn test_remove_missing_id_is_noop() {
        let mut store = seeded();
        assert!(!store.remove_by_id("zzz"));
        assert_eq!(store.items().len(), 3);
    }

    #[test]
    fn test_sequential_patches_preserve_order() {
        let mut store = seeded();
        assert!(store.patch_by_id("c", |i| i.text = "III".to_string()));
        assert!(store.patch_by_id("a", |i| i.text = "I".to_string()));
        let ids: Vec<&str> = store.items().iter().map(|i| i.key()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_state_machine_initial_load() {
        let mut store: ResourceListStore<Item> = ResourceListStore::new();
        assert_eq!(*store.state(), LoadState::Idle);
        assert!(store.begin_load());
        assert_eq!(*store.state(), LoadState::Loading);
        store.finish_load(vec![]);
        assert_eq!(*store.state(), LoadState::Loaded);
    }

    #[test]
    fn test_loaded_only_reloads_via_refresh() {
        let mut store = seeded();
        assert!(!store.begin_load());
        assert_eq!(*store.state(), LoadState::Loaded);
        assert!(store.begin_refresh());
        assert_eq!(*store.state(), LoadState::Loading);
    }

    #[test]
    fn test_failed_keeps_message_until_retried() {
        let mut store: ResourceListStore<Item> = ResourceListStore::new();
        store.begin_load();
        store.fail_load("boom".to_string());
        assert_eq!(*store.state(), LoadState::Failed("boom".to_string()));
        // An explicit retry is allowed
        assert!(store.begin_load());
    }

    #[test]
    fn test_subscriber_notified_on_mutations() {
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        let mut store: ResourceListStore<Item> = ResourceListStore::new();
        store.subscribe(move |_| seen.set(seen.get() + 1));

        store.replace_all(vec![item("a", "one")]);
        store.patch_by_id("a", |i| i.text = "ONE".to_string());
        store.remove_by_id("a");
        assert_eq!(count.get(), 3);
    }
}
