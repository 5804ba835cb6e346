use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// A published value. Clone is an `Arc` increment.
#[derive(Clone)]
pub struct StateValue {
    inner: Arc<dyn Any + Send + Sync>,
}

impl StateValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateValue").finish_non_exhaustive()
    }
}

/// Handle returned by [`StateStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

pub type ChangeHandler = Arc<dyn Fn(&str, &StateValue) + Send + Sync>;

#[derive(Clone)]
struct HandlerEntry {
    id: SubscriptionId,
    pattern: String,
    handler: ChangeHandler,
}

/// Path-keyed published state with topic subscriptions.
///
/// Patterns use `/` separated levels; `+` matches one level and a trailing
/// `#` matches the rest (`search/#` sees both `search/state` and
/// `search/results`). Handlers run synchronously on the publishing thread,
/// after the store lock has been released, so a handler may read the store.
pub struct StateStore {
    values: RwLock<BTreeMap<String, StateValue>>,
    handlers: RwLock<Vec<HandlerEntry>>,
    next_id: AtomicU64,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(BTreeMap::new()),
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Store `value` at `path` and notify matching subscribers.
    pub fn set<T: Any + Send + Sync>(&self, path: &str, value: T) {
        let value = StateValue::new(value);
        self.values.write().insert(path.to_string(), value.clone());
        self.notify(path, &value);
    }

    /// Notify subscribers without storing. Used for one-shot topics such as
    /// map commands, which have no "current" value.
    pub fn broadcast<T: Any + Send + Sync>(&self, path: &str, value: T) {
        self.notify(path, &StateValue::new(value));
    }

    /// Raw value at `path`.
    pub fn get(&self, path: &str) -> Option<StateValue> {
        self.values.read().get(path).cloned()
    }

    /// Typed read of the value at `path`.
    pub fn get_as<T: Any + Clone>(&self, path: &str) -> Option<T> {
        self.get(path).and_then(|v| v.downcast_ref::<T>().cloned())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.values.read().contains_key(path)
    }

    pub fn paths(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    /// Call `handler` for every publish whose path matches `pattern`.
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&str, &StateValue) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push(HandlerEntry {
            id,
            pattern: pattern.to_string(),
            handler: Arc::new(handler),
        });
        id
    }

    /// Remove a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers.write().retain(|e| e.id != id);
    }

    fn notify(&self, path: &str, value: &StateValue) {
        let matching: Vec<ChangeHandler> = self
            .handlers
            .read()
            .iter()
            .filter(|e| topic_matches(&e.pattern, path))
            .map(|e| Arc::clone(&e.handler))
            .collect();
        for handler in matching {
            handler(path, value);
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pat = pattern.split('/');
    let mut top = topic.split('/');
    loop {
        match (pat.next(), top.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(p), Some(t)) if p == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // ========================================================================
    // Values
    // ========================================================================

    #[test]
    fn set_and_get_typed() {
        let store = StateStore::new();
        store.set("search/state", 42u32);
        assert_eq!(store.get_as::<u32>("search/state"), Some(42));
        assert_eq!(store.get_as::<String>("search/state"), None);
        assert!(store.contains("search/state"));
    }

    #[test]
    fn broadcast_is_not_stored() {
        let store = StateStore::new();
        store.broadcast("map/command", 1u8);
        assert!(store.get("map/command").is_none());
        assert!(store.paths().is_empty());
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    #[test]
    fn exact_and_wildcard_subscriptions() {
        let store = StateStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        store.subscribe("search/#", move |path, _| s.lock().unwrap().push(path.to_string()));
        let s = seen.clone();
        store.subscribe("map/command", move |path, _| s.lock().unwrap().push(path.to_string()));

        store.set("search/state", 1u32);
        store.set("search/results", 2u32);
        store.broadcast("map/command", 3u32);
        store.set("other", 4u32);

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["search/state", "search/results", "map/command"]
        );
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = StateStore::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let id = store.subscribe("search/state", move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        store.set("search/state", 1u32);
        store.unsubscribe(id);
        store.set("search/state", 2u32);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_can_read_store() {
        let store = Arc::new(StateStore::new());
        let seen = Arc::new(Mutex::new(None));
        let (st, s) = (store.clone(), seen.clone());
        store.subscribe("search/state", move |path, _| {
            *s.lock().unwrap() = st.get_as::<u32>(path);
        });
        store.set("search/state", 7u32);
        assert_eq!(*seen.lock().unwrap(), Some(7));
    }

    #[test]
    fn topic_matching() {
        assert!(topic_matches("#", "search/state"));
        assert!(topic_matches("search/+", "search/results"));
        assert!(!topic_matches("search/+", "search/a/b"));
        assert!(topic_matches("search/state", "search/state"));
        assert!(!topic_matches("search/state", "search/stat"));
        assert!(!topic_matches("search", "search/state"));
    }
}
