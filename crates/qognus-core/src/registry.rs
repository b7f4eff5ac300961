//! Registry of per-surface handles with explicit disposal.
//!
//! The dashboard opens one copilot conversation per chat surface. Handles
//! are created lazily on first use and live until the surface is closed or
//! the application shuts down; both paths go through [`Disposable::dispose`].

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::convert::Infallible;

use tracing::{debug, info};

/// A resource that must be released explicitly when its surface goes away.
pub trait Disposable {
    /// Release the handle's resources. Called exactly once per handle.
    fn dispose(&mut self);
}

/// Handles keyed by surface id.
///
/// Not internally synchronized; shared owners wrap it in a mutex.
#[derive(Debug)]
pub struct HandleRegistry<H: Disposable> {
    handles: HashMap<String, H>,
}

impl<H: Disposable> HandleRegistry<H> {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Return the handle for `id`, creating it with `factory` on first use.
    pub fn get_or_create<F>(&mut self, id: &str, factory: F) -> &mut H
    where
        F: FnOnce() -> H,
    {
        match self.get_or_try_create(id, || Ok::<H, Infallible>(factory())) {
            Ok(handle) => handle,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_create`](Self::get_or_create), for factories that can
    /// fail. Nothing is inserted when `factory` returns an error.
    pub fn get_or_try_create<F, E>(&mut self, id: &str, factory: F) -> Result<&mut H, E>
    where
        F: FnOnce() -> Result<H, E>,
    {
        match self.handles.entry(id.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let handle = factory()?;
                debug!(surface_id = id, "creating handle");
                Ok(entry.insert(handle))
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&H> {
        self.handles.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut H> {
        self.handles.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Ids of all live handles, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handles.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Remove and dispose the handle for `id`.
    ///
    /// Returns `false` if no such handle exists.
    pub fn dispose(&mut self, id: &str) -> bool {
        match self.handles.remove(id) {
            Some(mut handle) => {
                handle.dispose();
                debug!(surface_id = id, "handle disposed");
                true
            }
            None => false,
        }
    }

    /// Dispose every handle. Used at application teardown.
    pub fn dispose_all(&mut self) {
        let count = self.handles.len();
        for (_, mut handle) in self.handles.drain() {
            handle.dispose();
        }
        if count > 0 {
            info!(count, "disposed all handles");
        }
    }
}

impl<H: Disposable> Default for HandleRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counted {
        disposed: Arc<AtomicUsize>,
        turns: u32,
    }

    impl Disposable for Counted {
        fn dispose(&mut self) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counted(counter: &Arc<AtomicUsize>) -> Counted {
        Counted {
            disposed: Arc::clone(counter),
            turns: 0,
        }
    }

    #[test]
    fn get_or_create_creates_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = HandleRegistry::new();
        let mut created = 0;

        registry.get_or_create("chat-main", || {
            created += 1;
            counted(&counter)
        })
        .turns += 1;
        registry.get_or_create("chat-main", || {
            created += 1;
            counted(&counter)
        })
        .turns += 1;

        assert_eq!(created, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("chat-main").unwrap().turns, 2);
    }

    #[test]
    fn get_or_try_create_inserts_nothing_on_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = HandleRegistry::new();

        let err = registry
            .get_or_try_create("grid-main", || Err::<Counted, _>("bad markers"))
            .err();
        assert_eq!(err, Some("bad markers"));
        assert!(registry.is_empty());

        registry
            .get_or_try_create("grid-main", || Ok::<_, &str>(counted(&counter)))
            .unwrap()
            .turns = 3;
        let existing = registry
            .get_or_try_create("grid-main", || Err::<Counted, _>("not called"))
            .unwrap();
        assert_eq!(existing.turns, 3);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn dispose_removes_and_releases() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = HandleRegistry::new();
        registry.get_or_create("a", || counted(&counter));
        registry.get_or_create("b", || counted(&counter));

        assert!(registry.dispose("a"));
        assert!(!registry.contains("a"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        assert!(!registry.dispose("a"));
        assert!(!registry.dispose("missing"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.ids(), vec!["b".to_string()]);
    }

    #[test]
    fn dispose_all_releases_everything() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = HandleRegistry::new();
        for id in ["s1", "s2", "s3"] {
            registry.get_or_create(id, || counted(&counter));
        }
        registry.dispose_all();

        assert!(registry.is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        registry.dispose_all();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn recreated_after_dispose_is_fresh() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = HandleRegistry::new();
        registry.get_or_create("x", || counted(&counter)).turns = 5;
        registry.dispose("x");

        let fresh = registry.get_or_create("x", || counted(&counter));
        assert_eq!(fresh.turns, 0);
        if let Some(h) = registry.get_mut("x") {
            h.turns = 1;
        }
        assert_eq!(registry.get("x").map(|h| h.turns), Some(1));
    }
}
