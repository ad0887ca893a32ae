//! Typed, identity-keyed property bags.
//!
//! A [`Context`] maps [`Key<T>`] handles to values of type `T`. Lookups go by
//! key identity, never by the display name, so two keys created with the same
//! name are distinct. Libraries can therefore keep "private" keys that no
//! other component can collide with.
//!
//! Keys are usually declared once as statics:
//!
//! ```
//! use std::sync::LazyLock;
//! use std::time::Duration;
//! use smithy_client_core::{Context, Key};
//!
//! static TIMEOUT: LazyLock<Key<Duration>> = LazyLock::new(|| Key::new("timeout"));
//!
//! let mut ctx = Context::new();
//! ctx.put(&TIMEOUT, Duration::from_secs(5));
//! assert_eq!(ctx.get(&TIMEOUT), Some(&Duration::from_secs(5)));
//! ```
//!
//! Values are stored behind an `Arc`, so every copy operation is shallow:
//! interior-mutable values stay shared between the source and the copy.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ContextError;

static NEXT_KEY_ID: AtomicUsize = AtomicUsize::new(1);

/// A typed handle used to store and look up values in a [`Context`].
pub struct Key<T> {
    id: usize,
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    /// Create a new key. Every call returns a distinct key, even for equal names.
    pub fn new(name: &'static str) -> Self {
        Self {
            id: NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed),
            name,
            _value: PhantomData,
        }
    }

    /// Display name of the key.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.name).finish()
    }
}

#[derive(Clone)]
struct Entry {
    name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

/// A heterogeneous map from [`Key<T>`] to `T`.
///
/// `Context` is not meant to be shared between concurrent writers. The
/// pipeline copies a context before handing it to another stage and freezes
/// it with [`Context::unmodifiable_copy`] when no more writes are expected.
#[derive(Clone, Default)]
pub struct Context {
    entries: HashMap<usize, Entry>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous value for the key.
    pub fn put<T: Send + Sync + 'static>(&mut self, key: &Key<T>, value: T) {
        self.entries.insert(
            key.id,
            Entry {
                name: key.name,
                value: Arc::new(value),
            },
        );
    }

    /// Builder-style variant of [`put`](Self::put).
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, key: &Key<T>, value: T) -> Self {
        self.put(key, value);
        self
    }

    /// Get the value stored for a key.
    pub fn get<T: 'static>(&self, key: &Key<T>) -> Option<&T> {
        self.entries
            .get(&key.id)
            .and_then(|entry| entry.value.downcast_ref::<T>())
    }

    /// Get the value stored for a key, failing if it is absent.
    pub fn expect<T: 'static>(&self, key: &Key<T>) -> Result<&T, ContextError> {
        self.get(key).ok_or(ContextError::NotFound { key: key.name })
    }

    /// Check whether a value is stored for a key.
    pub fn contains<T>(&self, key: &Key<T>) -> bool {
        self.entries.contains_key(&key.id)
    }

    /// Remove the value stored for a key. Returns whether a value was present.
    pub fn remove<T>(&mut self, key: &Key<T>) -> bool {
        self.entries.remove(&key.id).is_some()
    }

    /// Get the value for a key, computing and storing it first if absent.
    pub fn get_or_insert_with<T, F>(&mut self, key: &Key<T>, f: F) -> &T
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let entry = self.entries.entry(key.id).or_insert_with(|| Entry {
            name: key.name,
            value: Arc::new(f()),
        });
        entry
            .value
            .downcast_ref::<T>()
            .expect("key id is bound to a single value type")
    }

    /// Copy every entry of this context into `target`, overwriting entries
    /// that exist in both. Values are shared, not cloned.
    pub fn copy_to(&self, target: &mut Context) {
        for (id, entry) in &self.entries {
            target.entries.insert(*id, entry.clone());
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the context has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A read-only view that borrows this context.
    pub fn unmodifiable_view(&self) -> ContextView<'_> {
        ContextView { inner: self }
    }

    /// A read-only snapshot of the current entries.
    pub fn unmodifiable_copy(&self) -> FrozenContext {
        FrozenContext {
            inner: Arc::new(self.clone()),
        }
    }

    /// A writable snapshot that is independent of this context.
    pub fn modifiable_copy(&self) -> Context {
        self.clone()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.values().map(|e| e.name).collect();
        names.sort_unstable();
        f.debug_struct("Context").field("keys", &names).finish()
    }
}

/// Read-only borrowed view of a [`Context`].
#[derive(Clone, Copy, Debug)]
pub struct ContextView<'a> {
    inner: &'a Context,
}

impl Deref for ContextView<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.inner
    }
}

/// Read-only, cheaply clonable snapshot of a [`Context`].
#[derive(Clone, Debug, Default)]
pub struct FrozenContext {
    inner: Arc<Context>,
}

impl FrozenContext {
    /// Create a writable copy of the snapshot.
    pub fn modifiable_copy(&self) -> Context {
        (*self.inner).clone()
    }
}

impl Deref for FrozenContext {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    static NAME: LazyLock<Key<String>> = LazyLock::new(|| Key::new("name"));

    #[test]
    fn test_put_and_get() {
        let mut ctx = Context::new();
        ctx.put(&NAME, "sprocket".to_string());
        assert_eq!(ctx.get(&NAME).map(String::as_str), Some("sprocket"));
        assert!(ctx.contains(&NAME));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_keys_with_same_name_are_distinct() {
        let a: Key<u32> = Key::new("dup");
        let b: Key<u32> = Key::new("dup");
        let ctx = Context::new().with(&a, 1);
        assert_eq!(ctx.get(&a), Some(&1));
        assert_eq!(ctx.get(&b), None);
    }

    #[test]
    fn test_expect_missing_key() {
        let key: Key<u32> = Key::new("missing");
        let err = Context::new().expect(&key).unwrap_err();
        assert!(matches!(err, ContextError::NotFound { key: "missing" }));
    }

    #[test]
    fn test_get_or_insert_with_only_computes_once() {
        let key: Key<u32> = Key::new("lazy");
        let mut ctx = Context::new();
        assert_eq!(*ctx.get_or_insert_with(&key, || 7), 7);
        assert_eq!(*ctx.get_or_insert_with(&key, || 9), 7);
    }

    #[test]
    fn test_copy_to_is_shallow() {
        let key: Key<Mutex<Vec<u32>>> = Key::new("shared");
        let source = Context::new().with(&key, Mutex::new(vec![1]));
        let mut target = Context::new();
        source.copy_to(&mut target);

        target.get(&key).unwrap().lock().unwrap().push(2);
        assert_eq!(*source.get(&key).unwrap().lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_copy_to_overwrites_target_entries() {
        let key: Key<u32> = Key::new("n");
        let source = Context::new().with(&key, 2);
        let mut target = Context::new().with(&key, 1);
        source.copy_to(&mut target);
        assert_eq!(target.get(&key), Some(&2));
    }

    #[test]
    fn test_unmodifiable_copy_is_a_snapshot() {
        let key: Key<u32> = Key::new("n");
        let mut ctx = Context::new().with(&key, 1);
        let frozen = ctx.unmodifiable_copy();
        ctx.put(&key, 2);
        assert_eq!(frozen.get(&key), Some(&1));
        assert_eq!(ctx.get(&key), Some(&2));
    }

    #[test]
    fn test_modifiable_copy_is_independent() {
        let key: Key<u32> = Key::new("n");
        let ctx = Context::new().with(&key, 1);
        let mut copy = ctx.modifiable_copy();
        copy.put(&key, 5);
        assert_eq!(ctx.get(&key), Some(&1));
        assert_eq!(copy.get(&key), Some(&5));
    }

    #[test]
    fn test_view_reads_source() {
        let key: Key<u32> = Key::new("n");
        let ctx = Context::new().with(&key, 3);
        let view = ctx.unmodifiable_view();
        assert_eq!(view.get(&key), Some(&3));
    }

    #[test]
    fn test_remove() {
        let key: Key<u32> = Key::new("n");
        let mut ctx = Context::new().with(&key, 3);
        assert!(ctx.remove(&key));
        assert!(!ctx.remove(&key));
        assert!(ctx.is_empty());
    }
}
