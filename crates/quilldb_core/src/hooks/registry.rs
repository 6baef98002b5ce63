//! Hook subscription and dispatch.

use crate::error::{BoxError, CoreError, CoreResult, HookResult};
use crate::hooks::HookEvent;
use crate::mutation::Modifications;
use parking_lot::RwLock;
use quilldb_codec::{Key, Record};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

/// `creating` callback: may edit the record in place before it is stored.
pub type CreatingHook = dyn Fn(Option<&Key>, &mut Record) -> HookResult<()> + Send + Sync;

/// `reading` callback: returns the record handed to the caller.
pub type ReadingHook = dyn Fn(Record) -> HookResult<Record> + Send + Sync;

/// `updating` callback: may return extra modifications to merge.
pub type UpdatingHook =
    dyn Fn(&Modifications, &Key, &Record) -> HookResult<Option<Modifications>> + Send + Sync;

/// `writing` callback: returns the record that is persisted.
pub type WritingHook = dyn Fn(Record) -> HookResult<Record> + Send + Sync;

/// `deleting` callback: observes a record before removal.
pub type DeletingHook = dyn Fn(&Key, &Record) -> HookResult<()> + Send + Sync;

/// A callback bound to its lifecycle event.
#[derive(Clone)]
pub enum Hook {
    /// See [`CreatingHook`].
    Creating(Arc<CreatingHook>),
    /// See [`ReadingHook`].
    Reading(Arc<ReadingHook>),
    /// See [`UpdatingHook`].
    Updating(Arc<UpdatingHook>),
    /// See [`WritingHook`].
    Writing(Arc<WritingHook>),
    /// See [`DeletingHook`].
    Deleting(Arc<DeletingHook>),
}

impl Hook {
    /// Returns the event this hook subscribes to.
    pub fn event(&self) -> HookEvent {
        match self {
            Hook::Creating(_) => HookEvent::Creating,
            Hook::Reading(_) => HookEvent::Reading,
            Hook::Updating(_) => HookEvent::Updating,
            Hook::Writing(_) => HookEvent::Writing,
            Hook::Deleting(_) => HookEvent::Deleting,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook::{}", self.event())
    }
}

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Handle identifying one subscription. Pass it to
/// [`TableHooks::unsubscribe`] to remove exactly that callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
    event: HookEvent,
}

impl Subscription {
    /// Returns the subscribed event.
    pub fn event(&self) -> HookEvent {
        self.event
    }
}

struct Subscribers<H: ?Sized> {
    list: RwLock<Vec<(u64, Arc<H>)>>,
}

impl<H: ?Sized> Subscribers<H> {
    fn new() -> Self {
        Self {
            list: RwLock::new(Vec::new()),
        }
    }

    fn push(&self, id: u64, hook: Arc<H>) {
        self.list.write().push((id, hook));
    }

    fn remove(&self, id: u64) -> bool {
        let mut list = self.list.write();
        let before = list.len();
        list.retain(|(sid, _)| *sid != id);
        list.len() != before
    }

    fn snapshot(&self) -> Vec<Arc<H>> {
        self.list.read().iter().map(|(_, h)| Arc::clone(h)).collect()
    }

    fn len(&self) -> usize {
        self.list.read().len()
    }
}

/// The hooks registered on one table.
pub struct TableHooks {
    table: String,
    creating: Subscribers<CreatingHook>,
    reading: Subscribers<ReadingHook>,
    updating: Subscribers<UpdatingHook>,
    writing: Subscribers<WritingHook>,
    deleting: Subscribers<DeletingHook>,
}

impl TableHooks {
    /// Creates an empty registry for a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            creating: Subscribers::new(),
            reading: Subscribers::new(),
            updating: Subscribers::new(),
            writing: Subscribers::new(),
            deleting: Subscribers::new(),
        }
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Subscribes a callback. Callbacks of one event run in subscription order.
    pub fn register(&self, hook: Hook) -> Subscription {
        let id = NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed);
        let event = hook.event();
        match hook {
            Hook::Creating(h) => self.creating.push(id, h),
            Hook::Reading(h) => self.reading.push(id, h),
            Hook::Updating(h) => self.updating.push(id, h),
            Hook::Writing(h) => self.writing.push(id, h),
            Hook::Deleting(h) => self.deleting.push(id, h),
        }
        trace!(table = %self.table, %event, id, "hook subscribed");
        Subscription { id, event }
    }

    /// Subscribes a `creating` callback.
    pub fn creating<F>(&self, hook: F) -> Subscription
    where
        F: Fn(Option<&Key>, &mut Record) -> HookResult<()> + Send + Sync + 'static,
    {
        self.register(Hook::Creating(Arc::new(hook)))
    }

    /// Subscribes a `reading` callback.
    pub fn reading<F>(&self, hook: F) -> Subscription
    where
        F: Fn(Record) -> HookResult<Record> + Send + Sync + 'static,
    {
        self.register(Hook::Reading(Arc::new(hook)))
    }

    /// Subscribes an `updating` callback.
    pub fn updating<F>(&self, hook: F) -> Subscription
    where
        F: Fn(&Modifications, &Key, &Record) -> HookResult<Option<Modifications>>
            + Send
            + Sync
            + 'static,
    {
        self.register(Hook::Updating(Arc::new(hook)))
    }

    /// Subscribes a `writing` callback.
    pub fn writing<F>(&self, hook: F) -> Subscription
    where
        F: Fn(Record) -> HookResult<Record> + Send + Sync + 'static,
    {
        self.register(Hook::Writing(Arc::new(hook)))
    }

    /// Subscribes a `deleting` callback.
    pub fn deleting<F>(&self, hook: F) -> Subscription
    where
        F: Fn(&Key, &Record) -> HookResult<()> + Send + Sync + 'static,
    {
        self.register(Hook::Deleting(Arc::new(hook)))
    }

    /// Removes a subscription. Returns false if it was already removed.
    ///
    /// Safe to call from inside a running hook; the dispatch in progress
    /// keeps the snapshot it started with.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let removed = match subscription.event {
            HookEvent::Creating => self.creating.remove(subscription.id),
            HookEvent::Reading => self.reading.remove(subscription.id),
            HookEvent::Updating => self.updating.remove(subscription.id),
            HookEvent::Writing => self.writing.remove(subscription.id),
            HookEvent::Deleting => self.deleting.remove(subscription.id),
        };
        trace!(table = %self.table, event = %subscription.event, removed, "hook unsubscribed");
        removed
    }

    /// Returns the number of callbacks subscribed to an event.
    pub fn count(&self, event: HookEvent) -> usize {
        match event {
            HookEvent::Creating => self.creating.len(),
            HookEvent::Reading => self.reading.len(),
            HookEvent::Updating => self.updating.len(),
            HookEvent::Writing => self.writing.len(),
            HookEvent::Deleting => self.deleting.len(),
        }
    }

    /// Returns true if any callback is subscribed to an event.
    pub fn has(&self, event: HookEvent) -> bool {
        self.count(event) > 0
    }

    pub(crate) fn dispatch_creating(&self, key: Option<&Key>, record: &mut Record) -> CoreResult<()> {
        for hook in self.creating.snapshot() {
            hook(key, record).map_err(|e| self.failed(HookEvent::Creating, e))?;
        }
        Ok(())
    }

    pub(crate) fn dispatch_reading(&self, record: Record) -> CoreResult<Record> {
        self.reading.snapshot().into_iter().try_fold(record, |record, hook| {
            hook(record).map_err(|e| self.failed(HookEvent::Reading, e))
        })
    }

    /// Runs the `updating` callbacks. Each sees the descriptor accumulated
    /// so far; whatever it returns is merged on top.
    pub(crate) fn dispatch_updating(
        &self,
        requested: &Modifications,
        key: &Key,
        record: &Record,
    ) -> CoreResult<Modifications> {
        let mut merged = requested.clone();
        for hook in self.updating.snapshot() {
            let extra = hook(&merged, key, record).map_err(|e| self.failed(HookEvent::Updating, e))?;
            if let Some(extra) = extra {
                merged.merge(extra);
            }
        }
        Ok(merged)
    }

    pub(crate) fn dispatch_writing(&self, record: Record) -> CoreResult<Record> {
        self.writing.snapshot().into_iter().try_fold(record, |record, hook| {
            hook(record).map_err(|e| self.failed(HookEvent::Writing, e))
        })
    }

    pub(crate) fn dispatch_deleting(&self, key: &Key, record: &Record) -> CoreResult<()> {
        for hook in self.deleting.snapshot() {
            hook(key, record).map_err(|e| self.failed(HookEvent::Deleting, e))?;
        }
        Ok(())
    }

    fn failed(&self, event: HookEvent, err: BoxError) -> CoreError {
        warn!(table = %self.table, %event, error = %err, "hook failed");
        CoreError::hook(&self.table, event, err)
    }
}

impl fmt::Debug for TableHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("TableHooks");
        s.field("table", &self.table);
        for event in HookEvent::ALL {
            s.field(event.as_str(), &self.count(event));
        }
        s.finish()
    }
}

/// The hook registries of every table in a database.
#[derive(Debug, Default)]
pub struct HookRegistry {
    tables: HashMap<String, Arc<TableHooks>>,
}

impl HookRegistry {
    /// Creates a registry with one empty [`TableHooks`] per table.
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables
                .into_iter()
                .map(|t| {
                    let t = t.into();
                    (t.clone(), Arc::new(TableHooks::new(t)))
                })
                .collect(),
        }
    }

    /// Returns the hooks of a table.
    pub fn table(&self, name: &str) -> Option<&Arc<TableHooks>> {
        self.tables.get(name)
    }

    /// Subscribes a callback on a table.
    pub fn register(&self, table: &str, hook: Hook) -> CoreResult<Subscription> {
        let hooks = self.tables.get(table).ok_or_else(|| CoreError::UnknownTable {
            table: table.to_string(),
        })?;
        Ok(hooks.register(hook))
    }

    /// Removes a subscription from a table.
    pub fn unregister(&self, table: &str, subscription: &Subscription) -> bool {
        self.tables
            .get(table)
            .is_some_and(|hooks| hooks.unsubscribe(subscription))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use quilldb_codec::{record, Value};

    #[test]
    fn writing_hooks_compose_in_order() {
        let hooks = TableHooks::new("notes");
        hooks.writing(|mut r| {
            r.set("trail", "a");
            Ok(r)
        });
        hooks.writing(|mut r| {
            let prev = r.get("trail").and_then(Value::as_text).unwrap_or("").to_string();
            r.set("trail", format!("{prev}b"));
            Ok(r)
        });
        let out = hooks.dispatch_writing(record! { "x" => 1 }).unwrap();
        assert_eq!(out.get("trail"), Some(&Value::from("ab")));
    }

    #[test]
    fn updating_hooks_merge_on_top() {
        let hooks = TableHooks::new("notes");
        hooks.updating(|mods, _, _| {
            assert!(mods.contains("title"));
            Ok(Some(Modifications::new().set("edited", true)))
        });
        hooks.updating(|_, _, _| Ok(None));
        let requested = Modifications::new().set("title", "new");
        let merged = hooks
            .dispatch_updating(&requested, &Key::Integer(1), &record! {})
            .unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn hook_error_is_tagged() {
        let hooks = TableHooks::new("notes");
        hooks.creating(|_, _| Err("nope".into()));
        let err = hooks.dispatch_creating(None, &mut record! {}).unwrap_err();
        assert!(matches!(
            err,
            CoreError::HookExecution {
                event: HookEvent::Creating,
                ..
            }
        ));
    }

    #[test]
    fn unsubscribe_removes_exact_callback() {
        let hooks = TableHooks::new("notes");
        let a = hooks.deleting(|_, _| Ok(()));
        let b = hooks.deleting(|_, _| Ok(()));
        assert!(hooks.unsubscribe(&a));
        assert!(!hooks.unsubscribe(&a));
        assert_eq!(hooks.count(HookEvent::Deleting), 1);
        assert!(hooks.unsubscribe(&b));
        assert!(!hooks.has(HookEvent::Deleting));
    }

    #[test]
    fn unsubscribe_during_dispatch_uses_snapshot() {
        let hooks = Arc::new(TableHooks::new("notes"));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        {
            let hooks2 = Arc::clone(&hooks);
            let victim = Arc::clone(&victim);
            let calls = Arc::clone(&calls);
            hooks.reading(move |r| {
                calls.lock().push("first");
                if let Some(sub) = victim.lock().take() {
                    hooks2.unsubscribe(&sub);
                }
                Ok(r)
            });
        }
        {
            let calls = Arc::clone(&calls);
            let sub = hooks.reading(move |r| {
                calls.lock().push("second");
                Ok(r)
            });
            *victim.lock() = Some(sub);
        }

        hooks.dispatch_reading(record! {}).unwrap();
        hooks.dispatch_reading(record! {}).unwrap();
        assert_eq!(*calls.lock(), vec!["first", "second", "first"]);
    }

    #[test]
    fn registry_routes_by_table() {
        fn identity(r: Record) -> HookResult<Record> {
            Ok(r)
        }

        let registry = HookRegistry::new(["a", "b"]);
        let sub = registry
            .register("a", Hook::Reading(Arc::new(identity)))
            .unwrap();
        assert_eq!(sub.event(), HookEvent::Reading);
        assert!(registry.register("c", Hook::Reading(Arc::new(identity))).is_err());
        assert!(!registry.unregister("b", &sub));
        assert!(registry.unregister("a", &sub));
    }
}
