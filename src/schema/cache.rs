use std::sync::Arc;
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{Condvar, Mutex};
use smol_str::SmolStr;
use std::any::TypeId;

use crate::error::SchemaError;
use crate::model::{Model, ModelDescriptor, Record};
use crate::naming::{NamingPolicy, SnakeCaseNaming};
use crate::reflect::Reflect;
use crate::schema::parse::parse;
use crate::schema::schema::Schema;

// ─── Cache key ──────────────────────────────────────────────────────────────

/// Type identity, optionally paired with an alternate table name. Resolving
/// the same type under two table names yields two independent entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SchemaKey {
    type_id: TypeId,
    table: Option<SmolStr>,
}

// ─── Slot ───────────────────────────────────────────────────────────────────

/// One-shot completion signal for an in-flight build. The builder fills the
/// state exactly once; every waiter blocks on the condvar until then and
/// clones the outcome.
pub(crate) struct Slot {
    builder: ThreadId,
    model: &'static str,
    state: Mutex<Option<Result<Arc<Schema>, SchemaError>>>,
    ready: Condvar,
}

impl Slot {
    fn new(model: &'static str) -> Self {
        Slot {
            builder: thread::current().id(),
            model,
            state: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn complete(&self, result: Result<Arc<Schema>, SchemaError>) {
        let mut state = self.state.lock();
        debug_assert!(state.is_none(), "schema slot completed twice");
        *state = Some(result);
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<Arc<Schema>, SchemaError> {
        let mut state = self.state.lock();
        if state.is_none() && thread::current().id() == self.builder {
            // the builder resolved its own key mid-build; waiting would never
            // wake up
            return Err(SchemaError::RecursiveModel { model: self.model });
        }
        loop {
            if let Some(result) = state.as_ref() {
                return result.clone();
            }
            self.ready.wait(&mut state);
        }
    }
}

// ─── Shared state ───────────────────────────────────────────────────────────

pub(crate) struct CacheShared {
    store: DashMap<SchemaKey, Arc<Slot>>,
    naming: Arc<dyn NamingPolicy>,
}

impl CacheShared {
    pub(crate) fn naming(&self) -> &dyn NamingPolicy {
        &*self.naming
    }

    /// Singleflight resolve: the first caller for a key inserts a slot and
    /// builds; everyone else waits on that slot. A failed build evicts
    /// exactly the key that failed so a corrected model can rebuild, while
    /// in-flight waiters still receive the stored error.
    pub(crate) fn resolve(
        self: &Arc<Self>,
        desc: ModelDescriptor,
        table: Option<&str>,
    ) -> Result<Arc<Schema>, SchemaError> {
        let table = table.filter(|t| !t.is_empty());
        let key = SchemaKey {
            type_id: desc.type_id,
            table: table.map(SmolStr::new),
        };

        let (slot, built_here) = match self.store.entry(key.clone()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let slot = Arc::new(Slot::new(desc.type_name));
                entry.insert(Arc::clone(&slot));
                (slot, true)
            }
        };
        if !built_here {
            return slot.wait();
        }

        tracing::debug!(model = desc.type_name, table = ?table, "building schema");
        let result = parse(self, desc, table);
        if let Err(err) = &result {
            tracing::warn!(model = desc.type_name, error = %err, "schema build failed");
            self.store.remove(&key);
        }
        slot.complete(result.clone());
        result
    }
}

// ─── SchemaCache ────────────────────────────────────────────────────────────

/// Process-wide schema store. Constructed once and shared; at most one build
/// per distinct (type, table) key ever runs, and completed schemas are
/// immutable and read without locking.
pub struct SchemaCache {
    shared: Arc<CacheShared>,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::with_naming(Arc::new(SnakeCaseNaming))
    }

    pub fn with_naming(naming: Arc<dyn NamingPolicy>) -> Self {
        SchemaCache {
            shared: Arc::new(CacheShared {
                store: DashMap::new(),
                naming,
            }),
        }
    }

    /// Resolve the schema for a model type, building it on first use.
    /// A non-empty `table` overrides the storage name and forms a composite
    /// cache key.
    pub fn resolve<T: Model>(&self, table: Option<&str>) -> Result<Arc<Schema>, SchemaError> {
        self.shared.resolve(T::describe(), table)
    }

    /// Resolve from a record instance instead of a static type.
    pub fn resolve_record(
        &self,
        record: &dyn Record,
        table: Option<&str>,
    ) -> Result<Arc<Schema>, SchemaError> {
        self.shared.resolve(record.descriptor(), table)
    }

    /// Resolve from an arbitrary runtime value: pointer layers and sequence
    /// layers are stripped until a record shape is found. Anything else is
    /// `UnsupportedDataType`.
    pub fn resolve_value(
        &self,
        value: &dyn Reflect,
        table: Option<&str>,
    ) -> Result<Arc<Schema>, SchemaError> {
        match value.nested_descriptor() {
            Some(desc) => self.shared.resolve(desc, table),
            None => Err(SchemaError::UnsupportedDataType {
                type_name: value.type_name(),
            }),
        }
    }

    /// Number of cached entries, including in-flight builds.
    pub fn len(&self) -> usize {
        self.shared.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.store.is_empty()
    }
}
