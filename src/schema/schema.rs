use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, Weak};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::error::SchemaError;
use crate::model::Record;
use crate::path::PathKey;
use crate::reflect::Reflect;
use crate::schema::cache::CacheShared;
use crate::schema::field::FieldDescriptor;
use crate::schema::{read_op, write_op};
use crate::value::Value;

// ─── Schema ─────────────────────────────────────────────────────────────────

/// Compiled metadata for one record type.
///
/// Built exactly once per cache key, immutable afterward: concurrent readers
/// never synchronize. `fields` holds the declared non-anonymous fields in
/// declaration order, `embedded` the anonymous ones whose fields were
/// promoted into the name table.
#[derive(Debug)]
pub struct Schema {
    pub name: SmolStr,
    pub table: SmolStr,
    pub model: TypeId,
    pub fields: Vec<Arc<FieldDescriptor>>,
    pub embedded: Vec<Arc<FieldDescriptor>>,
    /// Declared plus promoted fields, in promotion order. The scan source for
    /// storage-name checks and iteration.
    pub(crate) flattened: Vec<Arc<FieldDescriptor>>,
    pub(crate) fields_by_name: FxHashMap<SmolStr, Arc<FieldDescriptor>>,
    pub(crate) fields_by_db_name: FxHashMap<SmolStr, Arc<FieldDescriptor>>,
    pub(crate) cache: Weak<CacheShared>,
    pub(crate) probe: fn() -> Box<dyn Record>,
}

impl Schema {
    /// Look up a field by storage name first, then by declared name.
    pub fn look_up_field(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.fields_by_db_name
            .get(name)
            .or_else(|| self.fields_by_name.get(name))
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.fields_by_name.get(name)
    }

    pub fn field_by_db_name(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.fields_by_db_name.get(name)
    }

    /// Storage name for a field addressed by either of its names.
    pub fn field_db_name(&self, name: &str) -> Option<&str> {
        self.look_up_field(name).map(|f| f.db_name.as_str())
    }

    /// All addressable fields: declared ones, then those promoted from
    /// embeds, in promotion order.
    pub fn iter_fields(&self) -> impl Iterator<Item = &Arc<FieldDescriptor>> {
        self.flattened.iter()
    }

    /// Fresh default instance of the model type.
    pub fn new_record(&self) -> Box<dyn Record> {
        (self.probe)()
    }

    /// Read the value at `path`, descending through records, mappings, and
    /// sequences. Missing names, absent keys, and out-of-range indexes are
    /// soft misses (`Ok(None)`); descending past a scalar or handing a map an
    /// inconvertible key is an error. An empty path returns the whole value.
    pub fn get(&self, value: &dyn Reflect, path: &[PathKey]) -> Result<Option<Value>, SchemaError> {
        let cache = self.cache.upgrade().ok_or(SchemaError::CacheUnavailable)?;
        read_op::get_in(&cache, value, path)
    }

    /// Write `value` at `path`. Every non-terminal segment must name a
    /// record-shaped field; the final segment's field performs the coercing
    /// assignment. Unlike reads, a miss anywhere is an error.
    pub fn set(
        &self,
        record: &mut dyn Record,
        value: Value,
        path: &[PathKey],
    ) -> Result<(), SchemaError> {
        write_op::set_in(self, record, value, path)
    }

    /// Single-key read without path traversal.
    pub fn get_field(&self, record: &dyn Record, name: &str) -> Option<Value> {
        self.look_up_field(name)?.get_value(record)
    }

    /// Single-key typed write without path traversal.
    pub fn set_field(
        &self,
        record: &mut dyn Record,
        name: &str,
        value: Value,
    ) -> Result<(), SchemaError> {
        let field = self
            .look_up_field(name)
            .ok_or_else(|| SchemaError::FieldNotFound {
                schema: self.name.clone(),
                name: SmolStr::new(name),
            })?;
        field.set(record, value)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.table)
    }
}
