use std::sync::Arc;

use smol_str::SmolStr;

use crate::error::SchemaError;
use crate::model::Record;
use crate::reflect::{FieldKind, Kind, Reflect};
use crate::schema::schema::Schema;
use crate::value::Value;

// ─── FieldDescriptor ────────────────────────────────────────────────────────

/// Metadata for one record field. Built during the schema scan, immutable
/// afterward, owned by its schema.
///
/// `index` is the fixed positional path from the owning record to the field;
/// it has more than one step only for fields promoted out of an embedded
/// record. `embedded_schema` is set for every record-shaped field, not just
/// anonymous ones.
#[derive(Debug)]
pub struct FieldDescriptor {
    pub name: SmolStr,
    pub db_name: SmolStr,
    pub kind: FieldKind,
    pub index: Vec<usize>,
    pub anonymous: bool,
    pub embedded_schema: Option<Arc<Schema>>,
    pub(crate) owner: SmolStr,
}

impl FieldDescriptor {
    /// Walk the index path and return the field's current value. An unset
    /// option anywhere along the path is a soft miss.
    pub fn get<'a>(&self, record: &'a dyn Record) -> Option<&'a dyn Reflect> {
        let (&first, rest) = self.index.split_first()?;
        let mut value = record.field(first)?;
        for &step in rest {
            let Kind::Record(inner) = value.reflect_ref() else {
                return None;
            };
            value = inner.field(step)?;
        }
        Some(value)
    }

    /// Like [`get`](Self::get), extracting a generic handle.
    pub fn get_value(&self, record: &dyn Record) -> Option<Value> {
        self.get(record).map(Reflect::to_value)
    }

    /// Coerce `value` to the declared field type and assign it. Fails when
    /// the field cannot be reached or the value does not convert.
    pub fn set(&self, record: &mut dyn Record, value: Value) -> Result<(), SchemaError> {
        match self.target_mut(record) {
            Some(target) => target.assign(value),
            None => Err(SchemaError::FieldNotObject {
                schema: self.owner.clone(),
                name: self.name.clone(),
            }),
        }
    }

    fn target_mut<'a>(&self, record: &'a mut dyn Record) -> Option<&'a mut dyn Reflect> {
        let (&first, rest) = self.index.split_first()?;
        let mut value = record.field_mut(first)?;
        for &step in rest {
            value = value.as_record_mut()?.field_mut(step)?;
        }
        Some(value)
    }

    pub(crate) fn record_target_mut<'a>(
        &self,
        record: &'a mut dyn Record,
    ) -> Option<&'a mut dyn Record> {
        self.target_mut(record)?.as_record_mut()
    }
}
