use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::error::SchemaError;
use crate::model::ModelDescriptor;
use crate::reflect::FieldKind;
use crate::schema::cache::CacheShared;
use crate::schema::field::FieldDescriptor;
use crate::schema::schema::Schema;

// ─── Build algorithm ────────────────────────────────────────────────────────

/// One-time schema construction, run by the cache's sole builder for a key.
///
/// Scans the declared fields in order, classifies each through a probe
/// instance, resolves nested schemas re-entrantly, flattens embedded fields
/// (first declared name wins), and verifies storage-name uniqueness over the
/// flattened field set.
pub(crate) fn parse(
    cache: &Arc<CacheShared>,
    desc: ModelDescriptor,
    table: Option<&str>,
) -> Result<Arc<Schema>, SchemaError> {
    let probe = (desc.probe)();
    let schema_name = SmolStr::new(desc.type_name);

    // an explicit alternate name beats the instance override, which beats
    // the naming policy
    let table = match table {
        Some(t) => SmolStr::new(t),
        None => match desc.storage_name {
            Some(s) => SmolStr::new(s),
            None => cache.naming().table_name(desc.type_name),
        },
    };

    let mut fields: Vec<Arc<FieldDescriptor>> = Vec::new();
    let mut embedded: Vec<Arc<FieldDescriptor>> = Vec::new();
    let mut flattened: Vec<Arc<FieldDescriptor>> = Vec::new();
    let mut by_name: FxHashMap<SmolStr, Arc<FieldDescriptor>> = FxHashMap::default();

    for (i, def) in desc.fields.iter().enumerate() {
        let value = probe
            .field(i)
            .ok_or_else(|| SchemaError::InvalidEmbeddedField {
                schema: schema_name.clone(),
                field: SmolStr::new(def.name),
                type_name: desc.type_name,
            })?;

        let kind = value.classify();
        if let FieldKind::Opaque(type_name) = kind {
            return Err(SchemaError::InvalidEmbeddedField {
                schema: schema_name.clone(),
                field: SmolStr::new(def.name),
                type_name,
            });
        }

        // every record-shaped field gets its nested schema up front; map and
        // sequence elements are introspected lazily at access time
        let embedded_schema = match kind {
            FieldKind::Record => match value.nested_descriptor() {
                Some(nested) => Some(CacheShared::resolve(cache, nested, None)?),
                None => None,
            },
            _ => None,
        };

        let db_name = match def.column {
            None | Some("") | Some("inline") => cache.naming().column_name(&table, def.name),
            Some(column) => SmolStr::new(column),
        };

        let descriptor = Arc::new(FieldDescriptor {
            name: SmolStr::new(def.name),
            db_name,
            kind,
            index: vec![i],
            anonymous: def.anonymous,
            embedded_schema,
            owner: schema_name.clone(),
        });

        if def.anonymous {
            if descriptor.embedded_schema.is_none() {
                return Err(SchemaError::InvalidEmbeddedField {
                    schema: schema_name.clone(),
                    field: descriptor.name.clone(),
                    type_name: value.type_name(),
                });
            }
            embedded.push(descriptor);
        } else {
            fields.push(Arc::clone(&descriptor));
            by_name.insert(descriptor.name.clone(), Arc::clone(&descriptor));
            flattened.push(descriptor);
        }
    }

    // promote embedded fields; a name already present (declared directly or
    // promoted from an earlier embed) shadows later ones, without error
    for emb in &embedded {
        let Some(nested) = emb.embedded_schema.as_ref() else {
            continue;
        };
        for inner in nested.iter_fields() {
            if by_name.contains_key(&inner.name) {
                continue;
            }
            let mut index = emb.index.clone();
            index.extend_from_slice(&inner.index);
            let promoted = Arc::new(FieldDescriptor {
                name: inner.name.clone(),
                db_name: inner.db_name.clone(),
                kind: inner.kind,
                index,
                anonymous: false,
                embedded_schema: inner.embedded_schema.clone(),
                owner: schema_name.clone(),
            });
            by_name.insert(promoted.name.clone(), Arc::clone(&promoted));
            flattened.push(promoted);
        }
    }

    // storage names must be unique across the flattened field set
    let mut by_db_name: FxHashMap<SmolStr, Arc<FieldDescriptor>> = FxHashMap::default();
    for field in &flattened {
        if field.db_name.is_empty() {
            continue;
        }
        if let Some(prev) = by_db_name.insert(field.db_name.clone(), Arc::clone(field)) {
            return Err(SchemaError::DuplicateStorageName {
                schema: schema_name,
                db_name: field.db_name.clone(),
                first: prev.name.clone(),
                second: field.name.clone(),
            });
        }
    }

    Ok(Arc::new(Schema {
        name: schema_name,
        table,
        model: desc.type_id,
        fields,
        embedded,
        flattened,
        fields_by_name: by_name,
        fields_by_db_name: by_db_name,
        cache: Arc::downgrade(cache),
        probe: desc.probe,
    }))
}
