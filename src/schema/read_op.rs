use std::sync::Arc;

use crate::error::SchemaError;
use crate::path::PathKey;
use crate::reflect::{Kind, Reflect};
use crate::schema::cache::CacheShared;
use crate::value::Value;

// ─── Path read ──────────────────────────────────────────────────────────────

/// Single recursive entry point for reads, shared by every container kind.
///
/// Best-effort lookup: anything that merely isn't there (unknown field,
/// absent key, index past the end, unset option) is `Ok(None)`. Only
/// structurally impossible requests are errors.
pub(crate) fn get_in(
    cache: &Arc<CacheShared>,
    value: &dyn Reflect,
    path: &[PathKey],
) -> Result<Option<Value>, SchemaError> {
    let Some((key, rest)) = path.split_first() else {
        // a terminal null (unset option, null value) is absent data
        return match value.to_value() {
            Value::Null => Ok(None),
            v => Ok(Some(v)),
        };
    };

    match value.reflect_ref() {
        Kind::Record(record) => {
            let schema = cache.resolve(record.descriptor(), None)?;
            let name = key.as_name();
            let Some(field) = schema.look_up_field(&name) else {
                return Ok(None);
            };
            match field.get(record) {
                Some(next) => get_in(cache, next, rest),
                None => Ok(None),
            }
        }
        Kind::Mapping(mapping) => match mapping.entry(key)? {
            Some(next) => get_in(cache, next, rest),
            None => Ok(None),
        },
        Kind::Sequence(seq) => {
            let Some(index) = key.as_index() else {
                return Ok(None);
            };
            match seq.element(index) {
                Some(next) => get_in(cache, next, rest),
                None => Ok(None),
            }
        }
        // an unset option reads as missing data, not a dead end
        Kind::Scalar(Value::Null) => Ok(None),
        Kind::Scalar(_) | Kind::Opaque(_) => Err(SchemaError::CannotDescend {
            type_name: value.type_name(),
        }),
    }
}
