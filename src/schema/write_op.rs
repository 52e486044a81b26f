use crate::error::SchemaError;
use crate::model::Record;
use crate::path::PathKey;
use crate::schema::schema::Schema;
use crate::value::Value;

// ─── Path write ─────────────────────────────────────────────────────────────

/// Walks every non-terminal segment through record fields carrying a nested
/// schema; mapping and sequence intermediates are not writable. The final
/// segment's field performs the coercing assignment. Every miss is an error:
/// a mutation must target a real field.
pub(crate) fn set_in(
    schema: &Schema,
    record: &mut dyn Record,
    value: Value,
    path: &[PathKey],
) -> Result<(), SchemaError> {
    match path {
        [] => Err(SchemaError::PathEmpty),
        [last] => {
            let name = last.as_name();
            let field = schema
                .look_up_field(&name)
                .ok_or_else(|| SchemaError::FieldNotFound {
                    schema: schema.name.clone(),
                    name: name.clone(),
                })?;
            field.set(record, value)
        }
        [head, rest @ ..] => {
            let name = head.as_name();
            let field = schema
                .look_up_field(&name)
                .ok_or_else(|| SchemaError::FieldNotFound {
                    schema: schema.name.clone(),
                    name: name.clone(),
                })?;
            let Some(nested) = field.embedded_schema.as_ref() else {
                return Err(SchemaError::FieldNotObject {
                    schema: schema.name.clone(),
                    name,
                });
            };
            let Some(inner) = field.record_target_mut(record) else {
                return Err(SchemaError::FieldNotObject {
                    schema: schema.name.clone(),
                    name,
                });
            };
            set_in(nested, inner, value, rest)
        }
    }
}
