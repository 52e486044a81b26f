// ─── Error ──────────────────────────────────────────────────────────────────
use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised by schema construction and path access.
///
/// `Clone` is required: a failed build is stored once on the cache slot and
/// handed to every concurrent waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unsupported data type: {type_name}")]
    UnsupportedDataType { type_name: &'static str },

    #[error("invalid field {schema}.{field}: {type_name} cannot be introspected")]
    InvalidEmbeddedField {
        schema: SmolStr,
        field: SmolStr,
        type_name: &'static str,
    },

    #[error("struct({schema}) DBName repeat: {first},{second}")]
    DuplicateStorageName {
        schema: SmolStr,
        db_name: SmolStr,
        first: SmolStr,
        second: SmolStr,
    },

    #[error("field not exist: {schema}.{name}")]
    FieldNotFound { schema: SmolStr, name: SmolStr },

    #[error("field {schema}.{name} is not an object")]
    FieldNotObject { schema: SmolStr, name: SmolStr },

    #[error("map key {key:?} is not convertible to {expected}")]
    KeyTypeMismatch { expected: &'static str, key: SmolStr },

    #[error("cannot descend into {type_name}: path has remaining keys")]
    CannotDescend { type_name: &'static str },

    #[error("cannot assign {value} to {expected}")]
    CannotAssign { expected: &'static str, value: SmolStr },

    #[error("set requires at least one path key")]
    PathEmpty,

    #[error("recursive model: {model} resolves itself while being built")]
    RecursiveModel { model: &'static str },

    #[error("schema cache was dropped")]
    CacheUnavailable,
}
