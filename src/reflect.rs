use smol_str::{SmolStr, format_smolstr};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use crate::error::SchemaError;
use crate::model::{ModelDescriptor, Record};
use crate::path::PathKey;
use crate::value::{FastMap, Value};

// ─── Kind ───────────────────────────────────────────────────────────────────

/// Runtime classification of a value, computed once per traversal step and
/// dispatched by pattern matching. The closed set of shapes the accessor
/// understands.
pub enum Kind<'a> {
    Record(&'a dyn Record),
    Mapping(&'a dyn Mapping),
    Sequence(&'a dyn Sequence),
    Scalar(Value),
    /// A payload the schema layer cannot introspect (channels, callbacks,
    /// raw handles). Carries the payload's type name for error reporting.
    Opaque(&'static str),
}

/// Type-shape classification of a declared field, independent of any
/// particular value. Unlike [`Kind`], this sees through an unset `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Record,
    Mapping,
    Sequence,
    Scalar,
    Opaque(&'static str),
}

pub(crate) fn cannot_assign(expected: &'static str, value: &Value) -> SchemaError {
    SchemaError::CannotAssign {
        expected,
        value: format_smolstr!("{}", value),
    }
}

// ─── Reflect ────────────────────────────────────────────────────────────────

/// Introspection surface for every type that can appear in a record field.
///
/// `reflect_ref` classifies the current value for traversal; `classify` and
/// `nested_descriptor` classify the declared type for schema construction;
/// `assign` performs the coercing write used by field setters.
pub trait Reflect: Any {
    fn type_name(&self) -> &'static str;

    fn reflect_ref(&self) -> Kind<'_>;

    fn classify(&self) -> FieldKind {
        match self.reflect_ref() {
            Kind::Record(_) => FieldKind::Record,
            Kind::Mapping(_) => FieldKind::Mapping,
            Kind::Sequence(_) => FieldKind::Sequence,
            Kind::Scalar(_) => FieldKind::Scalar,
            Kind::Opaque(name) => FieldKind::Opaque(name),
        }
    }

    /// Descriptor of the record type this value resolves to, if the declared
    /// type is record-shaped (possibly behind `Option`/`Box`/sequence layers).
    fn nested_descriptor(&self) -> Option<ModelDescriptor> {
        None
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        None
    }

    /// Coerce `value` to this type and overwrite self. Exact matches are
    /// cheap; otherwise numeric widening and string↔number conversions are
    /// attempted before giving up.
    fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
        Err(cannot_assign(self.type_name(), &value))
    }

    /// Extract the current value as a generic handle. Records become maps of
    /// their declared fields, opaque payloads become null.
    fn to_value(&self) -> Value {
        match self.reflect_ref() {
            Kind::Record(record) => {
                let desc = record.descriptor();
                let mut map = FastMap::new();
                for (i, def) in desc.fields.iter().enumerate() {
                    if let Some(field) = record.field(i) {
                        map.insert(SmolStr::new(def.name), field.to_value());
                    }
                }
                Value::Map(map)
            }
            Kind::Mapping(mapping) => Value::Map(
                mapping
                    .entries()
                    .into_iter()
                    .map(|(k, v)| (k, v.to_value()))
                    .collect(),
            ),
            Kind::Sequence(seq) => Value::Seq(
                (0..seq.len())
                    .filter_map(|i| seq.element(i))
                    .map(Reflect::to_value)
                    .collect(),
            ),
            Kind::Scalar(v) => v,
            Kind::Opaque(_) => Value::Null,
        }
    }
}

// ─── Mapping / Sequence ─────────────────────────────────────────────────────

/// Dynamic view over a map container. `entry` coerces the path key to the
/// declared key type; a key that cannot be converted is a hard error, a key
/// that is absent is a soft miss.
pub trait Mapping {
    fn key_type(&self) -> &'static str;
    fn entry(&self, key: &PathKey) -> Result<Option<&dyn Reflect>, SchemaError>;
    fn entries(&self) -> Vec<(SmolStr, &dyn Reflect)>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dynamic view over an ordered container indexed by position.
pub trait Sequence {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn element(&self, index: usize) -> Option<&dyn Reflect>;
}

/// Map key types the accessor can coerce a [`PathKey`] into.
pub trait MapKey: Sized {
    const TYPE_NAME: &'static str;
    fn from_path_key(key: &PathKey) -> Option<Self>;
    fn display(&self) -> SmolStr;
}

impl MapKey for SmolStr {
    const TYPE_NAME: &'static str = "string";

    fn from_path_key(key: &PathKey) -> Option<Self> {
        Some(key.as_name())
    }

    fn display(&self) -> SmolStr {
        self.clone()
    }
}

impl MapKey for String {
    const TYPE_NAME: &'static str = "string";

    fn from_path_key(key: &PathKey) -> Option<Self> {
        Some(key.as_name().to_string())
    }

    fn display(&self) -> SmolStr {
        SmolStr::new(self)
    }
}

macro_rules! impl_map_key_int {
    ($($t:ty => $name:literal),* $(,)?) => {$(
        impl MapKey for $t {
            const TYPE_NAME: &'static str = $name;

            fn from_path_key(key: &PathKey) -> Option<Self> {
                <$t>::try_from(key.as_i64()?).ok()
            }

            fn display(&self) -> SmolStr {
                format_smolstr!("{}", self)
            }
        }
    )*};
}

impl_map_key_int!(i64 => "i64", i32 => "i32", u64 => "u64", u32 => "u32");

// ─── Scalars ────────────────────────────────────────────────────────────────

macro_rules! impl_reflect_signed {
    ($($t:ty),*) => {$(
        impl Reflect for $t {
            fn type_name(&self) -> &'static str {
                std::any::type_name::<$t>()
            }

            fn reflect_ref(&self) -> Kind<'_> {
                Kind::Scalar(Value::from(*self))
            }

            fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
                let n = value
                    .coerce_i64()
                    .and_then(|n| <$t>::try_from(n).ok())
                    .ok_or_else(|| cannot_assign(std::any::type_name::<$t>(), &value))?;
                *self = n;
                Ok(())
            }
        }
    )*};
}

macro_rules! impl_reflect_unsigned {
    ($($t:ty),*) => {$(
        impl Reflect for $t {
            fn type_name(&self) -> &'static str {
                std::any::type_name::<$t>()
            }

            fn reflect_ref(&self) -> Kind<'_> {
                Kind::Scalar(Value::from(*self))
            }

            fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
                let n = value
                    .coerce_u64()
                    .and_then(|n| <$t>::try_from(n).ok())
                    .ok_or_else(|| cannot_assign(std::any::type_name::<$t>(), &value))?;
                *self = n;
                Ok(())
            }
        }
    )*};
}

impl_reflect_signed!(i8, i16, i32, i64, isize);
impl_reflect_unsigned!(u8, u16, u32, u64, usize);

impl Reflect for f64 {
    fn type_name(&self) -> &'static str {
        "f64"
    }

    fn reflect_ref(&self) -> Kind<'_> {
        Kind::Scalar(Value::from(*self))
    }

    fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
        *self = value
            .coerce_f64()
            .ok_or_else(|| cannot_assign("f64", &value))?;
        Ok(())
    }
}

impl Reflect for f32 {
    fn type_name(&self) -> &'static str {
        "f32"
    }

    fn reflect_ref(&self) -> Kind<'_> {
        Kind::Scalar(Value::from(*self))
    }

    fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
        *self = value
            .coerce_f64()
            .ok_or_else(|| cannot_assign("f32", &value))? as f32;
        Ok(())
    }
}

impl Reflect for bool {
    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn reflect_ref(&self) -> Kind<'_> {
        Kind::Scalar(Value::Bool(*self))
    }

    fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
        *self = value
            .coerce_bool()
            .ok_or_else(|| cannot_assign("bool", &value))?;
        Ok(())
    }
}

impl Reflect for String {
    fn type_name(&self) -> &'static str {
        "String"
    }

    fn reflect_ref(&self) -> Kind<'_> {
        Kind::Scalar(Value::Str(SmolStr::new(self)))
    }

    fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
        *self = value
            .coerce_str()
            .ok_or_else(|| cannot_assign("String", &value))?
            .to_string();
        Ok(())
    }
}

impl Reflect for SmolStr {
    fn type_name(&self) -> &'static str {
        "SmolStr"
    }

    fn reflect_ref(&self) -> Kind<'_> {
        Kind::Scalar(Value::Str(self.clone()))
    }

    fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
        *self = value
            .coerce_str()
            .ok_or_else(|| cannot_assign("SmolStr", &value))?;
        Ok(())
    }
}

// A dynamically-typed field: traversal delegates to the contained shape,
// assignment replaces the value wholesale.
impl Reflect for Value {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Value>()
    }

    fn reflect_ref(&self) -> Kind<'_> {
        match self {
            Value::Map(map) => Kind::Mapping(map),
            Value::Seq(seq) => Kind::Sequence(seq),
            other => Kind::Scalar(other.clone()),
        }
    }

    fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
        *self = value;
        Ok(())
    }
}

// ─── Pointer-shaped containers ──────────────────────────────────────────────

impl<T: Reflect + Default> Reflect for Option<T> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn reflect_ref(&self) -> Kind<'_> {
        match self {
            Some(v) => v.reflect_ref(),
            None => Kind::Scalar(Value::Null),
        }
    }

    fn classify(&self) -> FieldKind {
        match self {
            Some(v) => v.classify(),
            None => T::default().classify(),
        }
    }

    fn nested_descriptor(&self) -> Option<ModelDescriptor> {
        match self {
            Some(v) => v.nested_descriptor(),
            None => T::default().nested_descriptor(),
        }
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        if self.is_none() {
            // writes through an unset option initialize the record in place
            let mut fresh = T::default();
            if fresh.as_record_mut().is_none() {
                return None;
            }
            *self = Some(fresh);
        }
        self.as_mut().and_then(Reflect::as_record_mut)
    }

    fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = self.take().unwrap_or_default();
        inner.assign(value)?;
        *self = Some(inner);
        Ok(())
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }

    fn reflect_ref(&self) -> Kind<'_> {
        (**self).reflect_ref()
    }

    fn classify(&self) -> FieldKind {
        (**self).classify()
    }

    fn nested_descriptor(&self) -> Option<ModelDescriptor> {
        (**self).nested_descriptor()
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        (**self).as_record_mut()
    }

    fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
        (**self).assign(value)
    }

    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

// ─── Sequences ──────────────────────────────────────────────────────────────

impl<T: Reflect + Default> Reflect for Vec<T> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn reflect_ref(&self) -> Kind<'_> {
        Kind::Sequence(self)
    }

    fn nested_descriptor(&self) -> Option<ModelDescriptor> {
        T::default().nested_descriptor()
    }

    fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
        let Value::Seq(items) = value else {
            return Err(cannot_assign(std::any::type_name::<Self>(), &value));
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let mut element = T::default();
            element.assign(item)?;
            out.push(element);
        }
        *self = out;
        Ok(())
    }
}

impl<T: Reflect + Default> Sequence for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn element(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|v| v as &dyn Reflect)
    }
}

impl<T: Reflect + Default, const N: usize> Reflect for [T; N] {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn reflect_ref(&self) -> Kind<'_> {
        Kind::Sequence(self)
    }

    fn nested_descriptor(&self) -> Option<ModelDescriptor> {
        T::default().nested_descriptor()
    }

    fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
        let Value::Seq(items) = value else {
            return Err(cannot_assign(std::any::type_name::<Self>(), &value));
        };
        if items.len() != N {
            return Err(cannot_assign(
                std::any::type_name::<Self>(),
                &Value::Seq(items),
            ));
        }
        for (slot, item) in self.iter_mut().zip(items) {
            slot.assign(item)?;
        }
        Ok(())
    }
}

impl<T: Reflect + Default, const N: usize> Sequence for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn element(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|v| v as &dyn Reflect)
    }
}

// ─── Mappings ───────────────────────────────────────────────────────────────

macro_rules! impl_reflect_map {
    ($map:ident, $($bound:tt)+) => {
        impl<K, V> Reflect for $map<K, V>
        where
            K: MapKey + $($bound)+ + 'static,
            V: Reflect + Default,
        {
            fn type_name(&self) -> &'static str {
                std::any::type_name::<Self>()
            }

            fn reflect_ref(&self) -> Kind<'_> {
                Kind::Mapping(self)
            }

            fn assign(&mut self, value: Value) -> Result<(), SchemaError> {
                let Value::Map(entries) = value else {
                    return Err(cannot_assign(std::any::type_name::<Self>(), &value));
                };
                let mut out = Self::new();
                for (name, item) in entries {
                    let key = K::from_path_key(&PathKey::Name(name.clone())).ok_or_else(|| {
                        SchemaError::KeyTypeMismatch {
                            expected: K::TYPE_NAME,
                            key: name,
                        }
                    })?;
                    let mut element = V::default();
                    element.assign(item)?;
                    out.insert(key, element);
                }
                *self = out;
                Ok(())
            }
        }

        impl<K, V> Mapping for $map<K, V>
        where
            K: MapKey + $($bound)+ + 'static,
            V: Reflect + Default,
        {
            fn key_type(&self) -> &'static str {
                K::TYPE_NAME
            }

            fn entry(&self, key: &PathKey) -> Result<Option<&dyn Reflect>, SchemaError> {
                let k = K::from_path_key(key).ok_or_else(|| SchemaError::KeyTypeMismatch {
                    expected: K::TYPE_NAME,
                    key: key.as_name(),
                })?;
                Ok(self.get(&k).map(|v| v as &dyn Reflect))
            }

            fn entries(&self) -> Vec<(SmolStr, &dyn Reflect)> {
                self.iter().map(|(k, v)| (k.display(), v as &dyn Reflect)).collect()
            }

            fn len(&self) -> usize {
                $map::len(self)
            }
        }
    };
}

impl_reflect_map!(HashMap, Eq + Hash);
impl_reflect_map!(BTreeMap, Ord);

// ─── Opaque ─────────────────────────────────────────────────────────────────

/// Wrapper for payloads the schema layer must carry but cannot introspect:
/// channel endpoints, callbacks, raw handles. Schema construction rejects any
/// field declared this way.
pub struct Opaque<T>(pub Option<T>);

impl<T> Default for Opaque<T> {
    fn default() -> Self {
        Opaque(None)
    }
}

impl<T> fmt::Debug for Opaque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque<{}>", std::any::type_name::<T>())
    }
}

impl<T: Clone> Clone for Opaque<T> {
    fn clone(&self) -> Self {
        Opaque(self.0.clone())
    }
}

// Opaque payloads carry no model data; they never distinguish two records.
impl<T> PartialEq for Opaque<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T: 'static> Reflect for Opaque<T> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn reflect_ref(&self) -> Kind<'_> {
        Kind::Opaque(std::any::type_name::<T>())
    }
}
