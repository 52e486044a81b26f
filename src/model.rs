use std::any::TypeId;

use crate::reflect::Reflect;

// ─── Field declarations ─────────────────────────────────────────────────────

/// Static declaration of one record field, in declaration order.
///
/// `column` is the tag override: `None` or the literal `"inline"` defers to
/// the naming policy, anything else is used verbatim as the storage name.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub column: Option<&'static str>,
    pub anonymous: bool,
}

/// Everything the schema builder needs to know about a model type, capturable
/// without an instance and cheap to copy across threads.
#[derive(Debug, Clone, Copy)]
pub struct ModelDescriptor {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub storage_name: Option<&'static str>,
    pub fields: &'static [FieldDef],
    pub probe: fn() -> Box<dyn Record>,
}

// ─── Record / Model ─────────────────────────────────────────────────────────

/// Object-safe side of a model type: descriptor plus positional field access.
/// Field indexes match the order of [`Model::field_defs`].
pub trait Record: Reflect {
    fn descriptor(&self) -> ModelDescriptor;
    fn field(&self, index: usize) -> Option<&dyn Reflect>;
    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;
}

/// Static side of a model type. Implemented by the [`model!`] macro; the
/// default `storage_name` of `None` defers table naming to the policy.
pub trait Model: Record + Default + Sized + 'static {
    fn model_name() -> &'static str;

    fn storage_name() -> Option<&'static str> {
        None
    }

    fn field_defs() -> &'static [FieldDef];

    fn describe() -> ModelDescriptor {
        ModelDescriptor {
            type_id: TypeId::of::<Self>(),
            type_name: Self::model_name(),
            storage_name: Self::storage_name(),
            fields: Self::field_defs(),
            probe: || Box::new(Self::default()),
        }
    }
}

// ─── model! ─────────────────────────────────────────────────────────────────

#[doc(hidden)]
#[macro_export]
macro_rules! __model_column {
    () => {
        None
    };
    ($col:literal) => {
        Some($col)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __model_anonymous {
    (field) => {
        false
    };
    (embed) => {
        true
    };
}

/// Declare a record type together with its `Model`/`Record`/`Reflect` impls.
///
/// ```ignore
/// model! {
///     pub struct Address as "addresses" {
///         field city: String,
///         field zip: String => "zip_code",
///     }
/// }
///
/// model! {
///     pub struct User {
///         field name: String,
///         embed addr: Address,
///     }
/// }
/// ```
///
/// Each entry is `field`/`embed`, a name, a type, and an optional
/// `=> "column"` storage override. `embed` marks the field anonymous: its
/// nested fields are promoted into the enclosing schema. The optional
/// `as "table"` names the storage table, overriding the naming policy.
#[macro_export]
macro_rules! model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(as $table:literal)? {
            $( $fkind:ident $fname:ident : $fty:ty $(=> $col:literal)? ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, PartialEq)]
        $vis struct $name {
            $( pub $fname: $fty ),*
        }

        impl $crate::model::Model for $name {
            fn model_name() -> &'static str {
                stringify!($name)
            }

            fn storage_name() -> Option<&'static str> {
                $crate::__model_column!($($table)?)
            }

            fn field_defs() -> &'static [$crate::model::FieldDef] {
                const DEFS: &[$crate::model::FieldDef] = &[
                    $(
                        $crate::model::FieldDef {
                            name: stringify!($fname),
                            column: $crate::__model_column!($($col)?),
                            anonymous: $crate::__model_anonymous!($fkind),
                        }
                    ),*
                ];
                DEFS
            }
        }

        impl $crate::model::Record for $name {
            fn descriptor(&self) -> $crate::model::ModelDescriptor {
                <Self as $crate::model::Model>::describe()
            }

            fn field(&self, index: usize) -> Option<&dyn $crate::reflect::Reflect> {
                let mut i = 0usize;
                $(
                    if index == i {
                        return Some(&self.$fname);
                    }
                    i += 1;
                )*
                let _ = i;
                None
            }

            fn field_mut(&mut self, index: usize) -> Option<&mut dyn $crate::reflect::Reflect> {
                let mut i = 0usize;
                $(
                    if index == i {
                        return Some(&mut self.$fname);
                    }
                    i += 1;
                )*
                let _ = i;
                None
            }
        }

        impl $crate::reflect::Reflect for $name {
            fn type_name(&self) -> &'static str {
                std::any::type_name::<Self>()
            }

            fn reflect_ref(&self) -> $crate::reflect::Kind<'_> {
                $crate::reflect::Kind::Record(self)
            }

            fn nested_descriptor(&self) -> Option<$crate::model::ModelDescriptor> {
                Some(<Self as $crate::model::Model>::describe())
            }

            fn as_record_mut(&mut self) -> Option<&mut dyn $crate::model::Record> {
                Some(self)
            }
        }
    };
}
