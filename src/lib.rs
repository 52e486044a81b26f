//! Cached structural metadata for record types, with path-based access.
//!
//! A [`SchemaCache`] builds a [`Schema`] at most once per record type:
//! concurrent resolvers for the same type share a single build and its
//! outcome. Schemas describe fields, storage names, and nested record
//! structure (embedded fields are flattened with first-declared-wins
//! shadowing), and drive a generic accessor that reads and writes values
//! across arbitrarily nested records, mappings, and sequences:
//!
//! ```ignore
//! let cache = SchemaCache::new();
//! let schema = cache.resolve::<User>(None)?;
//! schema.set(&mut user, "Paris".into(), &path!["addr", "city"])?;
//! assert_eq!(schema.get(&user, &path!["addr", "city"])?, Some("Paris".into()));
//! ```
//!
//! Record types are declared with the [`model!`] macro, which generates the
//! [`Model`]/[`Record`] introspection impls the builder consumes.

pub mod error;
pub mod model;
pub mod naming;
pub mod path;
pub mod reflect;
pub mod schema;
pub mod value;

pub use error::SchemaError;
pub use model::{FieldDef, Model, ModelDescriptor, Record};
pub use naming::{NamingPolicy, SnakeCaseNaming};
pub use path::PathKey;
pub use reflect::{FieldKind, Kind, MapKey, Mapping, Opaque, Reflect, Sequence};
pub use schema::{FieldDescriptor, Schema, SchemaCache};
pub use value::{FastMap, Number, Value};
