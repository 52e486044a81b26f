mod cache;
mod field;
mod parse;
mod read_op;
mod schema;
mod write_op;

pub use cache::SchemaCache;
pub use field::FieldDescriptor;
pub use schema::Schema;

#[cfg(test)]
mod tests;
