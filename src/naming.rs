use convert_case::{Case, Casing};
use smol_str::SmolStr;

// ─── Naming policy ──────────────────────────────────────────────────────────

/// Derives default storage names when a model carries no explicit override.
/// Injected into the cache at construction; there is no ambient default.
pub trait NamingPolicy: Send + Sync {
    fn table_name(&self, type_name: &str) -> SmolStr;
    fn column_name(&self, table: &str, field_name: &str) -> SmolStr;
}

/// Default policy: snake_case for tables and columns.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnakeCaseNaming;

impl NamingPolicy for SnakeCaseNaming {
    fn table_name(&self, type_name: &str) -> SmolStr {
        SmolStr::new(type_name.to_case(Case::Snake))
    }

    fn column_name(&self, _table: &str, field_name: &str) -> SmolStr {
        SmolStr::new(field_name.to_case(Case::Snake))
    }
}
