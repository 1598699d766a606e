pub mod columns;

pub use columns::{resolve_role, resolve_role_index, ColumnRole};
