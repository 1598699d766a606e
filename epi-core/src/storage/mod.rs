// Storage backends for the star schema: trait, SQLite, and in-memory.

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::{FactFilter, Storage};
