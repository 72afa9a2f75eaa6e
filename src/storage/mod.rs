pub mod engine;
pub mod memory;
pub mod persistence;
pub mod table;

pub use engine::EntityReader;
pub(crate) use engine::EntityStore;
pub use memory::InMemoryStorage;
pub use persistence::SnapshotManager;
pub use table::{Assignment, FieldUpdate, Guard, Table, UpdateResult};
