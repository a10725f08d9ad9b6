pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod store;

#[cfg(test)]
pub(crate) mod faulty;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{Repository, StoreError, StoreResult};
pub use store::{EdgeKind, EdgeReplacement, GraphStore};
