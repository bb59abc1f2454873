pub mod change_feed;
pub mod memory_store;
pub mod sqlite_store;

pub use memory_store::InMemoryDocumentStore;
pub use sqlite_store::SqliteDocumentStore;
