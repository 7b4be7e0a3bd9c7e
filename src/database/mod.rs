pub mod documents;
pub mod manager;
pub mod memory;
pub mod postgres;

pub use documents::{Document, DocumentStore};
pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
