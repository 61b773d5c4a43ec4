//! # attach-database
//!
//! Metadata store for attachment file records: PostgreSQL connection
//! management, migrations, and the [`FileRecordStore`] implementations.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::InMemoryFileRecordStore;
pub use repositories::FileRecordRepository;
pub use store::FileRecordStore;
