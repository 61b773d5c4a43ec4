//! Repository implementations backed by PostgreSQL.

pub mod file;

pub use file::FileRecordRepository;
