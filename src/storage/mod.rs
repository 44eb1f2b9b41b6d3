//! Storage backends for capture persistence
//!
//! ## Design
//!
//! - **Trait-based**: `StorageBackend` hides the driver behind one async
//!   `execute_bulk` call
//! - **Templates built once**: `QueryTemplates` are constructed at setup and
//!   owned by the sink, never mutated afterwards
//! - **Day-partitioned**: the destination table is picked at flush time
//!
//! ## Backends
//!
//! - **MySQL** and **PostgreSQL** via sqlx pools (feature `storage-sql`)
//! - **In-Memory**: records statements, for tests and dry runs
//!
//! ## Usage
//!
//! ```no_run
//! use capture_sink::config::read_config_file;
//! use capture_sink::storage::connection::connect;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = read_config_file("./sink.json")?;
//!     let backend = connect(&config.database).await?;
//!     // Hand over to the SinkActor
//!     # drop(backend);
//!     Ok(())
//! }
//! ```

pub mod backend;
#[cfg(feature = "storage-sql")]
pub mod connection;
pub mod error;
pub mod memory;
#[cfg(feature = "storage-sql")]
pub mod mysql;
#[cfg(feature = "storage-sql")]
pub mod postgres;
pub mod query;
pub mod schema;

pub use backend::{BulkInsert, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use query::{QueryTemplate, QueryTemplates};
pub use schema::{Category, Family, Value};
