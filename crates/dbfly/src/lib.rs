//! # dbfly
//!
//! Declarative, dialect-pluggable database schema migration engine.
//!
//! Schema changes are described in versioned descriptor files (structured
//! XML or raw SQL scripts). Each run discovers the available versions,
//! translates every change into dialect-correct DDL/DML, applies the ones
//! newer than the last completed version exactly once and records progress
//! in a durable change-log table.
//!
//! The engine owns the translation and sequencing; the caller supplies the
//! database access ([`Driver`]) and the descriptor storage ([`Source`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! use dbfly::{DirSource, DryRunDriver, Migrator, SqliteMigratory};
//!
//! #[tokio::main]
//! async fn main() -> dbfly::Result<()> {
//!     let migrator = Migrator::new(
//!         Box::new(SqliteMigratory::new()),
//!         Box::new(DryRunDriver::new()),
//!         Box::new(DirSource::new(["migrations"])),
//!     );
//!     migrator.migrate().await
//! }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod migratory;
pub mod node;
pub mod orchestrator;
pub mod quote;
pub mod source;
pub mod sql;
pub mod version;

// Re-exports for convenient access
pub use config::MigrateSettings;
pub use driver::{DryRunDriver, Driver, Row, Rows, Value};
pub use error::{MigrateError, Result};
pub use migratory::{
    migratory_for, DialectConfig, DmMigratory, GenericMigratory, Migratory, MysqlMigratory,
    OracleMigratory, PostgresMigratory, SqliteMigratory, VastbaseMigratory, DEFAULT_CHANGE_TABLE,
};
pub use node::{decode_changes, DataType, Node, ALL_DIALECTS};
pub use orchestrator::Migrator;
pub use quote::{QuotePolicy, Quoter};
pub use source::{ChangeDescriptor, DirSource, MemorySource, Source};
pub use sql::{column_type, split_sql_statements};
pub use version::ChangeVersion;
