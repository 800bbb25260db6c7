// Signal Infrastructure - SQLite Adapter
// Implements: JobStore, SnapshotStore, TransactionalAdmissionStore, CohortStore, Maintenance

mod cohort_store;
mod connection;
mod error;
mod job_store;
mod maintenance_impl;
mod migration;
mod snapshot_store;
mod transaction;

pub use cohort_store::SqliteCohortStore;
pub use connection::create_pool;
pub use error::map_sqlx_error;
pub use job_store::SqliteJobStore;
pub use maintenance_impl::SqliteMaintenance;
pub use migration::run_migrations;
pub use snapshot_store::SqliteSnapshotStore;
pub use transaction::{SqliteAdmissionStore, SqliteAdmissionTransaction};

// Note: sqlx::Error conversion is handled by map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
