pub mod backend;
pub mod scans;
pub mod schema;
pub mod store_impl;
pub mod upgrades;
pub mod usage;
pub mod users;

pub use backend::DuckDbBackend;

/// Re-export the `duckdb` crate so tests can use
/// `checkmoyan_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
