pub mod config;
pub mod entitlements;
pub mod error;
pub mod fingerprint;
pub mod payments;
pub mod plan;
pub mod scan;
pub mod store;
pub mod upgrade;
