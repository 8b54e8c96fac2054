pub mod admin;
pub mod checks;
pub mod health;
pub mod plan;
pub mod pricing;
pub mod upgrades;
