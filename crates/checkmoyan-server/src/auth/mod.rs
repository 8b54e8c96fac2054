pub mod admin;
pub mod password;

pub use admin::AdminSession;
