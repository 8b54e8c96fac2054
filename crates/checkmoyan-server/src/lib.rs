pub mod app;
pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

#[cfg(feature = "cloud")]
pub mod cloud;
