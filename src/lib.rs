pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod handler;
pub mod migration;
pub mod secret;
pub mod tls;

pub use error::MigrateError;

pub type Result<T> = std::result::Result<T, MigrateError>;
