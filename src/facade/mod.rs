pub mod config;
pub mod database;

pub use config::DbConfig;
pub use database::BlogDb;
