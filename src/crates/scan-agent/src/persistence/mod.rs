//! SQLite adapters for the task store and configuration ports.

pub mod configuration;
pub mod db;
pub mod task_repository;

pub use configuration::SqliteConfigurationProvider;
pub use db::Database;
pub use task_repository::SqliteTaskRepository;
