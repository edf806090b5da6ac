// Runtime configuration and database bootstrap

pub mod app;
pub mod database;
pub mod seeding;

pub use app::{AppConfig, OAuthClientConfig};
pub use database::{run_migrations, DatabaseConfig};
pub use seeding::CatalogSeeder;
