pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod flight_repo;
mod rows;

pub use app_config::Config;
pub use booking_repo::PostgresStore;
pub use database::DbClient;
