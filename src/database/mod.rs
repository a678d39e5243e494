pub mod connection;
pub mod migrations;
pub mod postgres_store;

pub use connection::*;
pub use migrations::*;
pub use postgres_store::PostgresStore;
