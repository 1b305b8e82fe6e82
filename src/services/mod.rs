// Service exports
pub mod postgres;
pub mod store;

pub use postgres::PostgresStore;
pub use store::{CategoryLink, InMemoryStore, ProfileStore, StoreError};
