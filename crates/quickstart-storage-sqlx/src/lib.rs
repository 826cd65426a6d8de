pub mod sqlx;

pub use crate::sqlx::SqlxCredentialStore;
