//! Framework-agnostic domain types for the Mirror quickstart.
//!
//! Nothing in here talks to the network or a database; adapters in the other
//! workspace crates do that and exchange these types.

pub mod models;
pub mod urls;

pub use models::*;
pub use urls::*;
