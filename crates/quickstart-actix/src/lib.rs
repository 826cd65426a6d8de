//! Actix-web HTTP surface for the Mirror quickstart.
//!
//! Handlers reach every collaborator through the ports held in [`AppState`], so
//! the same routes run against the real adapters or in-process fakes.

pub mod handlers;
pub mod session;
pub mod state;
pub mod templates;

pub use handlers::configure;
pub use state::{AppSettings, AppState};
