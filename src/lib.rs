//! Library exports.
//!
//! Re-exports the workspace crates under one name so integration tests and
//! additional binaries can reach every layer of the quickstart.

pub use quickstart_actix as web;
pub use quickstart_config as config;
pub use quickstart_core as core;
pub use quickstart_mirror as mirror;
pub use quickstart_oauth as oauth;
pub use quickstart_observability as observability;
pub use quickstart_ports as ports;
pub use quickstart_server as server;
pub use quickstart_storage_factory as storage;
pub use quickstart_tasks as tasks;
