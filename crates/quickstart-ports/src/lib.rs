//! Integration ports for the Mirror quickstart.
//!
//! Every collaborator the handlers talk to sits behind one of these traits so the
//! HTTP layer can run against in-process fakes in tests.

pub mod cache;
pub mod identity;
pub mod mirror;
pub mod storage;

pub use cache::*;
pub use identity::*;
pub use mirror::*;
pub use storage::*;
