//! Deferred work for the quickstart: a task is an HTTP request the application
//! makes to itself later, outside the request that produced it.

pub mod actix_queue;
pub mod dispatcher;
pub mod queue;
pub mod task;

pub use actix_queue::*;
pub use dispatcher::*;
pub use queue::*;
pub use task::*;
