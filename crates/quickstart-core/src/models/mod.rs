pub mod credential;
pub mod error;
pub mod mirror;

pub use credential::*;
pub use error::*;
pub use mirror::*;
