//! Domain layer: entities, value objects, and port traits for deepwiki.
//!
//! No I/O and no concrete provider lives here — only the shapes that
//! `deepwiki-infrastructure`, `deepwiki-providers`, and `deepwiki-application`
//! depend on and implement against.

pub mod entities;
pub mod error;
pub mod ports;
pub mod value_objects;

pub use entities::*;
pub use error::{Error, Result};
pub use ports::*;
pub use value_objects::*;
