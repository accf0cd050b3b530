//! Domain models split into entity-specific modules.

pub mod activity;
pub mod common;
pub mod leave;
pub mod stats;
pub mod user;

pub use activity::*;
pub use common::*;
pub use leave::*;
pub use stats::*;
pub use user::*;
