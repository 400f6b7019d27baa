//! API request handlers

mod definitions;
mod health;
mod projects;
mod tasks;
mod users;

pub use definitions::*;
pub use health::*;
pub use projects::*;
pub use tasks::*;
pub use users::*;
