//! API module for the console daemon

pub mod rest;

pub use rest::router::create_router;
