//! Configuration and session models.

pub mod config;
pub mod session;
