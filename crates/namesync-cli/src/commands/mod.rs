//! Command handlers

pub mod config;
pub mod names;
pub mod watch;
