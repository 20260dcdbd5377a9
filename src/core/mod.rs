//! Shared primitives: errors, gateway contracts, host storage plumbing,
//! configuration and time helpers.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod schemas;
pub mod store;
pub mod time;
