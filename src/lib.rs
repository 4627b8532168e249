//! Library exports for solid-launch, shared between the binary and tests.

pub mod client;
pub mod config;
pub mod context;
pub mod db;
pub mod models;
pub mod routes;
pub mod rpc;
pub mod session;
pub mod startup;
pub mod state;
pub mod utils;
