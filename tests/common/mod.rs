//! Integration test common infrastructure.
//!
//! Provides utilities for spawning relayd instances and framed test
//! clients, and asserting on relayed frame flows.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;
