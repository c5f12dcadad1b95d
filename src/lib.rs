//! Caching proxy for the FitX studio utilization API.
//!
//! The binary wires these modules together; they are exposed as a library so
//! the HTTP surface can be exercised from integration tests.

pub mod cache;
pub mod directory;
pub mod error;
pub mod geo;
pub mod refresh;
pub mod responses;
pub mod server;
pub mod store;
pub mod upstream;
