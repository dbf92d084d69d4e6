//! API Module
//!
//! REST surface of the operator: the ClusterSync configuration endpoints
//! plus health and readiness probes.

pub mod clustersync;
pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
