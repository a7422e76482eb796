//! Integration tests for simulated systems and the management API

#[path = "integration/helpers.rs"]
mod helpers;

#[path = "integration/simulation.rs"]
mod simulation;

#[cfg(feature = "api")]
#[path = "integration/api_endpoints.rs"]
mod api_endpoints;
