//! Simulate request flow through client / load balancer / server topologies
//!
//! A [`System`] holds a graph of nodes and edges. Starting it turns every
//! edge into a pair of bounded queues and every node into one or more async
//! actors; the actors report periodic [`metrics::Message`]s on a channel that
//! the `api` feature streams to a websocket subscriber.

pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod system;
pub mod topology;
pub mod util;

pub use actors::messages::{NodeKind, Position};
pub use config::SimulationConfig;
pub use error::{SystemError, SystemResult};
pub use system::{Edge, GraphSnapshot, NodeSnapshot, System};
