//! Actor-based simulation of a small distributed architecture
//!
//! Each node of a system runs as one or more independent async tasks that
//! communicate only through bounded Tokio channels.
//!
//! ## Architecture Overview
//!
//! ```text
//!   ┌──────────┐  requests   ┌──────────────┐  requests   ┌──────────┐
//!   │  Client  │────────────►│ LoadBalancer │────────────►│ Server×N │
//!   │          │◄────────────│ (round robin)│◄────────────│ (slots)  │
//!   └────┬─────┘  responses  └──────┬───────┘  responses  └────┬─────┘
//!        │                          │                          │
//!        └──────────────────────────┼──────────────────────────┘
//!                                   ▼
//!                      ┌──────────────────────────┐
//!                      │ Metrics channel (mpsc)   │ → websocket subscriber
//!                      └──────────────────────────┘
//! ```
//!
//! ## Actor Types
//!
//! - **Client**: sends a fixed number of requests and reports latency
//! - **Server**: processes requests with a bounded slot pool
//! - **LoadBalancer**: forwards requests round-robin and fans responses back in
//!
//! ## Lifecycle
//!
//! Every task of a run belongs to one generation: a cancellation token plus a
//! task tracker. A new run only starts after the previous generation has been
//! cancelled and every one of its tasks has finished.

pub mod client;
pub mod link;
pub mod load_balancer;
pub mod messages;
pub mod node;
pub mod server;
