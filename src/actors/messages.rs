//! Message types exchanged between simulated nodes
//!
//! Requests travel downstream from a client towards the servers, responses
//! travel the same path back. Both are plain values; the queues between
//! nodes are the only synchronization between actors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Type tag of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "client")]
    Client,
    #[serde(rename = "server")]
    Server,
    #[serde(rename = "load balancer")]
    LoadBalancer,
}

impl NodeKind {
    /// Get the string representation
    ///
    /// This matches the serde serialization format.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Client => "client",
            NodeKind::Server => "server",
            NodeKind::LoadBalancer => "load balancer",
        }
    }

    /// Whether nodes of this kind can be the source of an edge
    pub fn can_send(&self) -> bool {
        matches!(self, NodeKind::Client | NodeKind::LoadBalancer)
    }

    /// Whether nodes of this kind can be the target of an edge
    pub fn can_receive(&self) -> bool {
        matches!(self, NodeKind::Server | NodeKind::LoadBalancer)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(NodeKind::Client),
            "server" => Ok(NodeKind::Server),
            "load balancer" => Ok(NodeKind::LoadBalancer),
            other => Err(format!("unknown node type: {other}")),
        }
    }
}

/// Canvas position of a node (cosmetic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A request sent by a client
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Position of the request in its client's run, starting at 0
    pub sequence: usize,

    /// Id of the client that sent the request
    pub origin: String,

    /// When the client sent the request
    pub sent_at: Instant,
}

impl Request {
    pub fn new(sequence: usize, origin: impl Into<String>) -> Self {
        Self {
            sequence,
            origin: origin.into(),
            sent_at: Instant::now(),
        }
    }
}

/// A response to a [`Request`]
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Sequence number of the answered request
    pub sequence: usize,

    /// Client the answered request came from
    pub origin: String,

    /// When the client consumed the response
    pub received_at: Option<Instant>,
}

impl Response {
    /// Build the response for a request
    pub fn to(request: &Request) -> Self {
        Self {
            sequence: request.sequence,
            origin: request.origin.clone(),
            received_at: None,
        }
    }

    /// Stamp the receive time, keeping the first stamp if there already is one
    pub fn received(mut self) -> Self {
        self.received_at.get_or_insert_with(Instant::now);
        self
    }
}
