//! The node capability set shared by every actor variant
//!
//! A [`Node`] is a closed set of variants behind one interface. The system
//! only ever talks to nodes through it: identity, position, `run`, `reset`
//! and the zero-state metrics used before a run has reported anything.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::trace;

use crate::config::SimulationConfig;
use crate::metrics::{Message, Metric};

use super::client::Client;
use super::link::{Inbound, Outbound};
use super::load_balancer::LoadBalancer;
use super::messages::{NodeKind, Position};
use super::server::Server;

/// Position a node gets when it is added to a system
pub const DEFAULT_POSITION: Position = Position::new(500, 150);

/// Everything a node needs to take part in one generation of a run
///
/// The system owns the token, the tracker and the metrics channel. Nodes only
/// get clones for the lifetime of a generation, so tearing a run down never
/// depends on a node giving anything back.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Cancelled when the generation ends
    pub cancel: CancellationToken,

    /// Tracks every unit spawned in this generation
    pub tracker: TaskTracker,

    /// Shared metrics output of the system
    pub metrics_tx: mpsc::Sender<Message>,

    pub config: Arc<SimulationConfig>,
}

impl RunContext {
    /// Push a metrics message, giving up when the generation is cancelled first
    ///
    /// Returns `false` if the generation was cancelled while waiting.
    pub async fn publish(&self, message: Message) -> bool {
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => false,

            result = self.metrics_tx.send(message) => {
                if result.is_err() {
                    trace!("metrics channel closed, dropping message");
                }
                true
            }
        }
    }

    /// Periodic metrics ticker; the first tick fires one period from now
    pub fn ticker(&self) -> Interval {
        ticker(self.config.metrics_interval())
    }
}

pub(crate) fn ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Nodes that can be the source of an edge
pub trait RequestSender {
    /// Attach the outbound end of a freshly wired edge
    fn set_outbound(&mut self, link: Outbound);
}

/// Nodes that can be the target of an edge
pub trait RequestReceiver {
    /// Attach the inbound end of a freshly wired edge
    fn set_inbound(&mut self, link: Inbound);
}

/// One simulated actor
#[derive(Debug)]
pub enum Node {
    Client(Client),
    Server(Server),
    LoadBalancer(LoadBalancer),
}

impl Node {
    /// Create a node of the given kind at the default position
    pub fn new(kind: NodeKind, id: String, config: &SimulationConfig) -> Self {
        match kind {
            NodeKind::Client => Node::Client(Client::new(id, DEFAULT_POSITION)),
            NodeKind::Server => {
                Node::Server(Server::new(id, DEFAULT_POSITION, config.max_routines))
            }
            NodeKind::LoadBalancer => {
                Node::LoadBalancer(LoadBalancer::new(id, DEFAULT_POSITION))
            }
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Node::Client(client) => &client.id,
            Node::Server(server) => &server.id,
            Node::LoadBalancer(lb) => &lb.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Client(_) => NodeKind::Client,
            Node::Server(_) => NodeKind::Server,
            Node::LoadBalancer(_) => NodeKind::LoadBalancer,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Node::Client(client) => client.position,
            Node::Server(server) => server.position,
            Node::LoadBalancer(lb) => lb.position,
        }
    }

    pub fn set_position(&mut self, position: Position) {
        match self {
            Node::Client(client) => client.position = position,
            Node::Server(server) => server.position = position,
            Node::LoadBalancer(lb) => lb.position = position,
        }
    }

    /// Launch the node's units under the given generation
    ///
    /// Returns immediately; all work happens in tasks on `ctx.tracker`.
    pub fn run(&mut self, ctx: &RunContext) {
        match self {
            Node::Client(client) => client.run(ctx),
            Node::Server(server) => server.run(ctx),
            Node::LoadBalancer(lb) => lb.run(ctx),
        }
    }

    /// Clear per-run state, keeping identity and position
    pub fn reset(&mut self) {
        match self {
            Node::Client(client) => client.reset(),
            Node::Server(server) => server.reset(),
            Node::LoadBalancer(lb) => lb.reset(),
        }
    }

    /// Metrics of a node that has not reported yet
    pub fn default_metrics(&self) -> Vec<Metric> {
        match self {
            Node::Client(_) => Client::default_metrics(),
            Node::Server(_) => Server::default_metrics(),
            Node::LoadBalancer(_) => LoadBalancer::default_metrics(),
        }
    }

    /// Requests completed in the current generation, for nodes that count them
    pub fn processed(&self) -> Option<u64> {
        match self {
            Node::Client(_) => None,
            Node::Server(server) => Some(server.processed()),
            Node::LoadBalancer(lb) => Some(lb.processed()),
        }
    }

    pub fn as_sender(&mut self) -> Option<&mut dyn RequestSender> {
        match self {
            Node::Client(client) => Some(client),
            Node::Server(_) => None,
            Node::LoadBalancer(lb) => Some(lb),
        }
    }

    pub fn as_receiver(&mut self) -> Option<&mut dyn RequestReceiver> {
        match self {
            Node::Client(_) => None,
            Node::Server(server) => Some(server),
            Node::LoadBalancer(lb) => Some(lb),
        }
    }
}
