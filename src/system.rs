//! System orchestrator - owns the graph and drives the run lifecycle
//!
//! ## Lifecycle
//!
//! ```text
//!   Idle ──start()──► Resetting ──drain + rewire──► Running
//!    ▲                   │                             │
//!    │                   └── concurrent start() ─► ResetInProgress
//!    └──────── client done / stop() cancels ◄──────────┘
//! ```
//!
//! A run is one *generation*: a cancellation token and a task tracker that
//! every unit of every node is spawned on. `start` cancels the live
//! generation, waits for all of its tasks to finish, and only then resets the
//! nodes, allocates fresh queues for every edge and launches the next one.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

use crate::actors::link::link;
use crate::actors::messages::{NodeKind, Position};
use crate::actors::node::{Node, RunContext};
use crate::config::SimulationConfig;
use crate::error::{SystemError, SystemResult};
use crate::metrics::{Message, Metric};
use crate::util::new_id;

/// Directed wiring intent between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Point-in-time view of a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: String,
    pub kind: NodeKind,
    pub position: Position,
    pub metrics: Vec<Metric>,
}

impl From<&Node> for NodeSnapshot {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id().to_string(),
            kind: node.kind(),
            position: node.position(),
            metrics: node.default_metrics(),
        }
    }
}

/// Point-in-time view of a whole system
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub id: String,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Default)]
struct Graph {
    nodes: HashMap<String, Node>,

    /// Kept in insertion order, which is the wiring and round-robin order
    edges: Vec<Edge>,
}

impl Graph {
    fn reset(&mut self) {
        for node in self.nodes.values_mut() {
            node.reset();
        }
    }

    /// Allocate a fresh queue pair for every edge
    fn wire(&mut self, capacity: usize) {
        for edge in &self.edges {
            if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
                warn!("skipping edge {} with a missing endpoint", edge.id);
                continue;
            }

            let (outbound, inbound) = link(capacity);

            match self.nodes.get_mut(&edge.source).and_then(Node::as_sender) {
                Some(sender) => sender.set_outbound(outbound),
                None => warn!("node {} cannot send, skipping edge {}", edge.source, edge.id),
            }

            match self.nodes.get_mut(&edge.target).and_then(Node::as_receiver) {
                Some(receiver) => receiver.set_inbound(inbound),
                None => warn!("node {} cannot receive, skipping edge {}", edge.target, edge.id),
            }
        }
    }

    fn run(&mut self, ctx: &RunContext) {
        for node in self.nodes.values_mut() {
            node.run(ctx);
        }
    }
}

/// Cancellation token and completion barrier of one run
#[derive(Debug, Clone)]
struct Generation {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Generation {
    fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Cancel every unit and wait until all of them have finished
    async fn drain(self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// Clears the resetting flag when the holder is done, even on early return
struct ResetGuard<'a>(&'a AtomicBool);

impl<'a> ResetGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A simulated architecture: nodes, edges, and the live run
pub struct System {
    id: String,
    config: Arc<SimulationConfig>,
    graph: Mutex<Graph>,
    generation: Mutex<Generation>,
    resetting: AtomicBool,
    metrics_tx: mpsc::Sender<Message>,
    metrics_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Message>>>,
}

impl System {
    /// Create an empty, idle system
    ///
    /// Fails with [`SystemError::InvalidConfig`] for settings the actors
    /// cannot run with.
    pub fn new(config: SimulationConfig) -> SystemResult<Self> {
        config
            .validate()
            .map_err(|e| SystemError::InvalidConfig(e.to_string()))?;

        let (metrics_tx, metrics_rx) = mpsc::channel(config.metrics_buffer);

        Ok(Self {
            id: new_id(),
            config: Arc::new(config),
            graph: Mutex::new(Graph::default()),
            generation: Mutex::new(Generation::new()),
            resetting: AtomicBool::new(false),
            metrics_tx,
            metrics_rx: Arc::new(tokio::sync::Mutex::new(metrics_rx)),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Receiving end of the metrics channel
    ///
    /// Only one consumer can hold the lock at a time.
    pub fn metrics(&self) -> Arc<tokio::sync::Mutex<mpsc::Receiver<Message>>> {
        self.metrics_rx.clone()
    }

    /// Add a node of the given kind at the default position
    pub fn add_node(&self, kind: NodeKind) -> NodeSnapshot {
        let node = Node::new(kind, new_id(), &self.config);
        let snapshot = NodeSnapshot::from(&node);

        debug!(system = %self.id, "adding {kind} {}", snapshot.id);
        self.graph.lock().nodes.insert(snapshot.id.clone(), node);

        snapshot
    }

    pub fn set_position(&self, node_id: &str, position: Position) -> SystemResult<()> {
        let mut graph = self.graph.lock();
        let node = graph
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| SystemError::NodeNotFound(node_id.to_string()))?;
        node.set_position(position);
        Ok(())
    }

    /// Remove a node together with every edge touching it
    pub fn remove_node(&self, node_id: &str) -> SystemResult<()> {
        let mut graph = self.graph.lock();
        graph
            .nodes
            .remove(node_id)
            .ok_or_else(|| SystemError::NodeNotFound(node_id.to_string()))?;
        graph
            .edges
            .retain(|edge| edge.source != node_id && edge.target != node_id);

        debug!(system = %self.id, "removed node {node_id}");
        Ok(())
    }

    /// Register a directed edge; queues are only allocated on the next `start`
    pub fn add_edge(&self, source: &str, target: &str) -> SystemResult<Edge> {
        let mut graph = self.graph.lock();

        let source_kind = graph
            .nodes
            .get(source)
            .map(Node::kind)
            .ok_or_else(|| SystemError::NodeNotFound(source.to_string()))?;
        let target_kind = graph
            .nodes
            .get(target)
            .map(Node::kind)
            .ok_or_else(|| SystemError::NodeNotFound(target.to_string()))?;

        if source == target || !source_kind.can_send() || !target_kind.can_receive() {
            return Err(SystemError::InvalidEdge {
                source_id: source.to_string(),
                source_kind,
                target_id: target.to_string(),
                target_kind,
            });
        }

        let edge = Edge {
            id: new_id(),
            source: source.to_string(),
            target: target.to_string(),
        };

        debug!(system = %self.id, "adding edge {source} -> {target}");
        graph.edges.push(edge.clone());

        Ok(edge)
    }

    pub fn remove_edge(&self, edge_id: &str) -> SystemResult<()> {
        let mut graph = self.graph.lock();
        let before = graph.edges.len();
        graph.edges.retain(|edge| edge.id != edge_id);

        if graph.edges.len() == before {
            return Err(SystemError::EdgeNotFound(edge_id.to_string()));
        }

        debug!(system = %self.id, "removed edge {edge_id}");
        Ok(())
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let graph = self.graph.lock();
        GraphSnapshot {
            id: self.id.clone(),
            nodes: graph.nodes.values().map(NodeSnapshot::from).collect(),
            edges: graph.edges.clone(),
        }
    }

    /// Requests completed in the current generation, per counting node
    pub fn processed(&self) -> HashMap<String, u64> {
        self.graph
            .lock()
            .nodes
            .values()
            .filter_map(|node| node.processed().map(|count| (node.id().to_string(), count)))
            .collect()
    }

    /// Whether the current generation still has live, uncancelled units
    pub fn is_running(&self) -> bool {
        let generation = self.generation.lock();
        !generation.cancel.is_cancelled() && !generation.tracker.is_empty()
    }

    /// Drain the previous run, rewire every edge and launch a new run
    ///
    /// Fails with [`SystemError::ResetInProgress`] while another `start` or
    /// `stop` is still busy; nothing is changed in that case.
    #[instrument(skip(self), fields(system = %self.id))]
    pub async fn start(&self) -> SystemResult<()> {
        let Some(_guard) = ResetGuard::acquire(&self.resetting) else {
            warn!("reset in progress");
            return Err(SystemError::ResetInProgress(self.id.clone()));
        };

        info!("reset initiated");
        let previous = self.generation.lock().clone();
        previous.drain().await;

        let ctx = {
            let mut generation = self.generation.lock();
            *generation = Generation::new();
            RunContext {
                cancel: generation.cancel.clone(),
                tracker: generation.tracker.clone(),
                metrics_tx: self.metrics_tx.clone(),
                config: self.config.clone(),
            }
        };
        info!("reset complete");

        let mut graph = self.graph.lock();
        graph.reset();
        graph.wire(self.config.queue_capacity);

        info!(
            "starting system with {} nodes and {} edges",
            graph.nodes.len(),
            graph.edges.len()
        );
        graph.run(&ctx);

        Ok(())
    }

    /// Cancel the live run and wait until all of its units have finished
    #[instrument(skip(self), fields(system = %self.id))]
    pub async fn stop(&self) -> SystemResult<()> {
        let Some(_guard) = ResetGuard::acquire(&self.resetting) else {
            warn!("reset in progress");
            return Err(SystemError::ResetInProgress(self.id.clone()));
        };

        let current = self.generation.lock().clone();
        current.drain().await;

        info!("system stopped");
        Ok(())
    }

    #[cfg(test)]
    fn tracker(&self) -> TaskTracker {
        self.generation.lock().tracker.clone()
    }
}

impl Drop for System {
    fn drop(&mut self) {
        self.generation.get_mut().cancel.cancel();
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("id", &self.id)
            .field("resetting", &self.resetting.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
