//! LoadBalancer - strict round-robin fan-out with per-target fan-in
//!
//! ## Message Flow
//!
//! ```text
//!                        ┌→ target #0 ─┐
//! inbound requests → RR ─┼→ target #1 ─┼→ one collector per target → inbound responses
//!                        └→ target #N ─┘
//! ```
//!
//! Targets are kept in wiring order, which is the round-robin order. There is
//! no load awareness or health checking. Every target has its own collector
//! unit so a slow target never holds up responses from the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, instrument, trace, warn};

use crate::metrics::{Message, Metric};

use super::link::{FanIn, Inbound, Outbound};
use super::messages::{Position, Request, Response};
use super::node::{RequestReceiver, RequestSender, RunContext};

/// Which inbound link leads back to a client
type Routes = Arc<RwLock<HashMap<String, usize>>>;

#[derive(Debug)]
pub struct LoadBalancer {
    pub(crate) id: String,
    pub(crate) position: Position,

    inbound: Vec<Inbound>,
    targets: Vec<Outbound>,
    processed: Arc<AtomicU64>,
}

impl LoadBalancer {
    pub fn new(id: String, position: Position) -> Self {
        Self {
            id,
            position,
            inbound: Vec::new(),
            targets: Vec::new(),
            processed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Responses forwarded upstream in the current generation
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Number of wired downstream targets
    pub fn targets(&self) -> usize {
        self.targets.len()
    }

    /// Launch the dispatcher and one collector per target
    pub fn run(&mut self, ctx: &RunContext) {
        let (requests, replies): (Vec<_>, Vec<_>) = std::mem::take(&mut self.inbound)
            .into_iter()
            .map(|link| (link.requests, link.responses))
            .unzip();
        let (forward, collect): (Vec<_>, Vec<_>) = std::mem::take(&mut self.targets)
            .into_iter()
            .map(|link| (link.requests, link.responses))
            .unzip();

        if forward.is_empty() {
            warn!(
                load_balancer = %self.id,
                "load balancer has no targets, inbound requests stay queued"
            );
        }

        let routes = Routes::default();

        for (target, responses) in collect.into_iter().enumerate() {
            ctx.tracker.spawn(collect_responses(
                self.id.clone(),
                target,
                responses,
                replies.clone(),
                routes.clone(),
                self.processed.clone(),
                ctx.clone(),
            ));
        }

        let dispatcher = Dispatcher {
            id: self.id.clone(),
            requests: FanIn::new(requests),
            targets: forward,
            routes,
            processed: self.processed.clone(),
            ctx: ctx.clone(),
        };
        ctx.tracker.spawn(dispatcher.run());
    }

    pub fn reset(&mut self) {
        self.inbound.clear();
        self.targets.clear();
        self.processed = Arc::new(AtomicU64::new(0));
    }

    pub fn default_metrics() -> Vec<Metric> {
        vec![Metric::processed(0), Metric::queued(0)]
    }
}

impl RequestSender for LoadBalancer {
    fn set_outbound(&mut self, link: Outbound) {
        self.targets.push(link);
    }
}

impl RequestReceiver for LoadBalancer {
    fn set_inbound(&mut self, link: Inbound) {
        self.inbound.push(link);
    }
}

struct Dispatcher {
    id: String,
    requests: FanIn<Request>,
    targets: Vec<mpsc::Sender<Request>>,
    routes: Routes,
    processed: Arc<AtomicU64>,
    ctx: RunContext,
}

impl Dispatcher {
    #[instrument(skip_all, fields(load_balancer = %self.id))]
    async fn run(mut self) {
        debug!("starting dispatcher with {} targets", self.targets.len());

        let mut ticker = self.ctx.ticker();
        let mut next = 0;
        let has_targets = !self.targets.is_empty();

        loop {
            tokio::select! {
                biased;

                _ = self.ctx.cancel.cancelled() => break,

                _ = ticker.tick() => {
                    if !self.report().await {
                        break;
                    }
                }

                (link, request) = self.requests.recv(), if has_targets => {
                    self.routes.write().insert(request.origin.clone(), link);

                    trace!(
                        "forwarding request {} to target #{next}",
                        request.sequence
                    );

                    tokio::select! {
                        biased;

                        _ = self.ctx.cancel.cancelled() => break,

                        result = self.targets[next].send(request) => {
                            if result.is_err() {
                                warn!("target #{next} request queue closed");
                            }
                        }
                    }

                    next = (next + 1) % self.targets.len();
                }
            }
        }

        debug!("dispatcher cancelled");
    }

    async fn report(&self) -> bool {
        let processed = self.processed.load(Ordering::Relaxed) as i64;
        let queued = self.requests.len() as i64;

        trace!("sending metrics: Processed = {processed}, Queued = {queued}");

        self.ctx
            .publish(Message::new(
                self.id.clone(),
                vec![Metric::processed(processed), Metric::queued(queued)],
            ))
            .await
    }
}

/// Drain one target's response queue and pass responses upstream
#[instrument(skip_all, fields(load_balancer = %id, target_index = target))]
async fn collect_responses(
    id: String,
    target: usize,
    mut responses: mpsc::Receiver<Response>,
    replies: Vec<mpsc::Sender<Response>>,
    routes: Routes,
    processed: Arc<AtomicU64>,
    ctx: RunContext,
) {
    loop {
        let response = tokio::select! {
            biased;

            _ = ctx.cancel.cancelled() => break,

            response = responses.recv() => match response {
                Some(response) => response,
                None => {
                    debug!("target response queue closed");
                    return;
                }
            },
        };

        let link = routes.read().get(&response.origin).copied();
        let Some(reply) = link.and_then(|link| replies.get(link)) else {
            warn!(
                "no route back to {} for response {}",
                response.origin, response.sequence
            );
            continue;
        };

        trace!("forwarding response {} upstream", response.sequence);

        tokio::select! {
            biased;

            _ = ctx.cancel.cancelled() => break,

            result = reply.send(response) => {
                if result.is_err() {
                    trace!("upstream response queue closed");
                    continue;
                }
            }
        }

        processed.fetch_add(1, Ordering::Relaxed);
    }

    debug!("target #{target} collector cancelled");
}
