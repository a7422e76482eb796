//! Client - generates a fixed workload and measures latency
//!
//! ## Message Flow
//!
//! ```text
//! producer: sequence 0..N → RequestStore → outbound request queue(s)
//!                              │
//! consumer: response queue(s) ─┴→ latency → Message{Responses, Avg. Latency}
//!     ↑
//!     └─── metrics tick (every `metrics_interval_ms`)
//! ```
//!
//! Once the consumer has seen all N responses it reports a final time and
//! cancels the whole generation, which ends the simulation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, trace, warn};

use crate::metrics::{Message, Metric};

use super::link::{FanIn, Outbound};
use super::messages::{Position, Request, Response};
use super::node::{RequestSender, RunContext};

/// Clients stay quiet during the first second of a run
pub const REPORT_WARMUP: Duration = Duration::from_secs(1);

/// Sent requests of the current run, keyed by sequence number
#[derive(Debug, Default)]
pub struct RequestStore {
    requests: RwLock<HashMap<usize, Request>>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, request: Request) {
        self.requests.write().insert(request.sequence, request);
    }

    pub fn get(&self, sequence: usize) -> Option<Request> {
        self.requests.read().get(&sequence).cloned()
    }

    pub fn len(&self) -> usize {
        self.requests.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct Client {
    pub(crate) id: String,
    pub(crate) position: Position,

    outbound: Vec<Outbound>,
    requests: Arc<RequestStore>,
}

impl Client {
    pub fn new(id: String, position: Position) -> Self {
        Self {
            id,
            position,
            outbound: Vec::new(),
            requests: Arc::new(RequestStore::new()),
        }
    }

    /// Requests recorded in the current run
    pub fn requests(&self) -> &RequestStore {
        &self.requests
    }

    /// Launch the producer and the consumer
    pub fn run(&mut self, ctx: &RunContext) {
        let (senders, receivers): (Vec<_>, Vec<_>) = std::mem::take(&mut self.outbound)
            .into_iter()
            .map(|link| (link.requests, link.responses))
            .unzip();

        if senders.is_empty() {
            warn!(client = %self.id, "client has no outbound edge, no requests will be sent");
        }

        let started = Instant::now();

        ctx.tracker.spawn(produce(
            self.id.clone(),
            senders,
            self.requests.clone(),
            ctx.clone(),
        ));

        ctx.tracker.spawn(consume(
            self.id.clone(),
            FanIn::new(receivers),
            self.requests.clone(),
            started,
            ctx.clone(),
        ));
    }

    pub fn reset(&mut self) {
        self.outbound.clear();
        self.requests = Arc::new(RequestStore::new());
    }

    pub fn default_metrics() -> Vec<Metric> {
        vec![Metric::responses(0), Metric::avg_latency(0)]
    }
}

impl RequestSender for Client {
    fn set_outbound(&mut self, link: Outbound) {
        self.outbound.push(link);
    }
}

/// Send `num_requests` requests, one every `request_interval_ms`
///
/// With several outbound links the requests are spread round-robin.
#[instrument(skip_all, fields(client = %id))]
async fn produce(
    id: String,
    senders: Vec<mpsc::Sender<Request>>,
    store: Arc<RequestStore>,
    ctx: RunContext,
) {
    if senders.is_empty() {
        return;
    }

    let total = ctx.config.num_requests;
    let interval = ctx.config.request_interval();

    for sequence in 0..total {
        if ctx.cancel.is_cancelled() {
            debug!("request producer cancelled at {sequence}/{total}");
            return;
        }

        trace!("sending request number {sequence}");

        let request = Request::new(sequence, id.clone());
        store.put(request.clone());

        let target = &senders[sequence % senders.len()];
        tokio::select! {
            biased;

            _ = ctx.cancel.cancelled() => {
                debug!("request producer cancelled at {sequence}/{total}");
                return;
            }

            result = target.send(request) => {
                if result.is_err() {
                    warn!("request queue closed, stopping producer");
                    return;
                }
            }
        }

        tokio::select! {
            biased;

            _ = ctx.cancel.cancelled() => {
                debug!("request producer cancelled at {}/{total}", sequence + 1);
                return;
            }

            _ = sleep(interval) => {}
        }
    }

    debug!("request producer complete");
}

/// Running latency figures of one client run
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct LatencyStats {
    pub responses: usize,
    pub total_latency_ms: i64,
}

impl LatencyStats {
    pub fn record(&mut self, latency_ms: i64) {
        self.responses += 1;
        self.total_latency_ms += latency_ms;
    }

    pub fn average_ms(&self) -> i64 {
        if self.responses == 0 {
            0
        } else {
            self.total_latency_ms / self.responses as i64
        }
    }
}

/// Latency of a consumed response in whole milliseconds
///
/// Unknown sequence numbers are reported with a latency of zero.
fn latency_ms(store: &RequestStore, response: &Response) -> i64 {
    let Some(request) = store.get(response.sequence) else {
        warn!(
            "received response for unknown request number {}",
            response.sequence
        );
        return 0;
    };

    let received_at = response.received_at.unwrap_or_else(Instant::now);
    received_at.duration_since(request.sent_at).as_millis() as i64
}

#[instrument(skip_all, fields(client = %id))]
async fn consume(
    id: String,
    mut responses: FanIn<Response>,
    store: Arc<RequestStore>,
    started: Instant,
    ctx: RunContext,
) {
    let total = ctx.config.num_requests;
    let mut ticker = ctx.ticker();
    let mut stats = LatencyStats::default();

    loop {
        tokio::select! {
            biased;

            _ = ctx.cancel.cancelled() => {
                debug!("response consumer cancelled");
                return;
            }

            _ = ticker.tick() => {
                if started.elapsed() < REPORT_WARMUP || stats.responses == 0 {
                    trace!("not sending metrics");
                    continue;
                }

                trace!(
                    "sending metrics: Num Responses = {}, Avg. Latency = {}",
                    stats.responses,
                    stats.average_ms()
                );
                let message = Message::new(
                    id.clone(),
                    vec![
                        Metric::responses(stats.responses as i64),
                        Metric::avg_latency(stats.average_ms()),
                    ],
                );
                if !ctx.publish(message).await {
                    debug!("response consumer cancelled");
                    return;
                }

                if stats.responses >= total {
                    info!("all {total} responses received, ending run");
                    ctx.cancel.cancel();
                    return;
                }
            }

            (_, response) = responses.recv() => {
                let response = response.received();
                let latency = latency_ms(&store, &response);
                stats.record(latency);

                trace!(
                    "received response for request {}. Latency = {latency}, Avg. Latency = {}",
                    response.sequence,
                    stats.average_ms()
                );
            }
        }
    }
}
