//! Server - processes requests with bounded concurrency
//!
//! ## Message Flow
//!
//! ```text
//! inbound request queue(s) → acquire slot → spawn processing unit
//!     ↑                                          │ sleep(lower..=upper ms)
//!     │                                          └→ Response → inbound response queue
//!     └─── metrics tick: {Processed, Queued, Utilisation}
//! ```
//!
//! The slot pool is a semaphore with `max_routines` permits. While every
//! permit is taken the receive loop stops pulling, so the inbound queue fills
//! up and pushes back on whoever sends to this server.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use crate::config::ProcessingTime;
use crate::metrics::{Message, Metric};

use super::link::{FanIn, Inbound};
use super::messages::{Position, Request, Response};
use super::node::{RequestReceiver, RunContext};

#[derive(Debug)]
pub struct Server {
    pub(crate) id: String,
    pub(crate) position: Position,

    inbound: Vec<Inbound>,
    max_routines: usize,
    slots: Arc<Semaphore>,
    processed: Arc<AtomicU64>,
}

impl Server {
    pub fn new(id: String, position: Position, max_routines: usize) -> Self {
        Self {
            id,
            position,
            inbound: Vec::new(),
            max_routines,
            slots: Arc::new(Semaphore::new(max_routines)),
            processed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Requests answered in the current generation
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Slots currently held by processing units
    pub fn in_flight(&self) -> usize {
        self.max_routines - self.slots.available_permits()
    }

    /// Launch the receive loop
    pub fn run(&mut self, ctx: &RunContext) {
        let (requests, replies): (Vec<_>, Vec<_>) = std::mem::take(&mut self.inbound)
            .into_iter()
            .map(|link| (link.requests, link.responses))
            .unzip();

        let receiver = ReceiveLoop {
            id: self.id.clone(),
            requests: FanIn::new(requests),
            replies,
            slots: self.slots.clone(),
            max_routines: self.max_routines,
            processed: self.processed.clone(),
            ctx: ctx.clone(),
        };

        ctx.tracker.spawn(receiver.run());
    }

    pub fn reset(&mut self) {
        self.inbound.clear();
        self.slots = Arc::new(Semaphore::new(self.max_routines));
        self.processed = Arc::new(AtomicU64::new(0));
    }

    pub fn default_metrics() -> Vec<Metric> {
        vec![Metric::processed(0), Metric::queued(0), Metric::utilisation(0)]
    }
}

impl RequestReceiver for Server {
    fn set_inbound(&mut self, link: Inbound) {
        self.inbound.push(link);
    }
}

struct ReceiveLoop {
    id: String,
    requests: FanIn<Request>,
    replies: Vec<mpsc::Sender<Response>>,
    slots: Arc<Semaphore>,
    max_routines: usize,
    processed: Arc<AtomicU64>,
    ctx: RunContext,
}

impl ReceiveLoop {
    #[instrument(skip_all, fields(server = %self.id))]
    async fn run(mut self) {
        debug!("starting receive loop");

        let mut ticker = self.ctx.ticker();

        'receive: loop {
            let (link, request) = tokio::select! {
                biased;

                _ = self.ctx.cancel.cancelled() => break 'receive,

                _ = ticker.tick() => {
                    if !self.report().await {
                        break 'receive;
                    }
                    continue 'receive;
                }

                received = self.requests.recv() => received,
            };

            // Keep reporting while every slot is taken
            let permit = loop {
                tokio::select! {
                    biased;

                    _ = self.ctx.cancel.cancelled() => break 'receive,

                    _ = ticker.tick() => {
                        if !self.report().await {
                            break 'receive;
                        }
                    }

                    permit = self.slots.clone().acquire_owned() => match permit {
                        Ok(permit) => break permit,
                        Err(_) => break 'receive,
                    },
                }
            };

            trace!("received request number {}", request.sequence);

            self.ctx.tracker.spawn(process(
                request,
                self.replies[link].clone(),
                permit,
                self.processed.clone(),
                self.ctx.cancel.clone(),
                self.ctx.config.processing_time_ms,
            ));
        }

        debug!("receive loop cancelled");
    }

    fn utilisation(&self) -> i64 {
        let occupied = self.max_routines - self.slots.available_permits();
        (occupied * 100).checked_div(self.max_routines).unwrap_or(0) as i64
    }

    async fn report(&self) -> bool {
        let processed = self.processed.load(Ordering::Relaxed) as i64;
        let queued = self.requests.len() as i64;
        let utilisation = self.utilisation();

        trace!(
            "sending metrics: Processed = {processed}, Queued = {queued}, Utilisation = {utilisation}"
        );

        self.ctx
            .publish(Message::new(
                self.id.clone(),
                vec![
                    Metric::processed(processed),
                    Metric::queued(queued),
                    Metric::utilisation(utilisation),
                ],
            ))
            .await
    }
}

/// Handle a single request while holding one slot
async fn process(
    request: Request,
    reply: mpsc::Sender<Response>,
    permit: OwnedSemaphorePermit,
    processed: Arc<AtomicU64>,
    cancel: CancellationToken,
    processing_time: ProcessingTime,
) {
    let _permit = permit;

    if cancel.is_cancelled() {
        trace!("processing request number {} cancelled", request.sequence);
        return;
    }

    let millis = rand::thread_rng().gen_range(processing_time.lower..=processing_time.upper);
    sleep(Duration::from_millis(millis)).await;

    trace!("responding to request number {}", request.sequence);

    tokio::select! {
        biased;

        _ = cancel.cancelled() => return,

        result = reply.send(Response::to(&request)) => {
            if result.is_err() {
                trace!("response queue closed, dropping response {}", request.sequence);
                return;
            }
        }
    }

    processed.fetch_add(1, Ordering::Relaxed);
}
