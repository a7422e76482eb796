//! Queue pairs connecting two nodes
//!
//! Every edge of a system becomes one request queue and one response queue,
//! both bounded. The source node holds the [`Outbound`] end, the target node
//! the [`Inbound`] end. A full queue blocks the pushing side, which is how
//! back-pressure travels upstream.

use std::future::poll_fn;
use std::task::Poll;

use tokio::sync::mpsc;

use super::messages::{Request, Response};

/// Source side of an edge: push requests, pull responses
#[derive(Debug)]
pub struct Outbound {
    pub requests: mpsc::Sender<Request>,
    pub responses: mpsc::Receiver<Response>,
}

/// Target side of an edge: pull requests, push responses
#[derive(Debug)]
pub struct Inbound {
    pub requests: mpsc::Receiver<Request>,
    pub responses: mpsc::Sender<Response>,
}

/// Allocate a fresh queue pair with the given capacity per direction
pub fn link(capacity: usize) -> (Outbound, Inbound) {
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (response_tx, response_rx) = mpsc::channel(capacity);

    (
        Outbound {
            requests: request_tx,
            responses: response_rx,
        },
        Inbound {
            requests: request_rx,
            responses: response_tx,
        },
    )
}

/// Fan-in over several bounded receivers
///
/// Receivers are polled starting one past the last one that yielded, so a
/// busy queue cannot starve the others. Closed receivers are dropped from
/// the rotation; once all are closed, [`FanIn::recv`] never resolves.
#[derive(Debug)]
pub struct FanIn<T> {
    receivers: Vec<Option<mpsc::Receiver<T>>>,
    next: usize,
}

impl<T> FanIn<T> {
    pub fn new(receivers: Vec<mpsc::Receiver<T>>) -> Self {
        Self {
            receivers: receivers.into_iter().map(Some).collect(),
            next: 0,
        }
    }

    /// Items waiting across all receivers
    pub fn len(&self) -> usize {
        self.receivers.iter().flatten().map(|rx| rx.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for the next item, returning it with the index of its receiver
    ///
    /// Cancel safe: an item is only removed from its queue when it is returned.
    pub async fn recv(&mut self) -> (usize, T) {
        poll_fn(|cx| {
            let count = self.receivers.len();
            for offset in 0..count {
                let index = (self.next + offset) % count;
                let slot = &mut self.receivers[index];

                let Some(receiver) = slot.as_mut() else {
                    continue;
                };

                match receiver.poll_recv(cx) {
                    Poll::Ready(Some(item)) => {
                        self.next = (index + 1) % count;
                        return Poll::Ready((index, item));
                    }
                    Poll::Ready(None) => *slot = None,
                    Poll::Pending => {}
                }
            }
            Poll::Pending
        })
        .await
    }
}
