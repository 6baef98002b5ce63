//! Per-transaction operation ordering.
//!
//! Every operation takes a [`Ticket`] at the moment it is issued. Tickets
//! are served strictly in issue order: an operation starts only once every
//! earlier ticket of the same transaction has been released. Releasing
//! happens when the ticket is dropped, so an operation that never got to
//! run does not stall the ones behind it.
//!
//! A [`Hold`] keeps the queue busy without taking a place in the order. It
//! covers work, such as a joined nested transaction body, that issues its
//! own tickets later but must still finish before the commit.

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

#[derive(Debug, Default)]
struct QueueState {
    next: u64,
    serving: u64,
    /// Released tickets that are ahead of `serving`.
    released: BTreeSet<u64>,
    waiters: HashMap<u64, oneshot::Sender<()>>,
}

/// Issue-ordered operation queue.
#[derive(Debug)]
pub(crate) struct OpQueue {
    state: Mutex<QueueState>,
    outstanding: watch::Sender<usize>,
}

impl OpQueue {
    pub(crate) fn new() -> Arc<Self> {
        let (outstanding, _) = watch::channel(0);
        Arc::new(Self {
            state: Mutex::new(QueueState::default()),
            outstanding,
        })
    }

    /// Issues the next ticket.
    pub(crate) fn issue(self: &Arc<Self>) -> Ticket {
        let seq = {
            let mut state = self.state.lock();
            let seq = state.next;
            state.next += 1;
            seq
        };
        self.outstanding.send_modify(|n| *n += 1);
        Ticket {
            seq,
            queue: Arc::clone(self),
        }
    }

    /// Marks the queue busy until the returned guard is dropped.
    pub(crate) fn hold(self: &Arc<Self>) -> Hold {
        self.outstanding.send_modify(|n| *n += 1);
        Hold {
            queue: Arc::clone(self),
        }
    }

    /// Returns the number of issued tickets and holds not yet released.
    pub(crate) fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Waits until every issued ticket has been released.
    pub(crate) async fn drained(&self) {
        let mut rx = self.outstanding.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    fn release(&self, seq: u64) {
        {
            let mut state = self.state.lock();
            if seq == state.serving {
                state.serving += 1;
                loop {
                    let serving = state.serving;
                    if !state.released.remove(&serving) {
                        break;
                    }
                    state.serving += 1;
                }
                let serving = state.serving;
                if let Some(waiter) = state.waiters.remove(&serving) {
                    let _ = waiter.send(());
                }
            } else {
                state.released.insert(seq);
                state.waiters.remove(&seq);
            }
        }
        self.settle();
    }

    fn settle(&self) {
        self.outstanding.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Keeps an [`OpQueue`] from draining.
#[derive(Debug)]
pub(crate) struct Hold {
    queue: Arc<OpQueue>,
}

impl Drop for Hold {
    fn drop(&mut self) {
        self.queue.settle();
    }
}

/// A place in a transaction's operation order.
#[derive(Debug)]
pub(crate) struct Ticket {
    seq: u64,
    queue: Arc<OpQueue>,
}

impl Ticket {
    /// Waits until every earlier ticket has been released.
    pub(crate) async fn turn(&self) {
        let rx = {
            let mut state = self.queue.state.lock();
            if state.serving == self.seq {
                return;
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.insert(self.seq, tx);
            rx
        };
        let _ = rx.await;
    }

    /// Returns the ticket's position.
    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.queue.release(self.seq);
    }
}
