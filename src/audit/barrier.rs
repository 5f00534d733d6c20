// src/audit/barrier.rs
// =============================================================================
// A one-shot barrier between the download phase and the validation phase.
//
// Every repository worker holds an Arrival ticket. A worker arrives once its
// archive download is over (successful or not). Workers that downloaded
// something then wait until *every* worker has arrived, so link validation
// never overlaps with archive downloads.
//
// A ticket that is dropped without arriving (early return, panic) counts as
// an arrival. Siblings can therefore never deadlock on a dead worker.
//
// Rust concepts:
// - tokio::sync::watch: a value many tasks can observe; here, the number of
//   workers that still have to arrive
// - Drop: run code when a value goes out of scope
// =============================================================================

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug)]
pub struct PhaseBarrier {
    remaining: watch::Sender<usize>,
}

impl PhaseBarrier {
    /// Barrier for `participants` workers. Zero participants is already open.
    pub fn new(participants: usize) -> Arc<Self> {
        let (remaining, _) = watch::channel(participants);
        Arc::new(PhaseBarrier { remaining })
    }

    /// Hands out one ticket. Create exactly one per participant.
    pub fn arrival(self: &Arc<Self>) -> Arrival {
        Arrival {
            barrier: Arc::clone(self),
            arrived: false,
        }
    }

    /// Workers that have not arrived yet
    pub fn remaining(&self) -> usize {
        *self.remaining.borrow()
    }

    /// Resolves once every participant has arrived
    pub async fn wait(&self) {
        let mut rx = self.remaining.subscribe();
        // The sender lives in self, so this can't fail while we are borrowed
        let _ = rx.wait_for(|remaining| *remaining == 0).await;
    }

    fn arrive(&self) {
        self.remaining
            .send_modify(|remaining| *remaining = remaining.saturating_sub(1));
    }
}

/// One worker's ticket for the barrier.
#[derive(Debug)]
pub struct Arrival {
    barrier: Arc<PhaseBarrier>,
    arrived: bool,
}

impl Arrival {
    /// Signals arrival without waiting for the others
    pub fn arrive(mut self) {
        self.mark_arrived();
    }

    /// Signals arrival, then waits until all workers have arrived
    pub async fn arrive_and_wait(mut self) {
        self.mark_arrived();
        self.barrier.wait().await;
    }

    fn mark_arrived(&mut self) {
        if !self.arrived {
            self.arrived = true;
            self.barrier.arrive();
        }
    }
}

impl Drop for Arrival {
    fn drop(&mut self) {
        self.mark_arrived();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_waiters_released_only_after_everyone_arrives() {
        let barrier = PhaseBarrier::new(2);
        let first = barrier.arrival();
        let second = barrier.arrival();

        let waiter = tokio::spawn(first.arrive_and_wait());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());
        assert_eq!(barrier.remaining(), 1);

        second.arrive();
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter released")
            .unwrap();
        assert_eq!(barrier.remaining(), 0);
    }

    #[tokio::test]
    async fn test_dropped_ticket_counts_as_arrival() {
        let barrier = PhaseBarrier::new(2);
        let survivor = barrier.arrival();
        let failed = barrier.arrival();

        drop(failed);
        timeout(Duration::from_secs(1), survivor.arrive_and_wait())
            .await
            .expect("no deadlock on a dropped ticket");
    }

    #[tokio::test]
    async fn test_panicking_worker_still_arrives() {
        let barrier = PhaseBarrier::new(2);
        let doomed = barrier.arrival();
        let survivor = barrier.arrival();

        let crashed = tokio::spawn(async move {
            let _ticket = doomed;
            panic!("worker failed before the barrier");
        });
        assert!(crashed.await.is_err());

        timeout(Duration::from_secs(1), survivor.arrive_and_wait())
            .await
            .expect("no deadlock on a panicked worker");
    }

    #[tokio::test]
    async fn test_empty_barrier_is_open() {
        let barrier = PhaseBarrier::new(0);
        timeout(Duration::from_secs(1), barrier.wait())
            .await
            .expect("nothing to wait for");
    }

    #[tokio::test]
    async fn test_arriving_twice_counts_once() {
        let barrier = PhaseBarrier::new(3);
        let mut ticket = barrier.arrival();
        ticket.mark_arrived();
        ticket.mark_arrived();
        drop(ticket);
        assert_eq!(barrier.remaining(), 2);
    }
}
