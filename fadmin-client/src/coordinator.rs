use crate::error::Error;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::instrument;

/// Result of a refresh exchange: the new access token, or the error every waiter is rejected with.
pub type RefreshOutcome = Result<String, Error>;

/// Role assigned to a caller by [`RefreshCoordinator::begin_or_join`].
#[derive(Debug)]
pub enum RefreshRole {
    /// No refresh was in flight, the caller must perform it and settle the lease.
    Leader(RefreshLease),
    /// A refresh is already in flight, the subscription resolves once it settles.
    Follower(RefreshSubscription),
}

#[derive(Debug, Default)]
struct CoordinatorState {
    refreshing: bool,
    pending: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Ensures at most one token refresh is in flight and fans its outcome out to everyone who asked
/// for a refresh in the meantime.
///
/// The in-flight flag and the pending queue live behind a single lock, so checking and setting the
/// flag can never interleave with another caller, regardless of the runtime flavour.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Arc<Mutex<CoordinatorState>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a refresh or joins the one currently in flight.
    #[instrument(level = "trace", skip(self))]
    pub fn begin_or_join(&self) -> RefreshRole {
        let mut state = self.state.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.pending.push(tx);
            tracing::trace!(pending = state.pending.len(), "Joining in-flight refresh");
            RefreshRole::Follower(RefreshSubscription { rx })
        } else {
            state.refreshing = true;
            tracing::trace!("Starting refresh");
            RefreshRole::Leader(RefreshLease {
                state: self.state.clone(),
                settled: false,
            })
        }
    }

    /// Notifies every pending waiter in insertion order, then releases the in-flight flag.
    ///
    /// Returns the number of waiters notified. Waiters that stopped listening are skipped.
    #[instrument(level = "trace", skip_all, fields(ok = outcome.is_ok()))]
    pub fn settle(&self, outcome: RefreshOutcome) -> usize {
        settle(&self.state, outcome)
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of callers currently waiting on the in-flight refresh.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }
}

fn settle(state: &Mutex<CoordinatorState>, outcome: RefreshOutcome) -> usize {
    let mut state = state.lock();
    if !state.refreshing {
        tracing::warn!("Settling refresh while none is in flight");
    }

    let pending = std::mem::take(&mut state.pending);
    let notified = pending
        .into_iter()
        .map(|tx| tx.send(outcome.clone()).is_ok())
        .filter(|delivered| *delivered)
        .count();

    state.refreshing = false;
    tracing::trace!(notified, "Refresh settled");
    notified
}

/// Handle on the in-flight refresh, owned by whoever performs it.
///
/// The lease is `'static` and can be moved into a spawned task. Dropping it unsettled (e.g. when
/// that task panics) rejects all waiters with [`Error::RefreshAbandoned`] and releases the
/// in-flight flag.
#[derive(Debug)]
pub struct RefreshLease {
    state: Arc<Mutex<CoordinatorState>>,
    settled: bool,
}

impl RefreshLease {
    pub fn settle(mut self, outcome: RefreshOutcome) -> usize {
        self.settled = true;
        settle(&self.state, outcome)
    }
}

impl Drop for RefreshLease {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Refresh lease dropped before settling, releasing waiters");
            settle(&self.state, Err(Error::RefreshAbandoned));
        }
    }
}

/// A request suspended until the in-flight refresh settles.
#[derive(Debug)]
pub struct RefreshSubscription {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl RefreshSubscription {
    pub async fn wait(self) -> RefreshOutcome {
        self.rx.await.unwrap_or(Err(Error::RefreshAbandoned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RefreshError;
    use pretty_assertions::{assert_eq, assert_matches};
    use std::sync::Arc;
    use test_log::test;

    fn follower(coordinator: &RefreshCoordinator) -> RefreshSubscription {
        match coordinator.begin_or_join() {
            RefreshRole::Follower(subscription) => subscription,
            RefreshRole::Leader(_) => panic!("Expected to join the in-flight refresh"),
        }
    }

    #[test(tokio::test)]
    async fn single_leader() {
        let coordinator = RefreshCoordinator::new();
        assert!(!coordinator.is_refreshing());

        let lease = match coordinator.begin_or_join() {
            RefreshRole::Leader(lease) => lease,
            RefreshRole::Follower(_) => panic!("Expected to lead the refresh"),
        };
        assert!(coordinator.is_refreshing());

        let first = follower(&coordinator);
        let second = follower(&coordinator);
        assert_eq!(coordinator.pending(), 2);

        assert_eq!(lease.settle(Ok("tok2".to_string())), 2);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 0);

        assert_eq!(first.wait().await.unwrap(), "tok2");
        assert_eq!(second.wait().await.unwrap(), "tok2");
    }

    #[test(tokio::test)]
    async fn failure_reaches_every_follower() {
        let coordinator = RefreshCoordinator::new();
        let RefreshRole::Leader(lease) = coordinator.begin_or_join() else {
            panic!("Expected to lead the refresh");
        };
        let followers = (0..3).map(|_| follower(&coordinator)).collect::<Vec<_>>();

        lease.settle(Err(Error::Refresh(RefreshError::Rejected { status: 401 })));

        for subscription in followers {
            assert_matches!(
                subscription.wait().await,
                Err(Error::Refresh(RefreshError::Rejected { status: 401 }))
            );
        }
    }

    #[test(tokio::test)]
    async fn new_cycle_after_settle() {
        let coordinator = RefreshCoordinator::new();
        let RefreshRole::Leader(lease) = coordinator.begin_or_join() else {
            panic!("Expected to lead the refresh");
        };
        lease.settle(Ok("tok2".to_string()));

        assert_matches!(coordinator.begin_or_join(), RefreshRole::Leader(_));
    }

    #[test(tokio::test)]
    async fn dropped_lease_releases_followers() {
        let coordinator = RefreshCoordinator::new();
        let lease = coordinator.begin_or_join();
        let subscription = follower(&coordinator);

        drop(lease);

        assert!(!coordinator.is_refreshing());
        assert_matches!(subscription.wait().await, Err(Error::RefreshAbandoned));
    }

    #[test(tokio::test)]
    async fn skips_gone_followers() {
        let coordinator = RefreshCoordinator::new();
        let RefreshRole::Leader(lease) = coordinator.begin_or_join() else {
            panic!("Expected to lead the refresh");
        };
        drop(follower(&coordinator));
        let waiting = follower(&coordinator);

        assert_eq!(lease.settle(Ok("tok2".to_string())), 1);
        assert_eq!(waiting.wait().await.unwrap(), "tok2");
    }

    #[test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
    async fn concurrent_callers_elect_one_leader() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let barrier = Arc::new(tokio::sync::Barrier::new(8));

        let handles = (0..8)
            .map(|_| {
                let coordinator = coordinator.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    match coordinator.begin_or_join() {
                        RefreshRole::Leader(lease) => {
                            while coordinator.pending() < 7 {
                                tokio::task::yield_now().await;
                            }
                            lease.settle(Ok("tok2".to_string()));
                            (true, "tok2".to_string())
                        }
                        RefreshRole::Follower(subscription) => {
                            (false, subscription.wait().await.unwrap())
                        }
                    }
                })
            })
            .collect::<Vec<_>>();

        let mut leaders = 0;
        for handle in handles {
            let (leader, token) = handle.await.unwrap();
            leaders += usize::from(leader);
            assert_eq!(token, "tok2");
        }
        assert_eq!(leaders, 1);
    }
}
