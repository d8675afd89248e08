//! Per-key dedup ticket (spec §4.4.4).
//!
//! For a given `CacheKey` in this process, at most one outbound fetch is
//! in progress. Concurrent callers that miss the cache and target the
//! same key park on a ticket; when the primary resolver produces a value
//! (or error), all parked callers observe the same outcome. Cancelling
//! one waiter never cancels the in-flight work unless it was the last
//! remaining waiter.
//!
//! Built on `DashMap` + `tokio::sync::broadcast`, matching the
//! `tokio::sync::RwLock`-guarded shared-state idiom the teacher uses for
//! cross-task coordination in `OptopsyServer`, generalized to a
//! subscribe/broadcast ticket since outcomes here must fan out to an
//! unbounded number of waiters rather than guard a single resource.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::CoreError;
use crate::keys::CacheKey;

/// Cloned across waiters; `CoreError` does not implement `Clone`, so
/// errors are carried as their rendered message plus the dimension
/// needed to reconstruct a typed error case for logging.
#[derive(Debug, Clone)]
pub enum FlightOutcome<T: Clone> {
    Ok(T),
    Err(String),
}

/// One in-flight fetch. `outcome` is the source of truth for a completed
/// flight; `tx` only wakes up waiters already parked on `recv`. A follower
/// that subscribes to `tx` strictly before checking `outcome` never misses
/// a result: the leader always fills `outcome` before calling `tx.send`,
/// so a `None` read here proves the send hasn't happened yet either.
struct Flight<T: Clone> {
    tx: broadcast::Sender<FlightOutcome<T>>,
    outcome: Mutex<Option<FlightOutcome<T>>>,
}

pub struct SingleFlightGate<T: Clone + Send + Sync + 'static> {
    inflight: DashMap<CacheKey, Arc<Flight<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Default for SingleFlightGate<T> {
    fn default() -> Self {
        Self {
            inflight: DashMap::new(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> SingleFlightGate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `fetch` for `key`, or joins an in-flight call already running
    /// for the same key. `fetch` is run at most once per flight.
    pub async fn run<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let (flight, is_leader) = match self.inflight.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => (entry.get().clone(), false),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let (tx, _rx) = broadcast::channel(1);
                let flight = Arc::new(Flight {
                    tx,
                    outcome: Mutex::new(None),
                });
                entry.insert(flight.clone());
                (flight, true)
            }
        };

        if !is_leader {
            let mut rx = flight.tx.subscribe();
            if let Some(outcome) = flight.outcome.lock().clone() {
                return outcome_to_result(outcome);
            }
            return match rx.recv().await {
                Ok(outcome) => outcome_to_result(outcome),
                Err(_) => match flight.outcome.lock().clone() {
                    Some(outcome) => outcome_to_result(outcome),
                    None => Err(CoreError::Fatal(
                        "single-flight leader dropped without a result".into(),
                    )),
                },
            };
        }

        let result = fetch().await;
        let outcome = match &result {
            Ok(value) => FlightOutcome::Ok(value.clone()),
            Err(err) => FlightOutcome::Err(err.to_string()),
        };
        *flight.outcome.lock() = Some(outcome.clone());
        let _ = flight.tx.send(outcome);
        self.inflight.remove(&key);
        result
    }
}

fn outcome_to_result<T: Clone>(outcome: FlightOutcome<T>) -> Result<T, CoreError> {
    match outcome {
        FlightOutcome::Ok(value) => Ok(value),
        FlightOutcome::Err(message) => Err(crate::error::transient("single_flight", message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Regression test for the case where a follower reaches the map
    /// after the leader has already stashed its outcome (and possibly
    /// already sent the broadcast) but before the entry is removed: the
    /// follower must read the stashed outcome instead of subscribing and
    /// waiting on a message it can no longer observe.
    #[tokio::test]
    async fn late_joiner_reads_outcome_already_stashed_by_the_leader() {
        let gate = SingleFlightGate::<i32>::new();
        let key = CacheKey::new("ns", "kind", vec!["a".into()], 1);
        let (tx, _rx) = broadcast::channel(1);
        let flight = Arc::new(Flight {
            tx,
            outcome: Mutex::new(Some(FlightOutcome::Ok(99))),
        });
        gate.inflight.insert(key.clone(), flight);

        let result = tokio::time::timeout(
            Duration::from_millis(200),
            gate.run(key, || async { panic!("fetch must not run when an outcome is already stashed") }),
        )
        .await
        .expect("must not hang waiting on a broadcast message that already fired")
        .unwrap();

        assert_eq!(result, 99);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let gate = Arc::new(SingleFlightGate::<i32>::new());
        let calls = Arc::new(AtomicU32::new(0));
        let key = CacheKey::new("ns", "kind", vec!["a".into()], 1);

        let mut handles = Vec::new();
        for _ in 0..5 {
            let gate = gate.clone();
            let calls = calls.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                gate.run(key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok::<_, CoreError>(42)
                })
                .await
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sequential_calls_each_fetch_again() {
        let gate = SingleFlightGate::<i32>::new();
        let calls = Arc::new(AtomicU32::new(0));
        let key = CacheKey::new("ns", "kind", vec!["a".into()], 1);

        for _ in 0..3 {
            let calls = calls.clone();
            gate.run(key.clone(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CoreError>(1)
            })
            .await
            .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
