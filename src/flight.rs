//! Per-key single-flight execution.
//!
//! [`SingleFlight::run`] guarantees that at most one closure runs per key at
//! a time. Callers that arrive while a call for their key is in flight block
//! until it finishes and receive a clone of its result instead of running
//! their own closure.
//!
//! The key is released as soon as the leader finishes, so the next caller
//! for that key starts a new flight. Callers that must not repeat work done
//! by a flight that just ended re-check their precondition inside the
//! closure.
//!
//! If the leader panics, its flight is marked abandoned and every waiter
//! retries; one of them becomes the new leader.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

enum State<V> {
    Running,
    Done(V),
    Abandoned,
}

struct Call<V> {
    state: Mutex<State<V>>,
    done: Condvar,
}

impl<V: Clone> Call<V> {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::Running),
            done: Condvar::new(),
        }
    }

    /// Block until the leader finishes. `None` means the leader panicked.
    fn wait(&self) -> Option<V> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                State::Running => self.done.wait(&mut state),
                State::Done(value) => return Some(value.clone()),
                State::Abandoned => return None,
            }
        }
    }
}

enum Role<V> {
    Leader(Arc<Call<V>>),
    Follower(Arc<Call<V>>),
}

/// Deduplicates concurrent work by key.
pub struct SingleFlight<K, V> {
    calls: Mutex<HashMap<K, Arc<Call<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` for `key` unless a call for `key` is already in flight, in
    /// which case wait for that call and return its result.
    pub fn run<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        loop {
            match self.join(&key) {
                Role::Leader(call) => return self.lead(key, call, f),
                Role::Follower(call) => {
                    if let Some(value) = call.wait() {
                        return value;
                    }
                }
            }
        }
    }

    /// Number of keys currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    fn join(&self, key: &K) -> Role<V> {
        let mut calls = self.calls.lock();
        if let Some(call) = calls.get(key) {
            return Role::Follower(Arc::clone(call));
        }
        let call = Arc::new(Call::new());
        calls.insert(key.clone(), Arc::clone(&call));
        Role::Leader(call)
    }

    fn lead<F>(&self, key: K, call: Arc<Call<V>>, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        let mut guard = LeaderGuard {
            flight: self,
            key,
            call,
            completed: false,
        };
        let value = f();
        *guard.call.state.lock() = State::Done(value.clone());
        guard.completed = true;
        value
    }
}

/// Publishes the leader's outcome and releases the key, including on panic.
struct LeaderGuard<'a, K: Eq + Hash, V> {
    flight: &'a SingleFlight<K, V>,
    key: K,
    call: Arc<Call<V>>,
    completed: bool,
}

impl<K: Eq + Hash, V> Drop for LeaderGuard<'_, K, V> {
    fn drop(&mut self) {
        if !self.completed {
            *self.call.state.lock() = State::Abandoned;
        }
        self.flight.calls.lock().remove(&self.key);
        self.call.done.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn single_caller_runs_closure() {
        let flight: SingleFlight<&str, u32> = SingleFlight::new();
        assert_eq!(flight.run("a", || 7), 7);
        assert_eq!(flight.in_flight(), 0);
    }

    #[test]
    fn sequential_calls_run_each_time() {
        let flight: SingleFlight<&str, usize> = SingleFlight::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            flight.run("a", || calls.fetch_add(1, Ordering::SeqCst));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn concurrent_callers_share_one_run() {
        let flight: SingleFlight<String, usize> = SingleFlight::new();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        let results: Vec<usize> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        flight.run("key".to_string(), || {
                            std::thread::sleep(Duration::from_millis(200));
                            calls.fetch_add(1, Ordering::SeqCst) + 100
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|&r| r == 100));
        assert_eq!(flight.in_flight(), 0);
    }

    #[test]
    fn different_keys_do_not_block_each_other() {
        let flight: SingleFlight<u32, u32> = SingleFlight::new();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(4);

        std::thread::scope(|s| {
            for key in 0..4u32 {
                let flight = &flight;
                let calls = &calls;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    flight.run(key, || {
                        std::thread::sleep(Duration::from_millis(50));
                        calls.fetch_add(1, Ordering::SeqCst);
                        key
                    })
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn panicking_leader_releases_key() {
        let flight: SingleFlight<&str, u32> = SingleFlight::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            flight.run("a", || panic!("boom"))
        }));
        assert!(result.is_err());
        assert_eq!(flight.in_flight(), 0);

        assert_eq!(flight.run("a", || 1), 1);
    }

    #[test]
    fn waiter_retries_after_leader_panic() {
        let flight: SingleFlight<&str, u32> = SingleFlight::new();
        let started = Barrier::new(2);

        let waited = std::thread::scope(|s| {
            let leader = s.spawn(|| {
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    flight.run("a", || {
                        started.wait();
                        std::thread::sleep(Duration::from_millis(100));
                        panic!("leader failed")
                    })
                }))
            });
            let follower = s.spawn(|| {
                started.wait();
                flight.run("a", || 42)
            });
            assert!(leader.join().unwrap().is_err());
            follower.join().unwrap()
        });

        assert_eq!(waited, 42);
    }
}
