//! # Connectivity Monitor
//!
//! Tracks the ONLINE ⇄ OFFLINE state and tells interested parties about
//! transitions.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Connectivity States                                 │
//! │                                                                         │
//! │              set_online(false)                                          │
//! │   ┌────────┐ ───────────────────► ┌─────────┐                          │
//! │   │ ONLINE │                      │ OFFLINE │                          │
//! │   └────────┘ ◄─────────────────── └─────────┘                          │
//! │              set_online(true)                                           │
//! │                     │                                                   │
//! │                     ├── every subscriber/callback sees the transition   │
//! │                     └── the drain nudge fires EXACTLY ONCE per          │
//! │                         OFFLINE→ONLINE transition (not per listener)    │
//! │                                                                         │
//! │  There is no partially-online state and no active probing: the         │
//! │  embedder reports what the runtime's network API says, and that is     │
//! │  ground truth.                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This component is infallible on purpose - it runs in contexts with no
//! error handler, so nothing here returns `Result` or panics.

use std::sync::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Callback invoked with the new state on every transition.
pub type ConnectivityCallback = Box<dyn Fn(bool) + Send + Sync>;

// =============================================================================
// Connectivity Monitor
// =============================================================================

/// Watches connectivity transitions and nudges the queue drain on
/// reconnect.
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
    listeners: Mutex<Vec<ConnectivityCallback>>,
    drain_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the runtime's initial connectivity.
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        ConnectivityMonitor {
            state,
            listeners: Mutex::new(Vec::new()),
            drain_tx: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Returns a watch receiver observing every transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Registers a callback invoked with the new state on each transition.
    ///
    /// Callbacks must not panic: they run on whatever task reported the
    /// transition.
    pub fn on_change(&self, callback: impl Fn(bool) + Send + Sync + 'static) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Box::new(callback));
        }
    }

    /// Registers the drain hook and returns the receiving end.
    ///
    /// The coordinator's drain loop consumes this receiver; one unit is
    /// sent per OFFLINE→ONLINE transition. The channel holds a single
    /// pending nudge - a nudge that is already waiting covers any
    /// transition that arrives before the drain runs.
    pub fn drain_nudges(&self) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel(1);
        if let Ok(mut guard) = self.drain_tx.lock() {
            *guard = Some(tx);
        }
        rx
    }

    /// Reports the runtime's connectivity. Only transitions have effects.
    pub fn set_online(&self, online: bool) {
        let changed = self.state.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });

        if !changed {
            return;
        }

        if online {
            info!("Connectivity restored");
        } else {
            info!("Connectivity lost");
        }

        if let Ok(listeners) = self.listeners.lock() {
            for callback in listeners.iter() {
                callback(online);
            }
        }

        if online {
            if let Ok(guard) = self.drain_tx.lock() {
                if let Some(tx) = guard.as_ref() {
                    // try_send: a full channel means a nudge is already
                    // pending, which covers this transition too.
                    if tx.try_send(()).is_err() {
                        debug!("Drain nudge already pending");
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("online", &self.is_online())
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_initial_state() {
        assert!(ConnectivityMonitor::new(true).is_online());
        assert!(!ConnectivityMonitor::new(false).is_online());
    }

    #[test]
    fn test_listeners_fire_on_transitions_only() {
        let monitor = ConnectivityMonitor::new(true);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        monitor.on_change(move |online| seen_clone.lock().unwrap().push(online));

        monitor.set_online(true); // no transition
        monitor.set_online(false);
        monitor.set_online(false); // no transition
        monitor.set_online(true);

        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
    }

    #[tokio::test]
    async fn test_drain_nudge_fires_once_per_reconnect_not_per_listener() {
        let monitor = ConnectivityMonitor::new(false);
        let mut nudges = monitor.drain_nudges();

        // Several listeners; the nudge count must not scale with them.
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let counter = counter.clone();
            monitor.on_change(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        monitor.set_online(true);

        nudges.recv().await.unwrap();
        assert!(nudges.try_recv().is_err(), "only one nudge per transition");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_nudge_when_going_offline() {
        let monitor = ConnectivityMonitor::new(true);
        let mut nudges = monitor.drain_nudges();

        monitor.set_online(false);
        assert!(nudges.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_pending_nudge_absorbs_further_transitions() {
        let monitor = ConnectivityMonitor::new(false);
        let mut nudges = monitor.drain_nudges();

        monitor.set_online(true);
        monitor.set_online(false);
        monitor.set_online(true); // channel already holds a nudge

        nudges.recv().await.unwrap();
        assert!(nudges.try_recv().is_err());
    }

    #[test]
    fn test_watch_subscriber_observes_state() {
        let monitor = ConnectivityMonitor::new(true);
        let rx = monitor.subscribe();

        monitor.set_online(false);
        assert!(!*rx.borrow());
    }
}
