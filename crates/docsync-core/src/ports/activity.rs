//! Activity reporting port
//!
//! Thin bridge the engine calls to signal start and stop of externally
//! visible work (a transfer, a recursive folder operation). Consumers
//! count in-flight operations, so the calls must pair exactly even on
//! early returns; [`ActivityScope`] enforces the pairing through RAII.

use std::sync::Arc;

/// Listener informed when synchronization work starts and stops
pub trait IActivityListener: Send + Sync {
    /// A unit of work began
    fn activity_started(&self);

    /// A unit of work finished (successfully or not)
    fn activity_stopped(&self);
}

/// RAII guard pairing `activity_started` with `activity_stopped`
///
/// Calls `activity_started` on construction and `activity_stopped` when
/// dropped, on every exit path.
pub struct ActivityScope {
    listener: Arc<dyn IActivityListener>,
}

impl ActivityScope {
    /// Enter a unit of work
    #[must_use]
    pub fn enter(listener: Arc<dyn IActivityListener>) -> Self {
        listener.activity_started();
        Self { listener }
    }
}

impl Drop for ActivityScope {
    fn drop(&mut self) {
        self.listener.activity_stopped();
    }
}

/// Listener that ignores all activity (default wiring)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullActivityListener;

impl IActivityListener for NullActivityListener {
    fn activity_started(&self) {}
    fn activity_stopped(&self) {}
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counting {
        in_flight: AtomicI64,
        total: AtomicI64,
    }

    impl IActivityListener for Counting {
        fn activity_started(&self) {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            self.total.fetch_add(1, Ordering::SeqCst);
        }

        fn activity_stopped(&self) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_scope_pairs_start_and_stop() {
        let listener = Arc::new(Counting::default());
        {
            let _scope = ActivityScope::enter(listener.clone());
            assert_eq!(listener.in_flight.load(Ordering::SeqCst), 1);
        }
        assert_eq!(listener.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(listener.total.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scope_pairs_on_early_exit() {
        let listener = Arc::new(Counting::default());

        fn work(listener: Arc<Counting>) -> Result<(), &'static str> {
            let _scope = ActivityScope::enter(listener);
            Err("boom")
        }

        assert!(work(listener.clone()).is_err());
        assert_eq!(listener.in_flight.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_nested_scopes() {
        let listener = Arc::new(Counting::default());
        let _outer = ActivityScope::enter(listener.clone());
        {
            let _inner = ActivityScope::enter(listener.clone());
            assert_eq!(listener.in_flight.load(Ordering::SeqCst), 2);
        }
        assert_eq!(listener.in_flight.load(Ordering::SeqCst), 1);
    }
}
