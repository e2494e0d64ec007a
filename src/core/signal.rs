//! Wake-up signal for the background workers

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// A "work ready" flag paired with a condition variable.
///
/// The mutex guards only the flag, so a `notify` that lands between a
/// worker's last check and its wait is never lost.
#[derive(Debug, Default)]
pub(crate) struct Signal {
    ready: Mutex<bool>,
    condvar: Condvar,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn notify(&self) {
        let mut ready = self.ready.lock();
        *ready = true;
        self.condvar.notify_one();
    }

    /// Block until notified or until `timeout` elapses, then clear the flag
    pub(crate) fn wait(&self, timeout: Duration) {
        let mut ready = self.ready.lock();
        if !*ready {
            self.condvar.wait_for(&mut ready, timeout);
        }
        *ready = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_notify_before_wait_is_not_lost() {
        let signal = Signal::new();
        signal.notify();
        let start = Instant::now();
        signal.wait(Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_times_out() {
        let signal = Signal::new();
        let start = Instant::now();
        signal.wait(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_cross_thread_wakeup() {
        let signal = Arc::new(Signal::new());
        let waiter = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            let start = Instant::now();
            waiter.wait(Duration::from_secs(10));
            start.elapsed()
        });
        thread::sleep(Duration::from_millis(20));
        signal.notify();
        let elapsed = handle.join().unwrap();
        assert!(elapsed < Duration::from_secs(5));
    }
}
