//! Interrupt handling.
//!
//! Ctrl-C is awaited on a helper thread with its own small tokio runtime;
//! the poll loop sees it through a [`StopSignal`], whose [`wait`] doubles
//! as the loop's interruptible sleep.
//!
//! [`wait`]: StopSignal::wait

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::{info, warn};

/// Receiving end of the stop request.
pub struct StopSignal {
    rx: mpsc::Receiver<()>,
}

impl StopSignal {
    /// Create a signal and the sender that triggers it.
    pub fn channel() -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }

    /// Sleep for up to `timeout`. Returns `true` as soon as a stop is
    /// requested, `false` if the full duration passed.
    pub fn wait(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            // Nobody can ask us to stop any more; plain sleep.
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(timeout);
                false
            }
        }
    }

    /// Non-blocking check.
    pub fn requested(&self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

/// Spawn the Ctrl-C listener.
pub fn install() -> StopSignal {
    let (tx, signal) = StopSignal::channel();

    let spawned = thread::Builder::new()
        .name("signal".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    warn!("interrupt handling unavailable: {e}");
                    return;
                }
            };
            match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => {
                    info!("interrupt received, stopping");
                    let _ = tx.send(());
                }
                Err(e) => warn!("failed to listen for interrupt: {e}"),
            }
        });

    if let Err(e) = spawned {
        warn!("failed to spawn signal thread: {e}");
    }
    signal
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn wait_returns_true_when_stopped() {
        let (tx, signal) = StopSignal::channel();
        tx.send(()).unwrap();
        assert!(signal.wait(Duration::from_secs(5)));
    }

    #[test]
    fn wait_times_out_without_stop() {
        let (_tx, signal) = StopSignal::channel();
        assert!(!signal.wait(Duration::from_millis(10)));
        assert!(!signal.requested());
    }

    #[test]
    fn disconnected_sender_still_sleeps() {
        let (tx, signal) = StopSignal::channel();
        drop(tx);
        let start = Instant::now();
        assert!(!signal.wait(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
