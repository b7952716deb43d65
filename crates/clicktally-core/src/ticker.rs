//! Periodic tick source for the elapsed-time counter.

use crossbeam_channel::{bounded, never, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A background thread emitting one `Instant` per interval.
///
/// Ticks follow a fixed deadline schedule (start + n * interval) so they do
/// not accumulate drift. Dropping the ticker stops and joins the thread; any
/// tick still sitting in the channel goes away with it.
pub struct Ticker {
    tick_rx: Receiver<Instant>,
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Start ticking every `interval`. The first tick fires one interval from now.
    pub fn start(interval: Duration) -> Self {
        let (tick_tx, tick_rx) = bounded(4);
        let (stop_tx, stop_rx) = bounded(1);

        let thread = thread::Builder::new()
            .name("clicktally-ticker".into())
            .spawn(move || run_ticker(interval, tick_tx, stop_rx));

        let (thread, tick_rx) = match thread {
            Ok(handle) => (Some(handle), tick_rx),
            Err(e) => {
                // The sender died with the closure; a disconnected receiver
                // would spin the consumer's select loop.
                warn!("Failed to spawn ticker thread: {}", e);
                (None, never())
            }
        };

        Self {
            tick_rx,
            stop_tx,
            thread,
        }
    }

    /// Receiver side of the tick channel.
    pub fn receiver(&self) -> &Receiver<Instant> {
        &self.tick_rx
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run_ticker(interval: Duration, tick_tx: Sender<Instant>, stop_rx: Receiver<()>) {
    debug!(?interval, "Ticker started");
    let mut deadline = Instant::now() + interval;

    loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {
                // Never block: a consumer that is behind just sees fewer ticks.
                match tick_tx.try_send(Instant::now()) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => break,
                }
                deadline += interval;
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_emits_ticks() {
        let ticker = Ticker::start(Duration::from_millis(10));
        let rx = ticker.receiver();

        for _ in 0..3 {
            assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
        }
        assert!(ticker.is_running());
    }

    #[test]
    fn test_drop_stops_thread() {
        let ticker = Ticker::start(Duration::from_secs(3600));
        let rx = ticker.receiver().clone();

        drop(ticker);

        // Thread joined, sender gone: the receiver reports disconnection.
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(100)),
            Err(RecvTimeoutError::Disconnected)
        );
    }
}
