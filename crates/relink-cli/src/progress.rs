use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use relink_export::ExportProgress;
use relink_repair::ProgressUpdater;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const PRINT_INTERVAL: Duration = Duration::from_secs(3);

/// Prints repair progress messages to stdout.
pub struct StdoutUpdater;

impl ProgressUpdater for StdoutUpdater {
    fn update(&self, message: &str) {
        println!("{}", message.dimmed());
    }
}

/// Latest export counts, shared with the printer task.
#[derive(Debug, Default)]
pub struct PercentTracker {
    done: AtomicUsize,
    total: AtomicUsize,
}

impl PercentTracker {
    pub fn percent(&self) -> usize {
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return 0;
        }
        self.done.load(Ordering::Relaxed).min(total) * 100 / total
    }
}

impl ExportProgress for PercentTracker {
    fn update(&self, done: usize, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(done, Ordering::Relaxed);
    }
}

/// Print `Progress N %` every few seconds until `stop` fires.
pub fn spawn_percent_printer(tracker: Arc<PercentTracker>, stop: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PRINT_INTERVAL);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => println!("Progress {} %", tracker.percent()),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_tracks_latest_update() {
        let t = PercentTracker::default();
        assert_eq!(t.percent(), 0);
        t.update(0, 8);
        assert_eq!(t.percent(), 0);
        t.update(2, 8);
        assert_eq!(t.percent(), 25);
        t.update(8, 8);
        assert_eq!(t.percent(), 100);
    }

    #[tokio::test]
    async fn printer_stops_on_cancel() {
        let stop = CancellationToken::new();
        let handle = spawn_percent_printer(Arc::new(PercentTracker::default()), stop.clone());
        stop.cancel();
        handle.await.unwrap();
    }
}
