/// Receives one message per migrated file.
pub trait ProgressUpdater: Send + Sync {
    fn update(&self, message: &str);
}

/// Discards all progress messages.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopUpdater;

impl ProgressUpdater for NoopUpdater {
    fn update(&self, _message: &str) {}
}

impl<F> ProgressUpdater for F
where
    F: Fn(&str) + Send + Sync,
{
    fn update(&self, message: &str) {
        self(message)
    }
}
