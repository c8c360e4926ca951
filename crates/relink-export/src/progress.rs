/// Receives `(done, total)` record counts during an export.
pub trait ExportProgress {
    fn update(&self, done: usize, total: usize);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopProgress;

impl ExportProgress for NoopProgress {
    fn update(&self, _done: usize, _total: usize) {}
}

impl<F> ExportProgress for F
where
    F: Fn(usize, usize),
{
    fn update(&self, done: usize, total: usize) {
        self(done, total)
    }
}
