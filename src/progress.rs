// src/progress.rs
/// Progress reporting for a crawl session. Frontends implement this to surface
/// status; the crawler calls it from the aggregating thread only.
pub trait Progress {
    /// Called at the start with the number of query lines.
    fn begin(&mut self, _lines: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// A line ran to its end (sentinel, page cap or cancel) with `records` collected.
    fn line_done(&mut self, _index: usize, _records: usize) {}

    /// A line gave up after exhausting retries on `page`.
    fn line_failed(&mut self, _index: usize, _page: u32, _error: &str) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}
