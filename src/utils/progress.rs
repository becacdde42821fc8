use std::io::{self, Read};

/// Wraps a reader and reports how many bytes have been consumed out of an
/// expected total.  Bytes pass through untouched.
pub struct ProgressReader<R, F> {
    inner: R,
    total: u64,
    read: u64,
    on_progress: F,
}

impl<R: Read, F: FnMut(u64, u64)> ProgressReader<R, F> {
    /// `on_progress(read, total)` is called after every non-empty read.
    pub fn new(inner: R, total: u64, on_progress: F) -> Self {
        Self {
            inner,
            total,
            read: 0,
            on_progress,
        }
    }
}

impl<R: Read, F: FnMut(u64, u64)> Read for ProgressReader<R, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.read += n as u64;
            (self.on_progress)(self.read, self.total);
        }
        Ok(n)
    }
}

/// Returns a callback that logs a line every time another `step_pct`
/// percent of `total` has been consumed.
pub fn log_every_pct(label: &'static str, step_pct: u64) -> impl FnMut(u64, u64) {
    let step = step_pct.clamp(1, 100);
    let mut next = step;
    move |read, total| {
        if total == 0 {
            return;
        }
        let pct = (read.min(total) * 100) / total;
        if pct >= next {
            log::info!("{} {}% ({} of {} bytes)", label, pct, read, total);
            next = (pct / step + 1) * step;
        }
    }
}
