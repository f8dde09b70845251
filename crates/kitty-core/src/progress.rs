//! Per-operation progress channel.
//!
//! Every operation gets its own channel at invocation time. The write end
//! ([`ProgressSender`]) is handed to the archive engine; the read end
//! ([`ProgressReceiver`]) stays with the caller, which drains it on the
//! interactive thread. Percentages are clamped to `0..=100` on entry.
//!
//! Progress is advisory: sends after the receiver is gone are dropped, and
//! receivers must tolerate events that arrive after the operation finished.

use std::io::Read;
use std::sync::mpsc;

use crate::guard::OperationKind;

/// Clamps a raw engine percentage into `0..=100`.
///
/// # Examples
///
/// ```
/// use kitty_core::progress::clamp_percent;
///
/// assert_eq!(clamp_percent(-5), 0);
/// assert_eq!(clamp_percent(150), 100);
/// assert_eq!(clamp_percent(42), 42);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_percent(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

/// One progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Operation that emitted the update.
    pub kind: OperationKind,
    /// Completion percentage, already clamped.
    pub percent: u8,
}

/// Creates a fresh channel for one operation.
///
/// # Examples
///
/// ```
/// use kitty_core::guard::OperationKind;
/// use kitty_core::progress::progress_channel;
///
/// let (tx, rx) = progress_channel(OperationKind::Compress);
/// tx.report(150);
/// drop(tx);
///
/// let seen: Vec<u8> = rx.iter().map(|e| e.percent).collect();
/// assert_eq!(seen, vec![100]);
/// ```
#[must_use]
pub fn progress_channel(kind: OperationKind) -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::channel();
    (
        ProgressSender { kind, tx: Some(tx) },
        ProgressReceiver { rx },
    )
}

/// Write end of a progress channel.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    kind: OperationKind,
    tx: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressSender {
    /// Sender that discards every update.
    #[must_use]
    pub const fn disabled(kind: OperationKind) -> Self {
        Self { kind, tx: None }
    }

    /// Operation kind this sender reports for.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Clamps and forwards a raw percentage.
    pub fn report(&self, raw: i64) {
        let Some(tx) = &self.tx else {
            return;
        };
        let event = ProgressEvent {
            kind: self.kind,
            percent: clamp_percent(raw),
        };
        if tx.send(event).is_err() {
            tracing::warn!(
                kind = %self.kind,
                percent = event.percent,
                "progress event after receiver closed"
            );
        }
    }
}

/// Read end of a progress channel.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::Receiver<ProgressEvent>,
}

impl ProgressReceiver {
    /// Blocks until the next event, or returns `None` once every sender is
    /// gone.
    pub fn recv(&self) -> Option<ProgressEvent> {
        self.rx.recv().ok()
    }

    /// Drains events that are already queued without blocking.
    pub fn try_iter(&self) -> impl Iterator<Item = ProgressEvent> + '_ {
        self.rx.try_iter()
    }

    /// Blocking iterator that ends when every sender is gone.
    pub fn iter(&self) -> impl Iterator<Item = ProgressEvent> + '_ {
        self.rx.iter()
    }
}

/// Byte-count progress accumulator.
///
/// Converts processed byte counts into percentages of a known total and only
/// forwards an update when the integer percentage changes.
#[derive(Debug)]
pub struct ByteProgress {
    sender: ProgressSender,
    total: u64,
    processed: u64,
    last_percent: Option<u8>,
}

impl ByteProgress {
    /// Starts tracking against `total` bytes and reports `0`.
    #[must_use]
    pub fn new(sender: ProgressSender, total: u64) -> Self {
        let mut progress = Self {
            sender,
            total,
            processed: 0,
            last_percent: None,
        };
        progress.emit(0);
        progress
    }

    /// Adds processed bytes.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add(&mut self, bytes: u64) {
        if bytes == 0 || self.total == 0 {
            return;
        }
        self.processed = self.processed.saturating_add(bytes);
        let percent = self.processed.saturating_mul(100) / self.total;
        self.emit(percent.min(100) as u8);
    }

    /// Reports completion regardless of the byte count seen.
    pub fn finish(&mut self) {
        self.emit(100);
    }

    fn emit(&mut self, percent: u8) {
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            self.sender.report(i64::from(percent));
        }
    }
}

/// Reader wrapper that feeds a [`ByteProgress`].
pub struct ProgressReader<'a, R> {
    inner: R,
    progress: &'a mut ByteProgress,
}

impl<'a, R> ProgressReader<'a, R> {
    /// Wraps `inner`, counting every byte read into `progress`.
    #[must_use]
    pub fn new(inner: R, progress: &'a mut ByteProgress) -> Self {
        Self { inner, progress }
    }
}

impl<R: Read> Read for ProgressReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let bytes_read = self.inner.read(buf)?;
        self.progress.add(bytes_read as u64);
        Ok(bytes_read)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn percents(rx: &ProgressReceiver) -> Vec<u8> {
        rx.try_iter().map(|e| e.percent).collect()
    }

    #[test]
    fn test_clamping_through_channel() {
        let (tx, rx) = progress_channel(OperationKind::Extract);
        tx.report(-5);
        tx.report(150);
        tx.report(42);
        assert_eq!(percents(&rx), vec![0, 100, 42]);
    }

    #[test]
    fn test_events_carry_kind() {
        let (tx, rx) = progress_channel(OperationKind::Extract);
        tx.report(1);
        assert_eq!(rx.recv().unwrap().kind, OperationKind::Extract);
    }

    #[test]
    fn test_late_event_after_receiver_dropped() {
        let (tx, rx) = progress_channel(OperationKind::Compress);
        drop(rx);
        tx.report(50);
    }

    #[test]
    fn test_disabled_sender() {
        let tx = ProgressSender::disabled(OperationKind::Compress);
        tx.report(10);
        assert_eq!(tx.kind(), OperationKind::Compress);
    }

    #[test]
    fn test_byte_progress_deduplicates() {
        let (tx, rx) = progress_channel(OperationKind::Compress);
        let mut progress = ByteProgress::new(tx, 200);
        progress.add(1);
        progress.add(1);
        progress.add(98);
        progress.add(100);
        progress.finish();
        assert_eq!(percents(&rx), vec![0, 1, 50, 100]);
    }

    #[test]
    fn test_byte_progress_zero_total() {
        let (tx, rx) = progress_channel(OperationKind::Compress);
        let mut progress = ByteProgress::new(tx, 0);
        progress.add(10);
        progress.finish();
        assert_eq!(percents(&rx), vec![0, 100]);
    }

    #[test]
    fn test_progress_reader_counts_bytes() {
        let (tx, rx) = progress_channel(OperationKind::Extract);
        let mut progress = ByteProgress::new(tx, 4);
        let mut out = Vec::new();
        {
            let mut reader = ProgressReader::new(Cursor::new(b"data"), &mut progress);
            std::io::copy(&mut reader, &mut out).unwrap();
        }
        assert_eq!(out, b"data");
        assert_eq!(percents(&rx).last(), Some(&100));
    }
}
