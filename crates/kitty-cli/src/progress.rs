//! Progress bar for pipeline operations.
//!
//! The operation runs on a scoped worker thread while this thread drains its
//! progress channel into an `indicatif` bar. The bar message is the guard's
//! label ("Compressing: 42%"), read each time an event arrives.

use anyhow::Result;
use anyhow::anyhow;
use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use kitty_core::OperationGuard;
use kitty_core::OperationKind;
use kitty_core::ProgressEvent;
use kitty_core::progress::ProgressSender;
use kitty_core::progress::progress_channel;
use std::thread;

/// Percentage bar labelled from the operation guard.
pub struct CliProgress {
    bar: ProgressBar,
    guard: OperationGuard,
}

impl CliProgress {
    /// Creates a bar; a hidden bar swallows updates.
    #[must_use]
    pub fn new(guard: OperationGuard, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(100)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:>18} [{bar:40.cyan/blue}]")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Self { bar, guard }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }

    /// Applies one event.
    pub fn update(&self, event: ProgressEvent) {
        self.bar.set_position(u64::from(event.percent));
        self.bar.set_message(self.guard.label(event.percent));
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Runs `work` on a worker thread and renders its progress until it ends.
pub fn run_with_progress<T, F>(
    guard: &OperationGuard,
    kind: OperationKind,
    visible: bool,
    work: F,
) -> Result<T>
where
    T: Send,
    F: FnOnce(&ProgressSender) -> T + Send,
{
    let progress = CliProgress::new(guard.clone(), visible);
    let (tx, rx) = progress_channel(kind);

    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name(format!("kitty-{kind}"))
            .spawn_scoped(scope, move || work(&tx))?;
        for event in rx.iter() {
            progress.update(event);
        }
        worker
            .join()
            .map_err(|_| anyhow!("{kind} worker panicked"))
    })
}
