//! Advisory progress events.
//!
//! The engine reports progress through an optional callback. Callbacks only
//! observe; they cannot influence evaluation order or state.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;

/// Emit a progress event every this many bars.
pub const PROGRESS_EVERY: usize = 100;

/// Bars processed so far out of the series total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub processed: usize,
    pub total: usize,
}

impl ProgressEvent {
    /// Completion as a whole percentage (0-100).
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        self.processed * 100 / self.total
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Adapt an mpsc sender into a progress callback. Send failures (receiver
/// dropped) are ignored.
pub fn channel_progress(tx: Sender<ProgressEvent>) -> impl Fn(&ProgressEvent) {
    move |event| {
        let _ = tx.send(*event);
    }
}
