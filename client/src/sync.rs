//! Debounced autosave state machine.
//!
//! DESIGN
//! ======
//! Pure and clock-injected: callers pass `Instant`s in, so the debounce
//! window is testable without sleeping. The machine owns no data; the
//! pending change-set stays in the store and is only snapshotted at
//! submission time. One save is in flight at most — a new debounce cycle
//! cannot start until the outstanding one resolves, and a failure keeps
//! the pending set intact and re-arms the window for retry.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use std::time::{Duration, Instant};

use canvas::consts::DEBOUNCE_MS;
use wire::ChangeSet;

/// Debounce and in-flight bookkeeping for the autosave loop.
#[derive(Debug)]
pub struct Autosave {
    debounce: Duration,
    deadline: Option<Instant>,
    in_flight: bool,
    saved: bool,
}

impl Default for Autosave {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEBOUNCE_MS))
    }
}

impl Autosave {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self { debounce, deadline: None, in_flight: false, saved: true }
    }

    /// A local edit happened: mark unsaved and (re)start the debounce
    /// window. While a save is in flight the window is not re-armed; the
    /// resolution handler starts the next cycle if anything remains.
    pub fn note_local_change(&mut self, now: Instant) {
        self.saved = false;
        if !self.in_flight {
            self.deadline = Some(now + self.debounce);
        }
    }

    /// When the window has elapsed and `pending` is non-empty, take a
    /// submission snapshot and mark the save in flight.
    pub fn poll(&mut self, now: Instant, pending: &ChangeSet) -> Option<ChangeSet> {
        if self.in_flight || self.deadline.is_none_or(|deadline| now < deadline) {
            return None;
        }
        self.deadline = None;
        if pending.is_empty() {
            self.saved = true;
            return None;
        }
        self.in_flight = true;
        Some(pending.clone())
    }

    /// The server persisted `submitted`: clear exactly those entries from
    /// `pending`. Edits staged during the round trip survive and re-arm
    /// the window.
    pub fn on_applied(&mut self, now: Instant, submitted: &ChangeSet, pending: &mut ChangeSet) {
        self.in_flight = false;
        pending.clear_acked(submitted);
        if pending.is_empty() {
            self.saved = true;
        } else {
            self.deadline = Some(now + self.debounce);
        }
    }

    /// The save failed transiently: keep the pending set and retry after
    /// a fresh debounce window.
    pub fn on_failure(&mut self, now: Instant) {
        self.in_flight = false;
        self.deadline = Some(now + self.debounce);
    }

    /// Drives the "unsaved changes" indicator.
    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}
