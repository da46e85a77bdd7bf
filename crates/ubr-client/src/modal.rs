//! Open/close state shared by the sidebar's dialogs.
//!
//! Every open bumps an epoch. Async work started inside a dialog captures the
//! epoch and checks [`ModalLifecycle::is_current`] before touching dialog
//! state, so a response that lands after the dialog was dismissed (or
//! dismissed and reopened) is dropped.

use std::time::Instant;

use crate::constants::MODAL_CLOSE_DELAY;

#[derive(Clone, Debug, Default)]
pub struct ModalLifecycle {
    open: bool,
    epoch: u64,
    closed_at: Option<Instant>,
}

impl ModalLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reopen) the dialog and return the new epoch.
    pub fn open(&mut self) -> u64 {
        self.open = true;
        self.epoch += 1;
        self.closed_at = None;
        self.epoch
    }

    pub fn close(&mut self) {
        self.close_at(Instant::now());
    }

    pub fn close_at(&mut self, now: Instant) {
        if self.open {
            self.open = false;
            self.closed_at = Some(now);
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True when `epoch` belongs to the opening that is still showing.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.open && self.epoch == epoch
    }

    /// A closed dialog keeps rendering while its exit animation runs.
    pub fn should_render(&self, now: Instant) -> bool {
        self.open
            || self
                .closed_at
                .is_some_and(|at| now.saturating_duration_since(at) < MODAL_CLOSE_DELAY)
    }

    /// Escape closes an open dialog. Returns whether it did.
    pub fn escape(&mut self, now: Instant) -> bool {
        let was_open = self.open;
        self.close_at(now);
        was_open
    }
}

/// Focus trap: Tab walks forward, Shift+Tab backward, both wrap.
///
/// With nothing focused yet, Tab lands on the first element and Shift+Tab on
/// the last. `None` when there is nothing focusable.
pub fn next_focus(current: Option<usize>, count: usize, shift: bool) -> Option<usize> {
    if count == 0 {
        return None;
    }
    Some(match (current, shift) {
        (None, false) => 0,
        (None, true) => count - 1,
        (Some(i), false) => (i + 1) % count,
        (Some(i), true) => (i % count + count - 1) % count,
    })
}
