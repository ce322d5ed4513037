//! Debounced autosave scheduling.
//!
//! Two halves, so the policy is testable without a runtime:
//!
//! - [`Debounce`] — the state machine: enabled flag, one pending deadline, a
//!   generation counter. Every edit re-arms the deadline; a timer that fires
//!   for a stale generation is ignored. Disabling cancels the pending timer
//!   and never triggers an immediate save.
//! - [`spawn_timer`] — the tokio driver: waits on the most recent deadline it
//!   was told about and reports the generation that expired. The session
//!   validates the generation against the debounce before running a silent
//!   save, so re-arms and cancels need no timer-side bookkeeping.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

/// Inactivity window before an autosave fires.
pub const DEFAULT_AUTOSAVE_WINDOW: Duration = Duration::from_secs(3);

/// Instruction to the timer driver.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TimerCmd {
    /// Wait until `deadline`, then report `generation`.
    Arm { generation: u64, deadline: Instant },
}

/// The debounce policy state. Owned by the session behind its state lock.
#[derive(Debug)]
pub struct Debounce {
    enabled: bool,
    window: Duration,
    generation: u64,
    /// Generation of the armed timer, if any.
    armed: Option<u64>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self {
            enabled: true,
            window,
            generation: 0,
            armed: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Toggle autosave. Disabling cancels any pending timer; enabling does not
    /// arm one — only the next edit does.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.armed = None;
        }
    }

    /// Record an edit. Returns the arm instruction for the timer driver when
    /// autosave is enabled; any previously armed deadline is superseded.
    pub(crate) fn note_edit(&mut self, now: Instant) -> Option<TimerCmd> {
        if !self.enabled {
            return None;
        }
        self.generation += 1;
        self.armed = Some(self.generation);
        trace!(generation = self.generation, "autosave timer re-armed");
        Some(TimerCmd::Arm {
            generation: self.generation,
            deadline: now + self.window,
        })
    }

    /// A timer expired for `generation`. True when it is still the armed one
    /// (no later edit superseded it, no disable cancelled it), in which case
    /// the caller runs a silent save and the armed state is consumed.
    pub fn should_fire(&mut self, generation: u64) -> bool {
        if self.armed == Some(generation) {
            self.armed = None;
            true
        } else {
            trace!(generation, armed = ?self.armed, "stale autosave timer ignored");
            false
        }
    }
}

impl Default for Debounce {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_WINDOW)
    }
}

/// Drive the armed deadline and invoke `fire(generation)` on expiry.
///
/// A new `Arm` received while waiting supersedes the current deadline. The
/// task exits when the command channel closes.
pub(crate) fn spawn_timer<F>(mut rx: UnboundedReceiver<TimerCmd>, mut fire: F) -> JoinHandle<()>
where
    F: FnMut(u64) + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(TimerCmd::Arm {
            mut generation,
            mut deadline,
        }) = rx.recv().await
        {
            loop {
                tokio::select! {
                    _ = sleep_until(deadline) => {
                        fire(generation);
                        break;
                    }
                    next = rx.recv() => match next {
                        Some(TimerCmd::Arm { generation: g, deadline: d }) => {
                            generation = g;
                            deadline = d;
                        }
                        None => return,
                    },
                }
            }
        }
    })
}
