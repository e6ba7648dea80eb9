//! Single-shot timers with cancel-and-replace semantics.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

/// The kinds of timer a session may have outstanding. At most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    ActivePlayers,
    PlayerStatus,
    PlaylistContent,
    ApplicationData,
    CommunicationError,
}

pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ManualClock(std::sync::Arc<std::sync::Mutex<Instant>>);
#[cfg(test)]
impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self(std::sync::Arc::new(std::sync::Mutex::new(Instant::now())))
    }
    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}
#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.0.lock().unwrap()
    }
}

pub struct Scheduler {
    clock: Box<dyn Clock>,
    deadlines: HashMap<TimerKind, Instant>,
}

impl Scheduler {
    #[must_use]
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            deadlines: HashMap::new(),
        }
    }

    #[must_use]
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Arm `kind` to fire after `delay`, replacing any pending timer of that kind.
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration) {
        let deadline = self.now() + delay;
        if self.deadlines.insert(kind, deadline).is_some() {
            tracing::trace!(?kind, ?delay, "Replaced pending timer");
        }
    }

    /// Returns whether a timer was actually pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.deadlines.remove(&kind).is_some()
    }

    #[must_use]
    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.deadlines.contains_key(&kind)
    }

    #[cfg(test)]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.deadlines.len()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every timer whose deadline has passed, earliest first.
    pub fn take_due(&mut self) -> Vec<TimerKind> {
        let now = self.now();
        let mut due: Vec<_> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(kind, deadline)| (*deadline, *kind))
            .collect();
        due.sort_unstable();
        for (_, kind) in &due {
            self.deadlines.remove(kind);
        }
        due.into_iter().map(|(_, kind)| kind).collect()
    }
}
