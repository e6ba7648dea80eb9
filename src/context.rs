//! Effects shared by every tracker of a session: timers, outgoing calls,
//! pending events and the communication error notice.

use std::collections::VecDeque;

use crate::{
    config::Timings,
    event::Event,
    player::PlayerId,
    playlist::PlaylistId,
    rpc::{RpcCall, RpcError},
    scheduler::{Scheduler, TimerKind},
};

const COMMUNICATION_LOST: &str = "Connection to server lost";

/// Where the answer to a call has to be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    ActivePlayers,
    PlayerStatus(PlayerId),
    PlaylistItems(PlaylistId),
    Playlists,
    Application,
    /// Fire-and-forget, only failures are looked at
    Ignore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingCall {
    pub call: RpcCall,
    pub reply: Reply,
}

pub struct Context {
    pub scheduler: Scheduler,
    timings: Timings,
    calls: Vec<PendingCall>,
    events: VecDeque<Event>,
}

impl Context {
    #[must_use]
    pub fn new(scheduler: Scheduler, timings: Timings) -> Self {
        Self {
            scheduler,
            timings,
            calls: Vec::new(),
            events: VecDeque::new(),
        }
    }

    #[must_use]
    pub const fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Queue a call. Calls without their own timeout get the default one.
    pub fn request(&mut self, mut call: RpcCall, reply: Reply) {
        tracing::trace!(method = %call.method, ?reply, "Queueing request");
        if call.timeout.is_none() {
            call.timeout = Some(self.timings.request_timeout());
        }
        self.calls.push(PendingCall { call, reply });
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn take_calls(&mut self) -> Vec<PendingCall> {
        std::mem::take(&mut self.calls)
    }

    pub(crate) fn next_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Surface a failed request. Only the first failure within the display
    /// window is announced; later ones just extend the window.
    pub fn communication_error(&mut self, error: &RpcError) {
        tracing::warn!(%error, "Request failed");
        if !self.scheduler.is_pending(TimerKind::CommunicationError) {
            self.emit(Event::CommunicationLost {
                message: COMMUNICATION_LOST.to_owned(),
            });
        }
        self.scheduler
            .schedule(TimerKind::CommunicationError, self.timings.error_display());
    }

    #[must_use]
    pub fn communication_lost(&self) -> Option<&'static str> {
        self.scheduler
            .is_pending(TimerKind::CommunicationError)
            .then_some(COMMUNICATION_LOST)
    }
}
