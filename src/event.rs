//! Events raised by the trackers and the bus that hands them to listeners.

use serde_json::Value;

use crate::{
    player::PlayerState,
    playlist::PlaylistItem,
};

/// Outcome of a poll, as passed to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
}
impl Status {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Player actions triggered locally, announced before the next poll confirms them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Play,
    Pause,
    Stop,
    Previous,
    Next,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ActivePlayersUpdated {
        status: Status,
        data: Value,
    },
    PlayerStatusUpdated {
        status: Status,
        data: Value,
        player: Option<PlayerState>,
    },
    /// Controls were recomputed for the given active player
    Update {
        player: Option<PlayerState>,
    },
    Action(PlayerAction),
    PlaylistContentUpdated {
        status: Status,
        data: Value,
    },
    PlaylistUpdated {
        len: usize,
    },
    PlaylistItemAdded {
        item: PlaylistItem,
        gui_only: bool,
    },
    PlaylistItemUpdated {
        position: usize,
        item: PlaylistItem,
    },
    PlaylistCleared {
        gui_only: bool,
    },
    ApplicationUpdated {
        status: Status,
        data: Value,
    },
    VolumeChanged {
        volume: i64,
    },
    Muted,
    Unmuted,
    CommunicationLost {
        message: String,
    },
    CommunicationRestored,
}

type Listener = Box<dyn FnMut(&Event)>;

/// Synchronous fan-out to listeners, in registration order
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn subscribe(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn publish(&mut self, event: &Event) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}
