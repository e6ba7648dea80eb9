//! One connection's worth of trackers, and the wiring between them.
//!
//! The session never touches the network. Callers drain the queued calls
//! with [`Session::take_calls`], send them, and feed each answer back through
//! [`Session::handle_reply`]. Timer expiry is driven the same way through
//! [`Session::next_deadline`] and [`Session::fire_due_timers`].


use std::time::Instant;

use crate::{
    application::ApplicationTracker,
    command::Command,
    config::{Config, PlaylistConfig},
    context::{Context, PendingCall, Reply},
    controls::{ControlKind, Controls},
    event::{Event, EventBus},
    player::PlayerTracker,
    playlist::{PlaylistItem, PlaylistSync},
    rpc::RpcResult,
    scheduler::{Clock, Scheduler, TimerKind},
};

pub struct Session {
    cx: Context,
    bus: EventBus,
    player: PlayerTracker,
    playlist: Option<PlaylistSync>,
    application: ApplicationTracker,
}

impl Session {
    #[must_use]
    pub fn new(config: &Config, clock: impl Clock + 'static) -> Self {
        Self {
            cx: Context::new(Scheduler::new(clock), config.timings.clone()),
            bus: EventBus::default(),
            player: PlayerTracker::new(&config.player),
            playlist: None,
            application: ApplicationTracker::default(),
        }
    }

    /// Register a listener. Listeners see every event, in emission order,
    /// before the trackers react to it.
    pub fn subscribe(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.bus.subscribe(listener);
    }

    /// Kick off the first polls
    pub fn start(&mut self) {
        self.player.start(&mut self.cx);
        self.application.refresh_data(&mut self.cx);
        self.dispatch();
    }

    /// Mirror a playlist that follows the active player
    pub fn attach_playlist(&mut self, config: PlaylistConfig) {
        let mut playlist = PlaylistSync::new(config);
        playlist.attach(&self.player, &mut self.cx);
        self.playlist = Some(playlist);
        self.dispatch();
    }

    pub fn take_calls(&mut self) -> Vec<PendingCall> {
        self.cx.take_calls()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.cx.scheduler.next_deadline()
    }

    pub fn handle_reply(&mut self, reply: Reply, result: RpcResult) {
        if let Err(e) = &result {
            self.cx.communication_error(e);
        }
        let cx = &mut self.cx;
        match reply {
            Reply::ActivePlayers => self.player.handle_active_players(result, cx),
            Reply::PlayerStatus(id) => self.player.handle_player_status(id, result, cx),
            Reply::PlaylistItems(id) => {
                if let Some(playlist) = &mut self.playlist {
                    playlist.handle_items(id, result, &self.player, cx);
                }
            }
            Reply::Playlists => {
                if let Some(playlist) = &mut self.playlist {
                    playlist.handle_playlists(result, cx);
                }
            }
            Reply::Application => self.application.handle_properties(result, cx),
            Reply::Ignore => {}
        }
        self.dispatch();
    }

    pub fn fire_due_timers(&mut self) {
        for kind in self.cx.scheduler.take_due() {
            tracing::trace!(?kind, "Timer fired");
            let cx = &mut self.cx;
            match kind {
                TimerKind::ActivePlayers => self.player.refresh_active_players(cx),
                TimerKind::PlayerStatus => self.player.refresh_player_status(None, cx),
                TimerKind::PlaylistContent => {
                    if let Some(playlist) = &self.playlist {
                        playlist.refresh_contents(None, cx);
                    }
                }
                TimerKind::ApplicationData => self.application.refresh_data(cx),
                TimerKind::CommunicationError => {
                    tracing::info!("Communication error notice expired");
                    cx.emit(Event::CommunicationRestored);
                }
            }
        }
        self.dispatch();
    }

    fn dispatch(&mut self) {
        while let Some(event) = self.cx.next_event() {
            self.bus.publish(&event);
            self.react(&event);
        }
    }

    fn react(&mut self, event: &Event) {
        let cx = &mut self.cx;
        match event {
            Event::ActivePlayersUpdated { status, .. } => {
                self.player.on_active_players_updated(*status, cx);
            }
            Event::PlayerStatusUpdated { status, player, .. } => {
                self.player.on_player_status_updated(*status, cx);
                if let Some(playlist) = &mut self.playlist {
                    playlist.on_player_status(*status, player.as_ref(), cx);
                }
            }
            Event::Update { .. } => {
                if let Some(playlist) = &mut self.playlist {
                    playlist.adjust_controls(&mut self.player);
                }
            }
            Event::ApplicationUpdated { status, .. } => self.application.on_updated(*status, cx),
            _ => {}
        }
    }

    pub fn press(&mut self, control: ControlKind) {
        self.player.press(control, &mut self.cx);
        self.dispatch();
    }

    /// Play the playlist entry at `position`
    pub fn activate(&mut self, position: usize) {
        match &self.playlist {
            Some(playlist) => playlist.activate(position, &self.player, &mut self.cx),
            None => {
                tracing::debug!(position, "No playlist attached");
            }
        }
        self.dispatch();
    }

    pub fn add_item(&mut self, item: PlaylistItem, gui_only: bool) {
        if let Some(playlist) = &mut self.playlist {
            playlist.add_item(item, gui_only, &mut self.cx);
        }
        self.dispatch();
    }

    pub fn clear_playlist(&mut self, gui_only: bool) {
        if let Some(playlist) = &mut self.playlist {
            playlist.clear(gui_only, &mut self.cx);
        }
        self.dispatch();
    }

    pub fn set_volume(&mut self, volume: i64) {
        self.application.set_volume(volume, &mut self.cx);
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.application.set_mute(mute, &mut self.cx);
    }

    pub fn toggle_mute(&mut self) {
        self.application.toggle_mute(&mut self.cx);
    }

    pub fn run(&mut self, command: Command) {
        match command {
            Command::Press(control) => self.press(control),
            Command::Volume(volume) => self.set_volume(volume),
            Command::Mute => self.set_mute(true),
            Command::Unmute => self.set_mute(false),
            Command::ToggleMute => self.toggle_mute(),
            Command::GoTo(position) => self.activate(position),
            Command::Clear => self.clear_playlist(false),
            Command::Add(item) => self.add_item(item, false),
        }
    }

    #[must_use]
    pub const fn player(&self) -> &PlayerTracker {
        &self.player
    }

    #[must_use]
    pub const fn playlist(&self) -> Option<&PlaylistSync> {
        self.playlist.as_ref()
    }

    #[must_use]
    pub const fn application(&self) -> &ApplicationTracker {
        &self.application
    }

    #[must_use]
    pub const fn controls(&self) -> &Controls {
        self.player.controls()
    }

    /// Message to show while the communication error notice is up
    #[must_use]
    pub fn communication_lost(&self) -> Option<&'static str> {
        self.cx.communication_lost()
    }
}
