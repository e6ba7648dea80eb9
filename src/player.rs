//! Mirror of the backend's active players.

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    config::PlayerConfig,
    context::{Context, Reply},
    controls::{ControlKind, Controls},
    event::{Event, PlayerAction, Status},
    format::GlobalTime,
    playlist::PlaylistId,
    rpc::{Method, RpcCall, RpcResult},
    scheduler::TimerKind,
};

pub type PlayerId = u32;

const PLAYER_PROPERTIES: [&str; 11] = [
    "playlistid",
    "speed",
    "position",
    "totaltime",
    "time",
    "percentage",
    "canseek",
    "canrepeat",
    "canshuffle",
    "repeat",
    "shuffled",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum PlayerKind {
    Audio,
    Video,
    Picture,
    Other(String),
}
impl From<String> for PlayerKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "audio" => Self::Audio,
            "video" => Self::Video,
            "picture" => Self::Picture,
            _ => Self::Other(s),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

/// Answer to `Player.GetProperties`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerProperties {
    #[serde(rename = "playlistid")]
    pub playlist_id: i64,
    pub speed: i64,
    pub position: i64,
    #[serde(rename = "totaltime")]
    pub total_time: GlobalTime,
    pub time: GlobalTime,
    pub percentage: f64,
    #[serde(rename = "canseek")]
    pub can_seek: bool,
    #[serde(rename = "canrepeat")]
    pub can_repeat: bool,
    #[serde(rename = "canshuffle")]
    pub can_shuffle: bool,
    pub repeat: RepeatMode,
    pub shuffled: bool,
}
impl Default for PlayerProperties {
    fn default() -> Self {
        Self {
            playlist_id: -1,
            speed: 0,
            position: -1,
            total_time: GlobalTime::default(),
            time: GlobalTime::default(),
            percentage: 0.0,
            can_seek: false,
            can_repeat: false,
            can_shuffle: false,
            repeat: RepeatMode::Off,
            shuffled: false,
        }
    }
}

/// Entry of `Player.GetActivePlayers`
#[derive(Debug, Deserialize)]
struct ReportedPlayer {
    #[serde(rename = "playerid")]
    id: PlayerId,
    #[serde(rename = "type")]
    kind: PlayerKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub id: PlayerId,
    pub kind: PlayerKind,
    pub is_playing: bool,
    pub is_paused: bool,
    /// Unknown until the first status poll answers
    pub properties: Option<PlayerProperties>,
    /// Snapshot taken at the previous active players poll. Never nested.
    pub last_state: Option<Box<PlayerState>>,
}

impl PlayerState {
    #[must_use]
    pub const fn new(id: PlayerId, kind: PlayerKind) -> Self {
        Self {
            id,
            kind,
            is_playing: false,
            is_paused: false,
            properties: None,
            last_state: None,
        }
    }

    /// Playlist the player is working on, if it reports a valid one
    #[must_use]
    pub fn playlist_id(&self) -> Option<PlaylistId> {
        self.properties
            .as_ref()
            .and_then(|p| PlaylistId::try_from(p.playlist_id).ok())
    }

    /// Index of the playing item within its playlist
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        self.properties
            .as_ref()
            .and_then(|p| usize::try_from(p.position).ok())
    }

    fn apply_properties(&mut self, properties: PlayerProperties) {
        self.is_paused = properties.speed == 0;
        self.is_playing = !self.is_paused;
        self.properties = Some(properties);
    }

    /// Carry known fields over into a freshly reported player
    fn succeed(mut previous: Self, kind: PlayerKind) -> Self {
        previous.last_state = None;
        let mut next = previous.clone();
        next.kind = kind;
        next.last_state = Some(Box::new(previous));
        next
    }
}

/// Where to jump within the playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoTo {
    Previous,
    Next,
    Position(usize),
}
impl GoTo {
    fn to_value(self) -> Value {
        match self {
            Self::Previous => json!("previous"),
            Self::Next => json!("next"),
            Self::Position(p) => json!(p),
        }
    }
}

pub struct PlayerTracker {
    active_players: BTreeMap<PlayerId, PlayerState>,
    controls: Controls,
}

impl PlayerTracker {
    #[must_use]
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            active_players: BTreeMap::new(),
            controls: Controls::new(config),
        }
    }

    /// The player with the given id, or the first active one if `id` is `None`
    #[must_use]
    pub fn active_player(&self, id: Option<PlayerId>) -> Option<&PlayerState> {
        match id {
            Some(id) => self.active_players.get(&id),
            None => self.active_players.values().next(),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn active_player_by_kind(&self, kind: &PlayerKind) -> Option<&PlayerState> {
        self.active_players.values().find(|p| &p.kind == kind)
    }

    #[cfg(test)]
    pub fn active_players(&self) -> impl Iterator<Item = &PlayerState> {
        self.active_players.values()
    }

    #[must_use]
    pub const fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut Controls {
        &mut self.controls
    }

    pub fn start(&mut self, cx: &mut Context) {
        self.refresh_controls(cx);
        self.refresh_active_players(cx);
    }

    pub fn refresh_active_players(&self, cx: &mut Context) {
        let timeout = cx.timings().request_timeout();
        cx.request(
            RpcCall::new(Method::PlayerGetActivePlayers).with_timeout(timeout),
            Reply::ActivePlayers,
        );
    }

    pub fn handle_active_players(&mut self, result: RpcResult, cx: &mut Context) {
        let (status, data) = match result {
            Ok(data) => {
                let reported = Vec::<ReportedPlayer>::deserialize(&data).unwrap_or_else(|e| {
                    tracing::debug!(%e, "Active players answer is not a player list");
                    Vec::new()
                });
                self.merge_reported(reported);
                (Status::Success, data)
            }
            Err(_) => (Status::Error, Value::Null),
        };
        cx.emit(Event::ActivePlayersUpdated { status, data });
    }

    fn merge_reported(&mut self, reported: Vec<ReportedPlayer>) {
        if reported.is_empty() {
            if !self.active_players.is_empty() {
                tracing::info!("No player active anymore");
            }
            self.active_players.clear();
            return;
        }

        let reported_ids: BTreeSet<_> = reported.iter().map(|p| p.id).collect();
        for ReportedPlayer { id, kind } in reported {
            let state = match self.active_players.remove(&id) {
                Some(previous) => PlayerState::succeed(previous, kind),
                None => {
                    tracing::info!(id, ?kind, "New player active");
                    PlayerState::new(id, kind)
                }
            };
            self.active_players.insert(id, state);
        }
        self.active_players.retain(|id, _| {
            let keep = reported_ids.contains(id);
            if !keep {
                tracing::info!(id, "Player went away");
            }
            keep
        });
    }

    pub fn refresh_player_status(&self, id: Option<PlayerId>, cx: &mut Context) {
        let Some(player) = self.active_player(id) else {
            tracing::debug!(?id, "No player to refresh");
            return;
        };
        let timeout = cx.timings().request_timeout();
        cx.request(
            RpcCall::new(Method::PlayerGetProperties)
                .with_params(json!({
                    "playerid": player.id,
                    "properties": PLAYER_PROPERTIES,
                }))
                .with_timeout(timeout),
            Reply::PlayerStatus(player.id),
        );
    }

    /// Apply a status answer. Answers for players that are no longer tracked
    /// are dropped without an event.
    pub fn handle_player_status(&mut self, id: PlayerId, result: RpcResult, cx: &mut Context) {
        let Some(player) = self.active_players.get_mut(&id) else {
            tracing::debug!(id, "Status received for a player no longer tracked");
            return;
        };
        let (status, data) = match result {
            Ok(data) if !data.is_null() => match PlayerProperties::deserialize(&data) {
                Ok(properties) => {
                    player.apply_properties(properties);
                    (Status::Success, data)
                }
                Err(e) => {
                    tracing::warn!(id, %e, "Malformed player properties");
                    (Status::Error, data)
                }
            },
            Ok(data) => (Status::Error, data),
            Err(_) => (Status::Error, Value::Null),
        };

        let player = if status.is_success() {
            self.active_players.get(&id).cloned()
        } else {
            let removed = self.active_players.remove(&id);
            if removed.is_some() {
                tracing::info!(id, "Dropping player after failed status poll");
            }
            removed
        };
        cx.emit(Event::PlayerStatusUpdated {
            status,
            data,
            player,
        });
    }

    /// Follow-up to an active players poll
    pub fn on_active_players_updated(&self, status: Status, cx: &mut Context) {
        let delay = cx.timings().next_poll(status.is_success());
        cx.scheduler.schedule(TimerKind::ActivePlayers, delay);

        if self.active_player(None).is_some() {
            if !cx.scheduler.is_pending(TimerKind::PlayerStatus) {
                self.refresh_player_status(None, cx);
            }
        } else if cx.scheduler.cancel(TimerKind::PlayerStatus) {
            tracing::debug!("Stopped polling player status");
        }
    }

    /// Follow-up to a player status poll
    pub fn on_player_status_updated(&mut self, status: Status, cx: &mut Context) {
        if status.is_success() {
            cx.scheduler.cancel(TimerKind::ActivePlayers);
            let delay = cx.timings().poll_interval();
            cx.scheduler.schedule(TimerKind::PlayerStatus, delay);
        } else if !cx.scheduler.is_pending(TimerKind::ActivePlayers) {
            self.refresh_active_players(cx);
        }
        self.refresh_controls(cx);
    }

    /// Recompute which controls are usable for the current player
    pub fn refresh_controls(&mut self, cx: &mut Context) {
        let flags = self
            .active_player(None)
            .map(|p| (p.is_playing, p.is_paused));
        match flags {
            Some((playing, paused)) => {
                self.controls.enable(ControlKind::Stop);
                if playing {
                    self.controls.enable(ControlKind::Pause);
                    self.controls.disable(ControlKind::Play);
                    self.controls.mark_play_pause(true);
                } else if paused {
                    self.controls.enable(ControlKind::Play);
                    self.controls.disable(ControlKind::Pause);
                    self.controls.mark_play_pause(false);
                }
            }
            None => self.controls.disable_all(),
        }
        cx.emit(Event::Update {
            player: self.active_player(None).cloned(),
        });
    }

    /// Run the action behind a control, unless it is disabled
    pub fn press(&mut self, control: ControlKind, cx: &mut Context) {
        if self.controls.is_disabled(control) {
            tracing::debug!(?control, "Ignoring disabled control");
            return;
        }
        match control {
            ControlKind::PlayPause => self.play_pause(None, cx),
            ControlKind::Play => self.play(None, cx),
            ControlKind::Pause => self.pause(None, cx),
            ControlKind::Stop => self.stop(None, cx),
            ControlKind::Previous => self.previous(None, cx),
            ControlKind::Next => self.next(None, cx),
        }
    }

    pub fn play(&mut self, id: Option<PlayerId>, cx: &mut Context) {
        if self.send_action(id, Method::PlayerPlayPause, |p| json!({"playerid": p, "play": true}), cx) {
            self.announce(PlayerAction::Play, cx);
        }
    }

    pub fn pause(&mut self, id: Option<PlayerId>, cx: &mut Context) {
        if self.send_action(id, Method::PlayerPlayPause, |p| json!({"playerid": p, "play": false}), cx) {
            self.announce(PlayerAction::Pause, cx);
        }
    }

    pub fn play_pause(&mut self, id: Option<PlayerId>, cx: &mut Context) {
        match self.active_player(id).map(|p| p.is_playing) {
            Some(true) => self.pause(id, cx),
            Some(false) => self.play(id, cx),
            None => tracing::debug!(?id, "No player to toggle"),
        }
    }

    pub fn stop(&mut self, id: Option<PlayerId>, cx: &mut Context) {
        if self.send_action(id, Method::PlayerStop, |p| json!({"playerid": p}), cx) {
            self.announce(PlayerAction::Stop, cx);
        }
    }

    pub fn previous(&mut self, id: Option<PlayerId>, cx: &mut Context) {
        if self.go_to(id, GoTo::Previous, cx) {
            self.announce(PlayerAction::Previous, cx);
        }
    }

    pub fn next(&mut self, id: Option<PlayerId>, cx: &mut Context) {
        if self.go_to(id, GoTo::Next, cx) {
            self.announce(PlayerAction::Next, cx);
        }
    }

    /// Returns whether a player was there to receive the jump
    pub fn go_to(&self, id: Option<PlayerId>, target: GoTo, cx: &mut Context) -> bool {
        self.send_action(
            id,
            Method::PlayerGoTo,
            |p| json!({"playerid": p, "to": target.to_value()}),
            cx,
        )
    }

    /// Start playback of `item`, with or without an active player
    pub fn open(&self, item: Value, cx: &mut Context) {
        cx.request(
            RpcCall::new(Method::PlayerOpen).with_params(json!({ "item": item })),
            Reply::Ignore,
        );
    }

    fn send_action(
        &self,
        id: Option<PlayerId>,
        method: Method,
        params: impl FnOnce(PlayerId) -> Value,
        cx: &mut Context,
    ) -> bool {
        let Some(player) = self.active_player(id) else {
            tracing::debug!(?id, %method, "No player to send action to");
            return false;
        };
        cx.request(RpcCall::new(method).with_params(params(player.id)), Reply::Ignore);
        true
    }

    fn announce(&mut self, action: PlayerAction, cx: &mut Context) {
        self.refresh_controls(cx);
        cx.emit(Event::Action(action));
    }
}
