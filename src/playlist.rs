//! Local mirror of one remote playlist, kept in step with the active player.


use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::{
    config::{DefaultPlaylist, PlaylistConfig},
    context::{Context, Reply},
    controls::ControlKind,
    event::{Event, Status},
    player::{GoTo, PlayerState, PlayerTracker},
    rpc::{Method, RpcCall, RpcResult},
    scheduler::TimerKind,
};

pub type PlaylistId = u32;

const ITEM_PROPERTIES: [&str; 13] = [
    "uniqueid",
    "title",
    "artist",
    "albumartist",
    "genre",
    "year",
    "album",
    "track",
    "duration",
    "studio",
    "displayartist",
    "albumlabel",
    "file",
];

/// Identity of a playlist item. Two items with the same key are the same
/// entry as far as the diff is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub kind: String,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistItem {
    pub key: ItemKey,
    pub label: String,
    pub title: String,
    pub file: Option<String>,
    /// Every field the backend reported, for display
    pub data: Map<String, Value>,
}

impl PlaylistItem {
    /// Build an item from one entry of `Playlist.GetItems`. Returns `None`
    /// for anything that is not an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(data) = value else {
            return None;
        };
        let text = |name: &str| data.get(name).and_then(Value::as_str).map(str::to_owned);
        Some(Self {
            key: ItemKey {
                kind: text("type").unwrap_or_else(|| "unknown".to_owned()),
                id: data.get("id").and_then(Value::as_i64),
            },
            label: text("label").unwrap_or_default(),
            title: text("title").unwrap_or_default(),
            file: text("file").filter(|f| !f.is_empty()),
            data,
        })
    }

    /// A library item known only by its kind and id
    #[must_use]
    pub fn library(kind: &str, id: i64) -> Self {
        Self {
            key: ItemKey {
                kind: kind.to_owned(),
                id: Some(id),
            },
            label: String::new(),
            title: String::new(),
            file: None,
            data: Map::new(),
        }
    }

    /// A plain file or URL outside the library
    #[must_use]
    pub fn file(path: &str) -> Self {
        Self {
            key: ItemKey {
                kind: "file".to_owned(),
                id: None,
            },
            label: path.to_owned(),
            title: String::new(),
            file: Some(path.to_owned()),
            data: Map::new(),
        }
    }

    /// Item description accepted by `Playlist.Add`: library items go by id,
    /// everything else by file
    #[must_use]
    pub fn to_item_spec(&self) -> Option<Value> {
        let id_field = library_id_field(&self.key.kind);
        match (id_field, self.key.id, &self.file) {
            (Some(field), Some(id), _) => Some(json!({ field: id })),
            (_, _, Some(file)) => Some(json!({ "file": file })),
            _ => None,
        }
    }
}

/// Parameter naming a library item of this kind in `Playlist.Add`
#[must_use]
pub fn library_id_field(kind: &str) -> Option<&'static str> {
    match kind {
        "song" => Some("songid"),
        "movie" => Some("movieid"),
        "episode" => Some("episodeid"),
        "musicvideo" => Some("musicvideoid"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub item: PlaylistItem,
    pub current: bool,
}

/// Entry of `Playlist.GetPlaylists`
#[derive(Debug, Deserialize)]
struct ReportedPlaylist {
    #[serde(rename = "playlistid")]
    id: PlaylistId,
    #[serde(rename = "type")]
    kind: String,
}

pub struct PlaylistSync {
    config: PlaylistConfig,
    playlist_id: Option<PlaylistId>,
    position: Option<usize>,
    entries: Vec<PlaylistEntry>,
}

impl PlaylistSync {
    #[must_use]
    pub const fn new(config: PlaylistConfig) -> Self {
        Self {
            config,
            playlist_id: None,
            position: None,
            entries: Vec::new(),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub const fn playlist_id(&self) -> Option<PlaylistId> {
        self.playlist_id
    }

    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        self.position
    }

    #[cfg(test)]
    #[must_use]
    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&PlaylistItem> {
        self.entries.iter().find(|e| e.current).map(|e| &e.item)
    }

    /// Class put on the current entry
    #[must_use]
    pub fn current_class(&self) -> &str {
        &self.config.current_class
    }

    /// Bind to the player tracker and resolve the configured default
    /// playlist, unless the active player already reports one.
    pub fn attach(&mut self, player: &PlayerTracker, cx: &mut Context) {
        if player
            .active_player(None)
            .and_then(PlayerState::playlist_id)
            .is_some()
        {
            return;
        }
        match self.config.default_playlist.clone() {
            Some(DefaultPlaylist::Id(id)) => self.set_playlist(Some(id), cx),
            Some(DefaultPlaylist::Kind(kind)) => {
                tracing::debug!(%kind, "Looking up default playlist");
                let timeout = cx.timings().request_timeout();
                cx.request(
                    RpcCall::new(Method::PlaylistGetPlaylists).with_timeout(timeout),
                    Reply::Playlists,
                );
            }
            None => {}
        }
    }

    pub fn handle_playlists(&mut self, result: RpcResult, cx: &mut Context) {
        let Some(DefaultPlaylist::Kind(kind)) = &self.config.default_playlist else {
            return;
        };
        let Ok(data) = result else {
            return;
        };
        if self.playlist_id.is_some() {
            tracing::debug!("Playlist bound before the default was resolved");
            return;
        }
        let found = Vec::<ReportedPlaylist>::deserialize(&data)
            .unwrap_or_default()
            .into_iter()
            .find(|p| &p.kind == kind);
        match found {
            Some(playlist) => self.set_playlist(Some(playlist.id), cx),
            None => tracing::warn!(%kind, "No playlist of the default type"),
        }
    }

    /// Follow the playlist and position reported by a status poll
    pub fn on_player_status(&mut self, status: Status, player: Option<&PlayerState>, cx: &mut Context) {
        if !status.is_success() {
            if self.playlist_id.is_some() {
                self.clear(true, cx);
            }
            return;
        }
        let reported = player.and_then(PlayerState::playlist_id);
        if reported != self.playlist_id {
            self.set_playlist(reported, cx);
        } else if reported.is_some() {
            if !cx.scheduler.is_pending(TimerKind::PlaylistContent) {
                let delay = cx.timings().playlist_refresh();
                cx.scheduler.schedule(TimerKind::PlaylistContent, delay);
            }
            let position = player.and_then(PlayerState::position);
            if position != self.position {
                self.set_current(position);
            }
        } else {
            self.clear(true, cx);
        }
    }

    /// Track another remote playlist, dropping everything known about the
    /// previous one
    pub fn set_playlist(&mut self, id: Option<PlaylistId>, cx: &mut Context) {
        if id == self.playlist_id {
            return;
        }
        tracing::info!(from = ?self.playlist_id, to = ?id, "Switching playlist");
        self.clear(true, cx);
        self.playlist_id = id;
        cx.scheduler.cancel(TimerKind::PlaylistContent);
        if id.is_some() {
            self.refresh_contents(id, cx);
        }
    }

    pub fn refresh_contents(&self, id: Option<PlaylistId>, cx: &mut Context) {
        let Some(id) = id.or(self.playlist_id) else {
            return;
        };
        let timeout = cx.timings().request_timeout();
        cx.request(
            RpcCall::new(Method::PlaylistGetItems)
                .with_params(json!({
                    "playlistid": id,
                    "properties": ITEM_PROPERTIES,
                }))
                .with_timeout(timeout),
            Reply::PlaylistItems(id),
        );
    }

    pub fn handle_items(
        &mut self,
        id: PlaylistId,
        result: RpcResult,
        player: &PlayerTracker,
        cx: &mut Context,
    ) {
        if Some(id) != self.playlist_id {
            tracing::debug!(id, "Dropping items of a playlist no longer tracked");
            return;
        }
        let (status, data) = match result {
            Ok(mut data) => match data.get_mut("items").map(Value::take) {
                Some(Value::Array(items)) => {
                    self.update(items, player, cx);
                    (Status::Success, data)
                }
                _ => {
                    self.clear(true, cx);
                    (Status::Error, data)
                }
            },
            Err(_) => (Status::Error, Value::Null),
        };
        cx.emit(Event::PlaylistContentUpdated { status, data });
    }

    /// Positional diff of the remote list against the local one
    fn update(&mut self, items: Vec<Value>, player: &PlayerTracker, cx: &mut Context) {
        let items: Vec<_> = items.into_iter().filter_map(PlaylistItem::from_value).collect();
        self.entries.truncate(items.len());

        for (position, item) in items.into_iter().enumerate() {
            match self.entries.get_mut(position) {
                Some(entry) if entry.item.key == item.key => {}
                Some(entry) => {
                    entry.item = item.clone();
                    cx.emit(Event::PlaylistItemUpdated { position, item });
                }
                None => {
                    self.entries.push(PlaylistEntry {
                        item: item.clone(),
                        current: false,
                    });
                    cx.emit(Event::PlaylistItemAdded {
                        item,
                        gui_only: true,
                    });
                }
            }
        }

        if let Some(active) = player.active_player(None) {
            self.set_current(active.position());
        }
        cx.emit(Event::PlaylistUpdated {
            len: self.entries.len(),
        });
    }

    /// Append an item locally, and remotely unless `gui_only`
    pub fn add_item(&mut self, item: PlaylistItem, gui_only: bool, cx: &mut Context) {
        let spec = item.to_item_spec();
        self.entries.push(PlaylistEntry {
            item: item.clone(),
            current: false,
        });
        cx.emit(Event::PlaylistItemAdded { item, gui_only });

        if gui_only {
            return;
        }
        match spec {
            Some(spec) => self.send_action(Method::PlaylistAdd, json!({ "item": spec }), cx),
            None => tracing::debug!("Item has neither library id nor file, not adding remotely"),
        }
    }

    /// Empty the list locally, and remotely unless `gui_only`
    pub fn clear(&mut self, gui_only: bool, cx: &mut Context) {
        self.entries.clear();
        self.position = None;
        if !gui_only {
            self.send_action(Method::PlaylistClear, json!({}), cx);
        }
        cx.emit(Event::PlaylistCleared { gui_only });
    }

    /// Mark the entry at `position` as current, unmarking all others
    pub fn set_current(&mut self, position: Option<usize>) {
        self.position = position;
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.current = Some(i) == position;
        }
    }

    /// Start playing the entry at `position`
    pub fn activate(&self, position: usize, player: &PlayerTracker, cx: &mut Context) {
        if player.active_player(None).is_some() {
            player.go_to(None, GoTo::Position(position), cx);
        } else if let Some(id) = self.playlist_id {
            player.open(json!({"playlistid": id, "position": position}), cx);
        } else {
            tracing::debug!(position, "No playlist to play from");
        }
    }

    /// Previous/next only make sense with somewhere to go
    pub fn adjust_controls(&mut self, player: &mut PlayerTracker) {
        let count = self.entries.len();
        let has_player = player.active_player(None).is_some();
        let controls = player.controls_mut();
        if count > 0 && has_player {
            if self.position.is_some_and(|p| p > 0) {
                controls.enable(ControlKind::Previous);
            } else {
                controls.disable(ControlKind::Previous);
            }
            if self.position.map_or(true, |p| p + 1 < count) {
                controls.enable(ControlKind::Next);
            } else {
                controls.disable(ControlKind::Next);
            }
        } else {
            self.set_current(None);
            controls.disable(ControlKind::Previous);
            controls.disable(ControlKind::Next);
        }
    }

    fn send_action(&self, method: Method, mut params: Value, cx: &mut Context) {
        let Some(id) = self.playlist_id else {
            tracing::debug!(%method, "No playlist to send action to");
            return;
        };
        if let Some(params) = params.as_object_mut() {
            params.insert("playlistid".to_owned(), json!(id));
        }
        cx.request(RpcCall::new(method).with_params(params), Reply::Ignore);
    }
}
