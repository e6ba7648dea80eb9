//! Volume, mute flag and version of the remote application.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    context::{Context, Reply},
    event::{Event, Status},
    rpc::{Method, RpcCall, RpcResult},
    scheduler::TimerKind,
};

const APPLICATION_PROPERTIES: [&str; 4] = ["volume", "muted", "name", "version"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApplicationVersion {
    pub major: i64,
    pub minor: i64,
    pub tag: String,
}

/// Answer to `Application.GetProperties`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApplicationState {
    pub volume: i64,
    pub muted: bool,
    pub name: String,
    pub version: ApplicationVersion,
}

#[derive(Debug, Default)]
pub struct ApplicationTracker {
    /// `None` until a poll returns something usable
    state: Option<ApplicationState>,
}

impl ApplicationTracker {
    #[cfg(test)]
    #[must_use]
    pub const fn state(&self) -> Option<&ApplicationState> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn volume(&self) -> Option<i64> {
        self.state.as_ref().map(|s| s.volume)
    }

    /// Mute flag as of the last poll
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.muted)
    }

    pub fn refresh_data(&self, cx: &mut Context) {
        let timeout = cx.timings().request_timeout();
        cx.request(
            RpcCall::new(Method::ApplicationGetProperties)
                .with_params(json!({ "properties": APPLICATION_PROPERTIES }))
                .with_timeout(timeout),
            Reply::Application,
        );
    }

    pub fn handle_properties(&mut self, result: RpcResult, cx: &mut Context) {
        let (status, data) = match result {
            Ok(data) => {
                let state = if data.is_null() {
                    None
                } else {
                    ApplicationState::deserialize(&data)
                        .inspect_err(|e| tracing::warn!(%e, "Malformed application properties"))
                        .ok()
                };
                if let Some(state) = &state {
                    self.announce_changes(state, cx);
                }
                self.state = state;
                (Status::Success, data)
            }
            Err(_) => (Status::Error, Value::Null),
        };
        cx.emit(Event::ApplicationUpdated { status, data });
    }

    fn announce_changes(&self, new: &ApplicationState, cx: &mut Context) {
        let old = self.state.as_ref();
        if old.map(|s| s.volume) != Some(new.volume) {
            tracing::debug!(volume = new.volume, "Volume changed");
            cx.emit(Event::VolumeChanged { volume: new.volume });
        }
        if old.map(|s| s.muted) != Some(new.muted) {
            cx.emit(if new.muted { Event::Muted } else { Event::Unmuted });
        }
    }

    /// Follow-up to a poll: keep exactly one refresh pending
    pub fn on_updated(&self, status: Status, cx: &mut Context) {
        let delay = cx.timings().next_poll(status.is_success());
        cx.scheduler.schedule(TimerKind::ApplicationData, delay);
    }

    /// Set the volume, unmuting first if the last poll saw it muted
    pub fn set_volume(&self, volume: i64, cx: &mut Context) {
        cx.request(
            RpcCall::new(Method::ApplicationSetVolume).with_params(json!({ "volume": volume })),
            Reply::Ignore,
        );
        if self.is_muted() {
            self.set_mute(false, cx);
        }
    }

    pub fn set_mute(&self, mute: bool, cx: &mut Context) {
        cx.request(
            RpcCall::new(Method::ApplicationSetMute).with_params(json!({ "mute": mute })),
            Reply::Ignore,
        );
    }

    pub fn toggle_mute(&self, cx: &mut Context) {
        self.set_mute(!self.is_muted(), cx);
    }
}
