//! Player control buttons: which are usable, and which classes they carry.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::config::{ControlClasses, PlayerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlKind {
    PlayPause,
    Play,
    Pause,
    Stop,
    Previous,
    Next,
}
impl ControlKind {
    pub const ALL: [Self; 6] = [
        Self::PlayPause,
        Self::Play,
        Self::Pause,
        Self::Stop,
        Self::Previous,
        Self::Next,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlayPause => "play-pause",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Previous => "previous",
            Self::Next => "next",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlState {
    pub disabled: bool,
    pub classes: BTreeSet<String>,
}

/// The bound controls. Only controls with a command word configured exist;
/// toggling a missing one does nothing.
#[derive(Debug, Clone)]
pub struct Controls {
    classes: ControlClasses,
    words: BTreeMap<ControlKind, String>,
    states: BTreeMap<ControlKind, ControlState>,
}

impl Controls {
    #[must_use]
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            classes: config.classes.clone(),
            words: config.controls.clone(),
            states: config
                .controls
                .keys()
                .map(|kind| (*kind, ControlState::default()))
                .collect(),
        }
    }

    /// Look up the control bound to a command word
    #[must_use]
    pub fn find(&self, word: &str) -> Option<ControlKind> {
        self.words
            .iter()
            .find_map(|(kind, w)| (w == word).then_some(*kind))
    }

    #[cfg(test)]
    #[must_use]
    pub fn get(&self, kind: ControlKind) -> Option<&ControlState> {
        self.states.get(&kind)
    }

    /// Unbound controls count as disabled
    #[must_use]
    pub fn is_disabled(&self, kind: ControlKind) -> bool {
        self.states.get(&kind).map_or(true, |c| c.disabled)
    }

    pub fn enable(&mut self, kind: ControlKind) -> Option<&mut ControlState> {
        let control = self.states.get_mut(&kind)?;
        control.disabled = false;
        control.classes.remove(&self.classes.disabled);
        Some(control)
    }

    pub fn disable(&mut self, kind: ControlKind) -> Option<&mut ControlState> {
        let control = self.states.get_mut(&kind)?;
        control.disabled = true;
        control.classes.insert(self.classes.disabled.clone());
        Some(control)
    }

    pub fn disable_all(&mut self) {
        for kind in ControlKind::ALL {
            self.disable(kind);
        }
    }

    /// Enable play-pause and flag it as playing or paused
    pub fn mark_play_pause(&mut self, playing: bool) {
        let (add, remove) = if playing {
            (self.classes.playing.clone(), &self.classes.paused)
        } else {
            (self.classes.paused.clone(), &self.classes.playing)
        };
        let remove = remove.clone();
        if let Some(control) = self.enable(ControlKind::PlayPause) {
            control.classes.remove(&remove);
            control.classes.insert(add);
        }
    }

    /// The playing/paused class currently on play-pause, if any
    #[must_use]
    pub fn play_pause_class(&self) -> Option<&str> {
        let control = self.states.get(&ControlKind::PlayPause)?;
        [&self.classes.playing, &self.classes.paused]
            .into_iter()
            .find(|c| control.classes.contains(*c))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_disable() {
        let mut controls = Controls::new(&PlayerConfig::default());
        assert!(!controls.is_disabled(ControlKind::Stop));
        controls.disable(ControlKind::Stop);
        assert!(controls.is_disabled(ControlKind::Stop));
        assert!(controls.get(ControlKind::Stop).unwrap().classes.contains("disabled"));
        controls.enable(ControlKind::Stop);
        assert_eq!(controls.get(ControlKind::Stop), Some(&ControlState::default()));
    }

    #[test]
    fn test_play_pause_class() {
        let mut controls = Controls::new(&PlayerConfig::default());
        controls.disable_all();
        controls.mark_play_pause(true);
        assert!(!controls.is_disabled(ControlKind::PlayPause));
        assert_eq!(controls.play_pause_class(), Some("playing"));
        controls.mark_play_pause(false);
        assert_eq!(controls.play_pause_class(), Some("paused"));
        assert_eq!(controls.get(ControlKind::PlayPause).unwrap().classes.len(), 1);
    }

    #[test]
    fn test_unbound_control() {
        let mut config = PlayerConfig::default();
        config.controls.remove(&ControlKind::Stop);
        config.controls.insert(ControlKind::PlayPause, "toggle".to_owned());
        let mut controls = Controls::new(&config);
        assert!(controls.enable(ControlKind::Stop).is_none());
        assert!(controls.is_disabled(ControlKind::Stop));
        assert_eq!(controls.find("toggle"), Some(ControlKind::PlayPause));
        assert_eq!(controls.find("play-pause"), None);
    }
}
