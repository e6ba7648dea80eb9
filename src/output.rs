use serde::Serialize;
use std::io::{self, Write};

use crate::{
    config::OutputConfig,
    format::{duration_to_string, fill_placeholders},
    playlist::PlaylistSync,
    session::Session,
};

/// A structure that can be serialized to JSON and parsed by Waybar.
#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct WaybarCustomModule {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tooltip: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    class: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    percentage: Option<usize>,
}

impl WaybarCustomModule {
    /// Create a new module with the given contents.
    pub fn new(
        text: Option<&str>,
        alt: Option<&str>,
        tooltip: Option<&str>,
        class: &[&str],
        percentage: Option<usize>,
    ) -> Self {
        Self {
            text: text.map(html_escape::encode_text).map(String::from),
            alt: alt.map(html_escape::encode_text).map(String::from),
            tooltip: tooltip.map(html_escape::encode_text).map(String::from),
            class: class
                .iter()
                .map(|c| html_escape::encode_text(c).into_owned())
                .collect(),
            percentage,
        }
    }

    /// Render the current state of a session.
    ///
    /// The text is the playing playlist entry, or the communication error
    /// while that notice is up. `alt` is `playing`, `paused` or `stopped`.
    /// The playlist's current-entry class is added while an entry plays.
    #[must_use]
    pub fn from_session(session: &Session, config: &OutputConfig) -> Self {
        let player = session.player().active_player(None);
        let alt = match player {
            Some(p) if p.is_playing => "playing",
            Some(_) => "paused",
            None => "stopped",
        };

        let playlist = session.playlist();
        let current = playlist.and_then(PlaylistSync::current_item);
        let title = current.map_or_else(
            || config.placeholder.clone(),
            |item| fill_placeholders(&item.data, &config.properties, &config.separator, &item.label),
        );

        let mut tooltip = vec![title.clone()];
        if let Some(properties) = player.and_then(|p| p.properties.as_ref()) {
            tooltip.push(format!(
                "{} / {}",
                duration_to_string(properties.time.as_secs()),
                duration_to_string(properties.total_time.as_secs())
            ));
        }
        if let Some(playlist) = playlist.filter(|p| !p.is_empty()) {
            if let Some(position) = playlist.position().filter(|&p| p < playlist.len()) {
                tooltip.push(format!("Track {}/{}", position + 1, playlist.len()));
            }
        }
        let application = session.application();
        if let Some(volume) = application.volume() {
            let muted = if application.is_muted() { " (muted)" } else { "" };
            tooltip.push(format!("Volume {volume}%{muted}"));
        }

        let (text, class) = match session.communication_lost() {
            Some(message) => (message.to_owned(), vec!["error"]),
            None => {
                let mut class = vec![session.controls().play_pause_class().unwrap_or("stopped")];
                if let (Some(playlist), Some(_)) = (playlist, current) {
                    class.push(playlist.current_class());
                }
                (title, class)
            }
        };
        let percentage = player
            .and_then(|p| p.properties.as_ref())
            .map(|p| p.percentage.clamp(0.0, 100.0).round() as usize);

        Self::new(
            Some(&text),
            Some(alt),
            Some(tooltip.join("\n").trim()),
            &class,
            percentage,
        )
    }

    /// Format the module as JSON and write it to the given writer.
    ///
    /// # Errors
    ///
    /// This function will return an error if writing to the given writer fails.
    pub fn format<T: Write>(&self, mut f: &mut T) -> io::Result<()> {
        serde_json::to_writer(&mut f, self)?;
        f.write_all(b"\n")?;
        Ok(())
    }

    /// Print the module to stdout.
    ///
    /// # Errors
    ///
    /// This function will return an error if writing to stdout fails.
    pub fn print(&self) -> io::Result<()> {
        self.format(&mut io::stdout().lock())
    }
}
