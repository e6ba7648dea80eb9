use std::{fs::File, io, path::PathBuf, sync::Mutex};

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DefaultPlaylist};

/// Command line arguments
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML file with the full configuration. Flags below override it.
    #[clap(long, short)]
    pub config: Option<PathBuf>,
    /// Host running the media center
    #[clap(long)]
    pub host: Option<String>,
    /// Port of the media center's web server
    #[clap(long, short)]
    pub port: Option<u16>,
    /// Username for HTTP basic authentication
    #[clap(long, short)]
    pub username: Option<String>,
    /// Password for HTTP basic authentication
    #[clap(long)]
    pub password: Option<String>,
    /// Playlist to show before any player reports one: a playlist id, or a
    /// playlist type such as `audio`
    #[clap(long)]
    pub default_playlist: Option<DefaultPlaylist>,
    /// File to write the log to. If not specified, logs will be written to stderr.
    #[clap(long, short)]
    log_file: Option<String>,
}

impl Args {
    /// Build the tracing subscriber using parameters from the command line arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be created.
    pub fn init_tracing_subscriber(&self) -> Result<()> {
        let builder = tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(EnvFilter::from_default_env());

        match self.log_file.as_ref() {
            None => builder.with_writer(io::stderr).init(),
            Some(f) => {
                let file = File::create(f).with_context(|| format!("Failed to create log file {f}"))?;
                builder.with_writer(Mutex::new(file)).init();
            }
        }
        Ok(())
    }

    /// Load the config file, if any, and apply the flags on top of it
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn build_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.username.is_some() {
            config.server.username.clone_from(&self.username);
        }
        if self.password.is_some() {
            config.server.password.clone_from(&self.password);
        }
        if self.default_playlist.is_some() {
            config.playlist.default_playlist.clone_from(&self.default_playlist);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from(["mcremote", "--host", "kodi.lan", "-p", "9090", "--default-playlist", "1"]);
        assert_eq!(args.host.as_deref(), Some("kodi.lan"));
        assert_eq!(args.port, Some(9090));
        assert_eq!(args.default_playlist, Some(DefaultPlaylist::Id(1)));
    }

    #[test]
    fn test_flags_override_file() {
        let path = std::env::temp_dir().join(format!("mcremote-args-{}.toml", std::process::id()));
        let mut file = File::create(&path).unwrap();
        writeln!(file, "[server]\nhost = \"file.lan\"\nport = 8081\nusername = \"kodi\"").unwrap();

        let args = Args {
            config: Some(path.clone()),
            port: Some(9000),
            default_playlist: Some(DefaultPlaylist::Kind("video".to_owned())),
            ..Args::default()
        };
        let config = args.build_config().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.server.host, "file.lan");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.username.as_deref(), Some("kodi"));
        assert_eq!(config.server.password, None);
        assert_eq!(
            config.playlist.default_playlist,
            Some(DefaultPlaylist::Kind("video".to_owned()))
        );
    }

    #[test]
    fn test_missing_config_file() {
        let args = Args {
            config: Some(PathBuf::from("/nonexistent/mcremote.toml")),
            ..Args::default()
        };
        assert!(args.build_config().is_err());
    }
}
