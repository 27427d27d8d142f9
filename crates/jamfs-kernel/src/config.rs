//! Process configuration and the local artist list.

use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::EnumString;
use thiserror::Error;

use crate::catalog::SearchEntity;

/// Environment variable carrying the catalog client id.
pub const CLIENT_ID_ENV: &str = "JAMFS_CLIENT_ID";

/// Environment variable enabling debug logging.
pub const DEBUG_ENV: &str = "JAMFS_DEBUG";

/// Default catalog API base.
pub const DEFAULT_API_BASE: &str = "https://api.jamendo.com/v3.0";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{CLIENT_ID_ENV} is not set")]
    MissingClientId,

    #[error("no user configuration directory")]
    NoConfigDir,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// What the root of the mount exposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum MountMode {
    /// Artists from the local artist list.
    #[default]
    #[strum(serialize = "config")]
    Config,
    /// Three-level alphabetic autocomplete branch.
    #[strum(serialize = "full")]
    Full,
}

impl MountMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MountMode::Config => "config",
            MountMode::Full => "full",
        }
    }
}

impl std::fmt::Display for MountMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the core needs to talk to the catalog.
#[derive(Debug, Clone)]
pub struct FsConfig {
    pub client_id: String,
    pub api_base: String,
    pub mode: MountMode,
    pub search_entity: SearchEntity,
    pub debug: bool,
    pub user_agent: String,
    /// `limit` for album listings.
    pub album_limit: u32,
    /// `limit` for autocomplete queries.
    pub autocomplete_limit: u32,
    /// Concurrent locator probes while populating a format directory.
    pub probe_concurrency: usize,
}

impl FsConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            mode: MountMode::default(),
            search_entity: SearchEntity::default(),
            debug: false,
            user_agent: format!("jamfs/{}", env!("CARGO_PKG_VERSION")),
            album_limit: 200,
            autocomplete_limit: 100,
            probe_concurrency: 4,
        }
    }

    /// Credential and debug flag from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = std::env::var(CLIENT_ID_ENV)
            .ok()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::MissingClientId)?;

        let mut config = Self::new(client_id);
        config.debug = std::env::var(DEBUG_ENV)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        Ok(config)
    }
}

/// `y...`, `t...` or `1...` enable a flag.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().chars().next().map(|c| c.to_ascii_lowercase()),
        Some('y' | 't' | '1')
    )
}

/// One configured artist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredArtist {
    pub name: String,
    pub id: String,
}

/// The `artists.json` file: `{"artists": [["Name", "id"], ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistList {
    pub artists: Vec<ConfiguredArtist>,
}

#[derive(Debug, Deserialize)]
struct ArtistFile {
    #[serde(default)]
    artists: Vec<Value>,
}

impl ArtistList {
    /// `<config_dir>/jamfs/artists.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("jamfs").join("artists.json"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse the file body. Pairs of the wrong shape are skipped.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let file: ArtistFile = serde_json::from_str(text)?;
        let artists = file
            .artists
            .iter()
            .filter_map(|pair| {
                let artist = match pair.as_array().map(Vec::as_slice) {
                    Some([Value::String(name), Value::String(id)]) => Some(ConfiguredArtist {
                        name: name.clone(),
                        id: id.clone(),
                    }),
                    Some([Value::String(name), Value::Number(id)]) => Some(ConfiguredArtist {
                        name: name.clone(),
                        id: id.to_string(),
                    }),
                    _ => None,
                };
                if artist.is_none() {
                    tracing::warn!(entry = %pair, "skipping malformed artist entry");
                }
                artist
            })
            .collect();
        Ok(Self { artists })
    }

    pub fn len(&self) -> usize {
        self.artists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
    }
}

impl FromStr for ArtistList {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("y"));
        assert!(is_truthy("yes"));
        assert!(is_truthy("True"));
        assert!(is_truthy("1"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("no"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn test_mount_mode_parse() {
        assert_eq!("full".parse::<MountMode>().unwrap(), MountMode::Full);
        assert_eq!("CONFIG".parse::<MountMode>().unwrap(), MountMode::Config);
        assert!("partial".parse::<MountMode>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = FsConfig::new("abc");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.mode, MountMode::Config);
        assert_eq!(config.search_entity, SearchEntity::Artists);
        assert_eq!(config.album_limit, 200);
        assert!(config.user_agent.starts_with("jamfs/"));
    }

    #[test]
    fn test_parse_artist_list() {
        let list: ArtistList = r#"{"artists": [
            ["Test Artist", "123"],
            ["Numeric Id", 456],
            ["Lonely"],
            "nope",
            [1, 2]
        ]}"#
        .parse()
        .unwrap();
        assert_eq!(
            list.artists,
            vec![
                ConfiguredArtist { name: "Test Artist".into(), id: "123".into() },
                ConfiguredArtist { name: "Numeric Id".into(), id: "456".into() },
            ]
        );
    }

    #[test]
    fn test_parse_missing_artists_key() {
        let list = ArtistList::parse("{}").unwrap();
        assert!(list.is_empty());
        assert!(ArtistList::parse("not json").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"artists": [["Test Artist", "123"]]}}"#).unwrap();

        let list = ArtistList::load(file.path()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.artists[0].name, "Test Artist");

        let err = ArtistList::load(Path::new("/nonexistent/jamfs/artists.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
