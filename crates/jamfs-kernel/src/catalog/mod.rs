//! Remote music catalog.
//!
//! - [`Catalog`] - the queries the resolution engine needs
//! - [`CatalogClient`] - HTTP+JSON implementation against the Jamendo v3.0 API
//! - [`UpstreamError`] - transport, status and decoding failures
//!
//! Records are decoded leniently: a missing or mistyped field is `None`,
//! never an error. The caller decides whether an absent field degrades the
//! entry or drops it.

mod client;
mod error;

pub use client::CatalogClient;
pub use error::{UpstreamError, UpstreamResult};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::EnumString;

/// Audio encodings offered for every album.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum AudioFormat {
    /// Low bitrate MP3.
    Mp31,
    /// High bitrate MP3.
    Mp32,
    /// Ogg Vorbis.
    Ogg,
    /// FLAC.
    Flac,
}

impl AudioFormat {
    /// Every format, in listing order.
    pub const ALL: [AudioFormat; 4] = [
        AudioFormat::Mp31,
        AudioFormat::Mp32,
        AudioFormat::Ogg,
        AudioFormat::Flac,
    ];

    /// Directory name and `audioformat` query value.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp31 => "mp31",
            AudioFormat::Mp32 => "mp32",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
        }
    }

    /// File extension for tracks in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp31 | AudioFormat::Mp32 => "mp3",
            AudioFormat::Ogg => "oga",
            AudioFormat::Flac => "flac",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entity type targeted by an autocomplete branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum SearchEntity {
    #[default]
    #[strum(serialize = "artists", serialize = "artist")]
    Artists,
    #[strum(serialize = "albums", serialize = "album")]
    Albums,
    #[strum(serialize = "tracks", serialize = "track")]
    Tracks,
    #[strum(serialize = "tags", serialize = "tag")]
    Tags,
}

impl SearchEntity {
    /// Parse from string (case-insensitive, singular or plural).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Query value and top-level directory name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEntity::Artists => "artists",
            SearchEntity::Albums => "albums",
            SearchEntity::Tracks => "tracks",
            SearchEntity::Tags => "tags",
        }
    }
}

impl std::fmt::Display for SearchEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One album of an artist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    /// `YYYY-MM-DD`, unparsed.
    pub release_date: Option<String>,
}

/// One track of an album in a given format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Per-track media reference, resolved later by the audio locator.
    pub audio: Option<String>,
    pub position: Option<u32>,
}

/// Queries issued against the remote catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Albums released by the artist with `artist_id`.
    async fn albums_by_artist(&self, artist_id: &str) -> UpstreamResult<Vec<AlbumRecord>>;

    /// Tracks of `album_id` encoded as `format`.
    async fn album_tracks(
        &self,
        album_id: &str,
        format: AudioFormat,
    ) -> UpstreamResult<Vec<TrackRecord>>;

    /// Id of the artist whose name is exactly `name`.
    async fn artist_id_by_name(&self, name: &str) -> UpstreamResult<Option<String>>;

    /// Id of the album whose name is exactly `name`.
    async fn album_id_by_name(&self, name: &str) -> UpstreamResult<Option<String>>;

    /// Names of `entity` records matching a three-letter `prefix`.
    async fn autocomplete(&self, prefix: &str, entity: SearchEntity)
    -> UpstreamResult<Vec<String>>;
}
