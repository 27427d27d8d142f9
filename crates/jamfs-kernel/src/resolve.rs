//! Discovery state machine.
//!
//! A [`Resolver`] turns a requested virtual path into the cached
//! [`Directory`] holding it, populating at most one missing level per call.
//! Population goes through the catalog (and the audio locator for tracks),
//! builds the whole directory off-cache, then inserts it in one step.
//!
//! Concurrent first visits of the same path are serialized by a per-path
//! gate: one caller populates, the rest wait and read the cached result.

use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{AudioFormat, Catalog, SearchEntity, TrackRecord};
use crate::config::ArtistList;
use crate::locator::{AudioLocator, MediaInfo};
use crate::namespace::name::{basename, component_name, dirname, normalize_name};
use crate::namespace::{Directory, DirectoryKind, Entry, NamespaceCache, PREFIX_DEPTH};
use crate::vfs::{VfsError, VfsResult};

/// Name of the root link in full mode.
pub const AUTOCOMPLETE_LINK: &str = "artists";

/// Filesystem operation a path is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Getattr,
    Readdir,
    Read,
}

impl FileOp {
    /// Getattr and read only need the directory that holds the target.
    fn wants_parent(self) -> bool {
        matches!(self, FileOp::Getattr | FileOp::Read)
    }
}

pub struct Resolver {
    cache: NamespaceCache,
    catalog: Arc<dyn Catalog>,
    locator: Arc<dyn AudioLocator>,
    gates: DashMap<String, Arc<Mutex<()>>>,
    probe_concurrency: usize,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("cached_dirs", &self.cache.len())
            .field("in_flight", &self.gates.len())
            .field("probe_concurrency", &self.probe_concurrency)
            .finish()
    }
}

impl Resolver {
    pub fn new(catalog: Arc<dyn Catalog>, locator: Arc<dyn AudioLocator>) -> Self {
        Self {
            cache: NamespaceCache::new(),
            catalog,
            locator,
            gates: DashMap::new(),
            probe_concurrency: 4,
        }
    }

    pub fn with_probe_concurrency(mut self, n: usize) -> Self {
        self.probe_concurrency = n.max(1);
        self
    }

    pub fn cache(&self) -> &NamespaceCache {
        &self.cache
    }

    /// Install the root directory. Must happen before any resolution.
    pub fn install_root(&self, root: Directory) -> VfsResult<()> {
        info!(kind = ?root.kind, children = root.len(), "installing root");
        self.cache.insert(root)
    }

    /// Directory that answers `op` on the canonical `path`.
    ///
    /// For getattr and read this is the directory containing `path`; for
    /// readdir it is `path` itself. Only one unvisited level is ever
    /// populated: a path whose ancestors were never visited is not found.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve(&self, path: &str, op: FileOp) -> VfsResult<Arc<Directory>> {
        let target = if op.wants_parent() {
            let parent = dirname(path);
            if let Some(dir) = self.cache.get(parent) {
                return Ok(dir);
            }
            parent
        } else {
            if let Some(dir) = self.cache.get(path) {
                return Ok(dir);
            }
            path
        };

        if target == "/" {
            return Err(VfsError::not_found(path));
        }

        let owner = self
            .cache
            .get(dirname(target))
            .ok_or_else(|| VfsError::not_found(path))?;
        let entry = owner
            .get(basename(target))
            .cloned()
            .ok_or_else(|| VfsError::not_found(path))?;
        if !entry.is_dir() {
            return Err(VfsError::not_a_directory(target));
        }

        self.populate(&owner, &entry, target).await
    }

    /// Populate `target`, the directory behind `entry` inside `owner`.
    async fn populate(
        &self,
        owner: &Directory,
        entry: &Entry,
        target: &str,
    ) -> VfsResult<Arc<Directory>> {
        let gate = Arc::clone(&self.gates.entry(target.to_string()).or_default());
        let _guard = gate.lock().await;

        // Someone else may have finished while we waited.
        if let Some(dir) = self.cache.get(target) {
            return Ok(dir);
        }

        let kind = owner
            .kind
            .child_kind(owner.search_entity)
            .ok_or_else(|| VfsError::not_a_directory(target))?;

        let dir = self.fill(kind, target, entry, owner.search_entity).await;
        let link_count = dir.link_count();
        let children = dir.len();
        self.cache.insert(dir)?;
        if kind.patches_link_count() {
            self.cache.patch_link_count(&owner.path, &entry.name, link_count);
        }
        self.gates.remove(target);

        info!(path = %target, ?kind, children, "populated directory");
        self.cache
            .get(target)
            .ok_or_else(|| VfsError::other(format!("{target} vanished after insert")))
    }

    /// Build the directory of `kind` at `path`. Upstream failures leave it
    /// empty or partial.
    async fn fill(
        &self,
        kind: DirectoryKind,
        path: &str,
        entry: &Entry,
        entity: SearchEntity,
    ) -> Directory {
        let mut dir = Directory::new(path, kind, entity);
        match kind {
            DirectoryKind::Letters { .. } => fill_letters(&mut dir),
            DirectoryKind::AutocompleteResult => self.fill_autocomplete(&mut dir).await,
            DirectoryKind::Artist => self.fill_artist(&mut dir, entry).await,
            DirectoryKind::Album => self.fill_album(&mut dir, entry).await,
            DirectoryKind::Format => self.fill_format(&mut dir, entry).await,
            DirectoryKind::RootArtists | DirectoryKind::ArtistList | DirectoryKind::Leaf => {}
        }
        dir
    }

    async fn fill_autocomplete(&self, dir: &mut Directory) {
        let prefix = letter_prefix(&dir.path);
        let entity = dir.search_entity;
        let names = match self.catalog.autocomplete(&prefix, entity).await {
            Ok(names) => names,
            Err(e) => {
                warn!(prefix = %prefix, %entity, error = %e, "autocomplete failed");
                return;
            }
        };

        let link_count = child_link_count(dir);
        for name in names {
            if !starts_with_ignore_case(&name, &prefix) {
                debug!(name = %name, prefix = %prefix, "dropping non-matching autocomplete result");
                continue;
            }
            dir.insert(Entry::directory(normalize_name(&name), name, link_count));
        }
    }

    async fn fill_artist(&self, dir: &mut Directory, artist: &Entry) {
        let Some(artist_id) = self.artist_id(artist).await else {
            return;
        };
        let albums = match self.catalog.albums_by_artist(&artist_id).await {
            Ok(albums) => albums,
            Err(e) => {
                warn!(artist = %artist.display_name, error = %e, "album listing failed");
                return;
            }
        };

        let link_count = child_link_count(dir);
        for album in albums {
            let Some(name) = album.name else {
                debug!(id = ?album.id, "skipping album without a name");
                continue;
            };
            dir.insert(
                Entry::directory(normalize_name(&name), name, link_count)
                    .with_remote_id(album.id)
                    .with_release_date(album.release_date.as_deref()),
            );
        }
    }

    async fn fill_album(&self, dir: &mut Directory, album: &Entry) {
        let album_id = match &album.remote_id {
            Some(id) => Some(id.clone()),
            None => match self.catalog.album_id_by_name(&album.display_name).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(album = %album.display_name, error = %e, "album id lookup failed");
                    None
                }
            },
        };
        if album_id.is_none() {
            warn!(album = %album.display_name, "album has no id, formats will be empty");
        }

        let link_count = child_link_count(dir);
        for format in AudioFormat::ALL {
            let mut format_entry = Entry::directory(format.as_str(), format.as_str(), link_count)
                .with_remote_id(album_id.clone())
                .with_format(format);
            format_entry.release_date = album.release_date;
            dir.insert(format_entry);
        }
    }

    async fn fill_format(&self, dir: &mut Directory, format_entry: &Entry) {
        let Some(format) = format_entry
            .media_format
            .or_else(|| format_entry.name.parse().ok())
        else {
            warn!(path = %dir.path, "format directory without a known format");
            return;
        };
        let Some(album_id) = format_entry.remote_id.as_deref() else {
            return;
        };
        let tracks = match self.catalog.album_tracks(album_id, format).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(album_id, %format, error = %e, "track listing failed");
                return;
            }
        };

        let locator = &self.locator;
        let entries: Vec<Entry> = stream::iter(tracks.into_iter().filter_map(playable))
            .map(|(track, name, audio)| async move {
                let media = match locator.probe(&audio).await {
                    Ok(media) => media,
                    Err(e) => {
                        warn!(track = %name, error = %e, "probe failed, keeping raw reference");
                        MediaInfo::unprobed(audio)
                    }
                };
                let file_name = track_file_name(track.position.unwrap_or(0), &name, format);
                Entry::track(file_name, name, format, media).with_remote_id(track.id)
            })
            .buffered(self.probe_concurrency)
            .collect()
            .await;

        for entry in entries {
            dir.insert(entry);
        }
    }

    /// Catalog id of an artist, searched by name when autocomplete found it.
    async fn artist_id(&self, artist: &Entry) -> Option<String> {
        if let Some(id) = &artist.remote_id {
            return Some(id.clone());
        }
        match self.catalog.artist_id_by_name(&artist.display_name).await {
            Ok(Some(id)) => {
                debug!(artist = %artist.display_name, id = %id, "backfilled artist id");
                Some(id)
            }
            Ok(None) => {
                warn!(artist = %artist.display_name, "no artist with that name");
                None
            }
            Err(e) => {
                warn!(artist = %artist.display_name, error = %e, "artist search failed");
                None
            }
        }
    }
}

/// Root listing the configured artists under their given names.
pub fn artist_list_root(list: &ArtistList, entity: SearchEntity) -> Directory {
    let mut root = Directory::new("/", DirectoryKind::ArtistList, entity);
    let link_count = DirectoryKind::Artist.initial_link_count();
    for artist in &list.artists {
        root.insert(
            Entry::directory(component_name(&artist.name), artist.name.clone(), link_count)
                .with_remote_id(Some(artist.id.clone())),
        );
    }
    root
}

/// Root with a single `artists` link into the alphabetic autocomplete
/// branch. `entity` only picks what the branch searches for.
pub fn autocomplete_root(entity: SearchEntity) -> Directory {
    let mut root = Directory::new("/", DirectoryKind::RootArtists, entity);
    let link_count = DirectoryKind::Letters { depth: 1 }.initial_link_count();
    root.insert(Entry::directory(AUTOCOMPLETE_LINK, AUTOCOMPLETE_LINK, link_count));
    root
}

/// `NN_-_title.ext`, normalized.
pub fn track_file_name(position: u32, title: &str, format: AudioFormat) -> String {
    normalize_name(&format!("{position:02}_-_{title}.{}", format.extension()))
}

fn fill_letters(dir: &mut Directory) {
    let link_count = child_link_count(dir);
    for letter in 'a'..='z' {
        let name = letter.to_string();
        dir.insert(Entry::directory(name.clone(), name, link_count));
    }
}

/// Initial link count for the children of `dir`.
fn child_link_count(dir: &Directory) -> u32 {
    dir.kind
        .child_kind(dir.search_entity)
        .map(DirectoryKind::initial_link_count)
        .unwrap_or(crate::namespace::BASE_LINKS)
}

/// The letters accumulated by the last three path components.
fn letter_prefix(path: &str) -> String {
    let mut letters: Vec<&str> = path
        .rsplit('/')
        .take(PREFIX_DEPTH as usize)
        .collect();
    letters.reverse();
    letters.concat()
}

fn starts_with_ignore_case(name: &str, prefix: &str) -> bool {
    name.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Tracks without a title or media reference cannot become files.
fn playable(track: TrackRecord) -> Option<(TrackRecord, String, String)> {
    let name = track.name.clone()?;
    let audio = track.audio.clone()?;
    Some((track, name, audio))
}
