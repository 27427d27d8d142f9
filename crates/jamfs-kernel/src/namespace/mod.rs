//! The discovered portion of the virtual tree.
//!
//! - [`NamespaceCache`] - absolute path → [`Directory`], the single source of truth
//! - [`Directory`] - one fully enumerated level, children in arrival order
//! - [`Entry`] - one named child, file or directory
//! - [`DirectoryKind`] - which discovery stage produced a directory

mod cache;
pub mod name;

pub use cache::NamespaceCache;

use chrono::NaiveDate;
use indexmap::IndexMap;
use std::time::SystemTime;

use crate::catalog::{AudioFormat, SearchEntity};
use crate::locator::MediaInfo;
use crate::vfs::{FileAttr, FileType, blocks_for};

/// `.` and `..`.
pub const BASE_LINKS: u32 = 2;

/// Depth of the single-letter fan-out before autocomplete kicks in.
pub const PREFIX_DEPTH: u8 = 3;

/// Discovery stage that produced a directory, which also fixes what its
/// children are and what visiting one of them materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryKind {
    /// Full-mode root: one link named after the search entity.
    RootArtists,
    /// Config-mode root: artists read from the local artist list.
    ArtistList,
    /// Single letters `a`-`z`, `depth` levels below the entity link.
    Letters { depth: u8 },
    /// Catalog names starting with the accumulated three-letter prefix.
    AutocompleteResult,
    /// Albums of one artist.
    Artist,
    /// The four audio formats of one album.
    Album,
    /// Tracks of one album in one format. Children are regular files.
    Format,
    /// Autocomplete match with nothing beneath it (tracks, tags).
    Leaf,
}

impl DirectoryKind {
    /// Kind materialized when a directory entry inside `self` is visited.
    pub fn child_kind(self, entity: SearchEntity) -> Option<DirectoryKind> {
        match self {
            DirectoryKind::RootArtists => Some(DirectoryKind::Letters { depth: 1 }),
            DirectoryKind::ArtistList => Some(DirectoryKind::Artist),
            DirectoryKind::Letters { depth } if depth < PREFIX_DEPTH => {
                Some(DirectoryKind::Letters { depth: depth + 1 })
            }
            DirectoryKind::Letters { .. } => Some(DirectoryKind::AutocompleteResult),
            DirectoryKind::AutocompleteResult => Some(match entity {
                SearchEntity::Artists => DirectoryKind::Artist,
                SearchEntity::Albums => DirectoryKind::Album,
                SearchEntity::Tracks | SearchEntity::Tags => DirectoryKind::Leaf,
            }),
            DirectoryKind::Artist => Some(DirectoryKind::Album),
            DirectoryKind::Album => Some(DirectoryKind::Format),
            DirectoryKind::Format | DirectoryKind::Leaf => None,
        }
    }

    /// Link count an entry gets at creation when it leads to a directory of
    /// this kind. Containers whose size is unknown start at the base and
    /// are patched after population.
    pub fn initial_link_count(self) -> u32 {
        match self {
            DirectoryKind::Letters { .. } => BASE_LINKS + 26,
            DirectoryKind::Album => BASE_LINKS + AudioFormat::ALL.len() as u32,
            _ => BASE_LINKS,
        }
    }

    /// Whether the owning entry's link count is only known once this
    /// directory has been populated.
    pub fn patches_link_count(self) -> bool {
        matches!(
            self,
            DirectoryKind::Letters { .. }
                | DirectoryKind::AutocompleteResult
                | DirectoryKind::Artist
        )
    }
}

/// One child of a [`Directory`].
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Filesystem-safe name, unique within the owning directory.
    pub name: String,
    /// Catalog name as received, used as a search key.
    pub display_name: String,
    pub kind: FileType,
    /// Directories only: `.`, `..` and one per subdirectory.
    pub link_count: u32,
    /// Files only.
    pub size: u64,
    /// Files only.
    pub blocks: u64,
    pub release_date: Option<NaiveDate>,
    /// Catalog id feeding the next query; absent for autocomplete artists.
    pub remote_id: Option<String>,
    pub media_url: Option<String>,
    pub media_format: Option<AudioFormat>,
    pub content_type: Option<String>,
}

impl Entry {
    /// A directory entry.
    pub fn directory(
        name: impl Into<String>,
        display_name: impl Into<String>,
        link_count: u32,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            kind: FileType::Directory,
            link_count,
            size: 0,
            blocks: 0,
            release_date: None,
            remote_id: None,
            media_url: None,
            media_format: None,
            content_type: None,
        }
    }

    /// A regular file backed by resolved media.
    pub fn track(
        name: impl Into<String>,
        display_name: impl Into<String>,
        format: AudioFormat,
        media: MediaInfo,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            kind: FileType::File,
            link_count: 1,
            size: media.size,
            blocks: blocks_for(media.size),
            release_date: None,
            remote_id: None,
            media_url: Some(media.url),
            media_format: Some(format),
            content_type: media.content_type,
        }
    }

    pub fn with_remote_id(mut self, id: Option<String>) -> Self {
        self.remote_id = id;
        self
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.media_format = Some(format);
        self
    }

    /// Parse and attach a `YYYY-MM-DD` release date; anything else is ignored.
    pub fn with_release_date(mut self, date: Option<&str>) -> Self {
        self.release_date = date.and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Release date at UTC midnight.
    pub fn release_time(&self) -> Option<SystemTime> {
        let midnight = self.release_date?.and_hms_opt(0, 0, 0)?;
        Some(SystemTime::from(midnight.and_utc()))
    }

    /// Attributes reported for this entry. Entries without a release date
    /// report `fallback` as their times.
    pub fn attr(&self, fallback: SystemTime) -> FileAttr {
        let attr = match self.kind {
            FileType::Directory => FileAttr::directory(self.link_count),
            FileType::File => {
                let mut attr = FileAttr::file(self.size);
                attr.blocks = self.blocks;
                attr
            }
        };
        attr.with_time(self.release_time().unwrap_or(fallback))
    }
}

/// One discovered level of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    /// Absolute virtual path, unique key in the cache.
    pub path: String,
    pub kind: DirectoryKind,
    /// Entity the autocomplete branch targets.
    pub search_entity: SearchEntity,
    children: IndexMap<String, Entry>,
}

impl Directory {
    pub fn new(path: impl Into<String>, kind: DirectoryKind, search_entity: SearchEntity) -> Self {
        Self {
            path: path.into(),
            kind,
            search_entity,
            children: IndexMap::new(),
        }
    }

    /// Add a child. A child with the same name is replaced in place.
    pub fn insert(&mut self, entry: Entry) {
        self.children.insert(entry.name.clone(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.children.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.children.get_mut(name)
    }

    /// Children in listing order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.children.values()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of directory children.
    pub fn subdir_count(&self) -> u32 {
        self.children.values().filter(|e| e.is_dir()).count() as u32
    }

    /// Link count of this directory now that its children are known.
    pub fn link_count(&self) -> u32 {
        BASE_LINKS + self.subdir_count()
    }
}
