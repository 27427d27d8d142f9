//! # jamfs-kernel
//!
//! A remote music catalog exposed as a lazily discovered, read-only tree:
//!
//! ```text
//! /<artist>/<album>/<format>/<NN_-_title.ext>
//! ```
//!
//! Nothing is fetched up front. Each directory is populated from the
//! catalog the first time a filesystem operation touches it, then cached
//! for the life of the process. Track contents are streamed with ranged
//! requests against the media URL resolved when the track was listed.
//!
//! - [`namespace`] - cache of discovered directories
//! - [`resolve`] - the discovery state machine
//! - [`catalog`] - catalog API client
//! - [`locator`] - header-only media probes
//! - [`stream`] - ranged reads over per-thread connections
//! - [`vfs`] - the path-based operations a host binding calls

pub mod catalog;
pub mod config;
pub mod locator;
pub mod namespace;
pub mod resolve;
pub mod stream;
pub mod vfs;

pub use catalog::{
    AlbumRecord, AudioFormat, Catalog, CatalogClient, SearchEntity, TrackRecord, UpstreamError,
    UpstreamResult,
};
pub use config::{ArtistList, ConfigError, ConfiguredArtist, FsConfig, MountMode};
pub use locator::{AudioLocator, HttpLocator, MediaInfo};
pub use namespace::{Directory, DirectoryKind, Entry, NamespaceCache};
pub use resolve::{FileOp, Resolver};
pub use stream::{ConnectionPool, HttpRangeFetch, RangeFetch, StreamReader};
pub use vfs::{CatalogBackend, DirEntry, FileAttr, FileType, StatFs, VfsError, VfsOps, VfsResult};

/// The mounted filesystem.
pub type CatalogFs = CatalogBackend;
