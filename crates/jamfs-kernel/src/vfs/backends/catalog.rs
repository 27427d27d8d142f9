//! Catalog-backed filesystem backend.
//!
//! Every path goes through the [`Resolver`]; file contents are streamed
//! from the media URL the locator resolved when the track was listed.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, instrument};

use crate::catalog::CatalogClient;
use crate::config::{ArtistList, FsConfig, MountMode};
use crate::locator::HttpLocator;
use crate::namespace::name::{basename, canonical};
use crate::resolve::{FileOp, Resolver, artist_list_root, autocomplete_root};
use crate::stream::StreamReader;
use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::ops::VfsOps;
use crate::vfs::types::{DirEntry, FileAttr, StatFs};

/// Read-only view of the remote catalog.
#[derive(Debug)]
pub struct CatalogBackend {
    resolver: Resolver,
    reader: StreamReader,
    /// Times reported by entries without a release date.
    mounted_at: SystemTime,
}

impl CatalogBackend {
    /// Backend over an already rooted resolver.
    pub fn new(resolver: Resolver, reader: StreamReader) -> Self {
        Self {
            resolver,
            reader,
            mounted_at: SystemTime::now(),
        }
    }

    /// HTTP-backed filesystem for `config`.
    ///
    /// Config mode roots the tree at `artists`, which it then requires.
    pub fn from_config(config: &FsConfig, artists: Option<&ArtistList>) -> VfsResult<Self> {
        let root = match (config.mode, artists) {
            (MountMode::Config, Some(list)) => artist_list_root(list, config.search_entity),
            (MountMode::Config, None) => {
                return Err(VfsError::other("config mode needs an artist list"));
            }
            (MountMode::Full, _) => autocomplete_root(config.search_entity),
        };

        let catalog = Arc::new(CatalogClient::new(config)?);
        let locator = Arc::new(HttpLocator::new(&config.user_agent)?);
        let resolver = Resolver::new(catalog, locator)
            .with_probe_concurrency(config.probe_concurrency);
        resolver.install_root(root)?;

        info!(mode = %config.mode, entity = %config.search_entity, "catalog filesystem ready");
        Ok(Self::new(resolver, StreamReader::http(config.user_agent.clone())))
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Release streaming connections. Returns how many were closed.
    pub fn shutdown(&self) -> usize {
        let released = self.reader.shutdown();
        info!(released, "released stream connections");
        released
    }

    fn canonical(path: &Path) -> VfsResult<String> {
        path.to_str()
            .and_then(canonical)
            .ok_or_else(|| VfsError::invalid_path(path.display().to_string()))
    }

    fn root_attr(&self) -> VfsResult<FileAttr> {
        let root = self
            .resolver
            .cache()
            .get("/")
            .ok_or_else(|| VfsError::not_found("/"))?;
        Ok(FileAttr::directory(root.link_count()).with_time(self.mounted_at))
    }
}

#[async_trait]
impl VfsOps for CatalogBackend {
    #[instrument(skip(self), fields(path = %path.display()), level = "debug")]
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let path = Self::canonical(path)?;
        if path == "/" {
            return self.root_attr();
        }

        let dir = self.resolver.resolve(&path, FileOp::Getattr).await?;
        dir.get(basename(&path))
            .map(|entry| entry.attr(self.mounted_at))
            .ok_or_else(|| VfsError::not_found(path.as_str()))
    }

    #[instrument(skip(self), fields(path = %path.display()), level = "debug")]
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let path = Self::canonical(path)?;
        let dir = self.resolver.resolve(&path, FileOp::Readdir).await?;

        let mut entries = Vec::with_capacity(dir.len() + 2);
        entries.push(DirEntry::directory("."));
        entries.push(DirEntry::directory(".."));
        entries.extend(dir.entries().map(|e| DirEntry::new(e.name.clone(), e.kind)));
        debug!(count = entries.len(), "listed directory");
        Ok(entries)
    }

    #[instrument(skip(self), fields(path = %path.display()), level = "debug")]
    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        let path = Self::canonical(path)?;
        if path == "/" {
            return Err(VfsError::is_a_directory(path));
        }

        let dir = self.resolver.resolve(&path, FileOp::Read).await?;
        let entry = dir
            .get(basename(&path))
            .ok_or_else(|| VfsError::not_found(path.as_str()))?;
        if entry.is_dir() {
            return Err(VfsError::is_a_directory(path));
        }
        let url = entry
            .media_url
            .as_deref()
            .ok_or_else(|| VfsError::not_found(path.as_str()))?;

        let data = self.reader.read(url, entry.size, offset, size).await?;
        Ok(data.to_vec())
    }

    fn read_only(&self) -> bool {
        true
    }

    async fn statfs(&self) -> VfsResult<StatFs> {
        Ok(StatFs::default())
    }
}
