//! jamfs - mount a remote music catalog as a read-only filesystem.
//!
//! Usage:
//!   # Artists from ~/.config/jamfs/artists.json
//!   JAMFS_CLIENT_ID=... jamfs /mnt/music
//!
//!   # Browse the whole catalog by three-letter prefix
//!   JAMFS_CLIENT_ID=... jamfs /mnt/music --mode full --entity albums
//!
//! FUSE support is behind the `fuse` feature.

mod inodes;
mod logging;

#[cfg(feature = "fuse")]
mod fuse;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use jamfs_kernel::config::{DEBUG_ENV, is_truthy};
use jamfs_kernel::{ArtistList, CatalogFs, FsConfig, MountMode, SearchEntity};

/// Mount a remote music catalog as a read-only filesystem.
#[derive(Parser, Debug)]
#[command(name = "jamfs", version)]
#[command(about = "Mount a remote music catalog as a read-only filesystem")]
struct Args {
    /// Directory to mount on
    mountpoint: PathBuf,

    /// Root layout: `config` lists configured artists, `full` browses by prefix
    #[arg(long, default_value = "config")]
    mode: MountMode,

    /// Catalog entity the prefix branch searches (artists, albums, tracks, tags)
    #[arg(long, default_value = "artists", value_parser = parse_entity)]
    entity: SearchEntity,

    /// Artist list file (default: <config dir>/jamfs/artists.json)
    #[arg(long)]
    artists: Option<PathBuf>,

    /// Catalog API base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Concurrent media probes while listing tracks
    #[arg(long)]
    probe_concurrency: Option<usize>,

    /// Debug logging, also written to a file in the temp directory
    #[arg(short, long)]
    debug: bool,

    /// Let other users access the mount
    #[arg(long)]
    allow_other: bool,
}

fn parse_entity(s: &str) -> Result<SearchEntity, String> {
    SearchEntity::from_str(s).ok_or_else(|| format!("unknown entity: {s}"))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let debug = args.debug
        || std::env::var(DEBUG_ENV)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
    let _log_guard = logging::init(debug);

    match run(args, debug) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args, debug: bool) -> Result<()> {
    let mut config = FsConfig::from_env()?;
    config.mode = args.mode;
    config.search_entity = args.entity;
    config.debug = debug;
    if let Some(api_base) = args.api_base {
        config.api_base = api_base;
    }
    if let Some(n) = args.probe_concurrency {
        config.probe_concurrency = n;
    }

    let artists = match config.mode {
        MountMode::Config => {
            let path = match args.artists {
                Some(path) => path,
                None => ArtistList::default_path()?,
            };
            let list = ArtistList::load(&path)?;
            info!(path = %path.display(), artists = list.len(), "loaded artist list");
            Some(list)
        }
        MountMode::Full => None,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("jamfs-worker")
        .build()
        .context("failed to start runtime")?;

    let fs = Arc::new(CatalogFs::from_config(&config, artists.as_ref())?);
    let result = mount(fs.clone(), runtime.handle().clone(), &args.mountpoint, args.allow_other);
    fs.shutdown();
    result
}

#[cfg(feature = "fuse")]
fn mount(
    fs: Arc<CatalogFs>,
    runtime: tokio::runtime::Handle,
    mountpoint: &Path,
    allow_other: bool,
) -> Result<()> {
    fuse::mount(fs, runtime, mountpoint, allow_other)
        .with_context(|| format!("mount {}", mountpoint.display()))
}

#[cfg(not(feature = "fuse"))]
fn mount(
    _fs: Arc<CatalogFs>,
    _runtime: tokio::runtime::Handle,
    _mountpoint: &Path,
    _allow_other: bool,
) -> Result<()> {
    anyhow::bail!("fuse support disabled; rebuild jamfs with --features fuse")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["jamfs", "/mnt/music"]).unwrap();
        assert_eq!(args.mountpoint, PathBuf::from("/mnt/music"));
        assert_eq!(args.mode, MountMode::Config);
        assert_eq!(args.entity, SearchEntity::Artists);
        assert!(!args.debug);
    }

    #[test]
    fn test_args_full_mode() {
        let args = Args::try_parse_from([
            "jamfs",
            "/mnt/music",
            "--mode",
            "full",
            "--entity",
            "album",
            "--api-base",
            "http://localhost:8080",
        ])
        .unwrap();
        assert_eq!(args.mode, MountMode::Full);
        assert_eq!(args.entity, SearchEntity::Albums);
        assert_eq!(args.api_base.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_args_reject_unknown_entity() {
        assert!(Args::try_parse_from(["jamfs", "/mnt", "--entity", "playlists"]).is_err());
        assert!(Args::try_parse_from(["jamfs", "/mnt", "--mode", "partial"]).is_err());
    }
}
