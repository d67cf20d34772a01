use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::fs::File;

use crate::error::ServeError;
use crate::sandbox::listing::DirectoryListing;
#[cfg(unix)]
use crate::sandbox::beneath::{Opened, RootDir};

/// The stat result of a resolved path, scoped to the shared directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    /// Final path component ("." for the root itself)
    pub name: String,
    /// Size in bytes as reported by the filesystem
    pub size: u64,
    pub is_directory: bool,
    /// Raw mode bits; on unix this includes the file-type bits
    pub mode: u32,
}

impl ResolvedEntry {
    #[cfg(unix)]
    pub fn from_stat(name: impl Into<String>, stat: &nix::sys::stat::FileStat) -> Self {
        let mode = stat.st_mode as u32;
        Self {
            name: name.into(),
            size: u64::try_from(stat.st_size).unwrap_or(0),
            is_directory: mode & 0o170000 == 0o040000,
            mode,
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(name: impl Into<String>, meta: &std::fs::Metadata) -> Self {
        let kind = if meta.is_dir() {
            0o040000
        } else if meta.file_type().is_symlink() {
            0o120000
        } else {
            0o100000
        };
        let perm = match (meta.is_dir(), meta.permissions().readonly()) {
            (true, _) => 0o755,
            (false, true) => 0o444,
            (false, false) => 0o644,
        };
        Self {
            name: name.into(),
            size: meta.len(),
            is_directory: meta.is_dir(),
            mode: kind | perm,
        }
    }
}

/// What a target resolved to.
#[derive(Debug)]
pub enum Resolved {
    /// A regular file, already opened for streaming.
    File { entry: ResolvedEntry, file: File },
    /// A directory and its immediate children, read at resolution time.
    Directory {
        entry: ResolvedEntry,
        listing: DirectoryListing,
    },
}

/// Handle to the shared directory.
///
/// Created once at startup and cloned into every connection; clones share
/// one open directory descriptor. Lookups walk down from that descriptor a
/// component at a time, so nothing resolved through it can name a path
/// outside the directory, even if the tree is renamed or relinked meanwhile.
#[derive(Debug, Clone)]
pub struct SandboxRoot {
    path: Arc<PathBuf>,
    #[cfg(unix)]
    dir: Arc<RootDir>,
}

impl SandboxRoot {
    /// Opens `dir` as the shared directory.
    pub async fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let path = tokio::fs::canonicalize(dir)
            .await
            .with_context(|| format!("could not open directory {}", dir.display()))?;

        let meta = tokio::fs::metadata(&path)
            .await
            .with_context(|| format!("could not stat {}", path.display()))?;
        if !meta.is_dir() {
            anyhow::bail!("{} is not a directory", path.display());
        }

        Ok(Self {
            #[cfg(unix)]
            dir: Arc::new(
                RootDir::open(&path)
                    .with_context(|| format!("could not open directory {}", path.display()))?,
            ),
            path: Arc::new(path),
        })
    }

    /// Canonical path of the shared directory, as it was when opened.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves a normalized relative path (see [`normalize_target`]).
    ///
    /// Files come back opened; directories come back with their listing.
    /// Anything that cannot be opened or stat'ed, that is neither a regular
    /// file nor a directory, or that would land outside the root, is
    /// `ResourceNotFound`. So is a file whose name has control characters,
    /// since it could not be put in a header. A listing that cannot be read
    /// is `Internal`.
    pub async fn resolve(&self, relative: &str) -> Result<Resolved, ServeError> {
        let rel = validate_relative(relative)
            .ok_or_else(|| ServeError::ResourceNotFound(relative.to_string()))?;

        // Named as requested, so a symlink is served under the link's name.
        let name = rel
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());

        self.lookup(rel, name).await
    }

    #[cfg(unix)]
    async fn lookup(&self, rel: PathBuf, name: String) -> Result<Resolved, ServeError> {
        let dir = Arc::clone(&self.dir);
        let opened = tokio::task::spawn_blocking(move || dir.resolve(&rel, name))
            .await
            .map_err(|e| ServeError::Internal(std::io::Error::other(e)))??;

        Ok(match opened {
            Opened::File(entry, file) => Resolved::File {
                entry,
                file: File::from_std(file),
            },
            Opened::Directory(entry, listing) => Resolved::Directory { entry, listing },
        })
    }

    #[cfg(not(unix))]
    async fn lookup(&self, rel: PathBuf, name: String) -> Result<Resolved, ServeError> {
        let not_found = || ServeError::ResourceNotFound(rel.display().to_string());

        let full = tokio::fs::canonicalize(self.path.join(&rel))
            .await
            .map_err(|_| not_found())?;
        if !full.starts_with(self.path.as_path()) {
            return Err(not_found());
        }

        let meta = tokio::fs::metadata(&full).await.map_err(|_| not_found())?;
        if meta.is_dir() {
            let entry = ResolvedEntry::from_metadata(name, &meta);
            let listing = DirectoryListing::read(&full)
                .await
                .map_err(ServeError::Internal)?;
            return Ok(Resolved::Directory { entry, listing });
        }
        if !meta.is_file() || has_control_chars(&name) {
            return Err(not_found());
        }

        let file = File::open(&full).await.map_err(|_| not_found())?;
        let meta = file.metadata().await.map_err(|_| not_found())?;
        let entry = ResolvedEntry::from_metadata(name, &meta);

        Ok(Resolved::File { entry, file })
    }
}

pub(crate) fn has_control_chars(name: &str) -> bool {
    name.chars().any(char::is_control)
}

/// Turns a request target into the relative path handed to the resolver.
///
/// Strips one leading and one trailing `/`; an empty result names the root.
pub fn normalize_target(target: &str) -> &str {
    let path = target.strip_prefix('/').unwrap_or(target);
    let path = path.strip_suffix('/').unwrap_or(path);

    if path.is_empty() { "." } else { path }
}

/// Accepts `.` or `/`-separated segments that are each a single plain path
/// component. Empty, `.` and `..` segments are refused outright rather than
/// collapsed, as are segments the platform would read as a root or prefix.
fn validate_relative(relative: &str) -> Option<PathBuf> {
    if relative == "." {
        return Some(PathBuf::new());
    }

    let mut path = PathBuf::new();
    for segment in relative.split('/') {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == segment => path.push(part),
            _ => return None,
        }
    }

    Some(path)
}
