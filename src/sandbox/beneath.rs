//! Blocking lookups relative to the open root directory.
//!
//! Every component is opened with `openat` against the descriptor of its
//! parent, never by path, so renaming or swapping directories inside the
//! share cannot redirect a lookup that is already under way. Symlinks are
//! followed by hand and only while they stay beneath the root.

use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf};

use nix::dir::Dir;
use nix::errno::Errno;
use nix::fcntl::{AtFlags, OFlag, openat, readlinkat};
use nix::sys::stat::{FileStat, Mode, fstat, fstatat};

use crate::error::ServeError;
use crate::sandbox::listing::DirectoryListing;
use crate::sandbox::resolver::{ResolvedEntry, has_control_chars};

/// Same limit the kernel applies to a single path walk.
const MAX_SYMLINK_HOPS: usize = 40;

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;
const S_IFLNK: u32 = 0o120000;

/// What a lookup opened.
pub(crate) enum Opened {
    File(ResolvedEntry, File),
    Directory(ResolvedEntry, DirectoryListing),
}

/// Descriptor of the shared directory.
#[derive(Debug)]
pub(crate) struct RootDir {
    fd: OwnedFd,
}

impl RootDir {
    pub(crate) fn open(path: &Path) -> std::io::Result<Self> {
        let fd = nix::fcntl::open(
            path,
            OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_CLOEXEC,
            Mode::empty(),
        )?;
        Ok(Self { fd: owned(fd) })
    }

    /// Opens `rel` (already validated: plain segments only) beneath the root.
    ///
    /// Only regular files and directories are served; anything else, and any
    /// symlink that would climb out of the root, is `ResourceNotFound`.
    pub(crate) fn resolve(&self, rel: &Path, name: String) -> Result<Opened, ServeError> {
        let not_found = |_: std::io::Error| ServeError::ResourceNotFound(rel.display().to_string());

        let fd = self.walk(rel).map_err(not_found)?;
        let stat = fstat(fd.as_raw_fd()).map_err(|e| not_found(e.into()))?;
        let entry = ResolvedEntry::from_stat(name, &stat);

        match mode_of(&stat) & S_IFMT {
            S_IFDIR => {
                let listing = read_listing(fd).map_err(ServeError::Internal)?;
                Ok(Opened::Directory(entry, listing))
            }
            S_IFREG if !has_control_chars(&entry.name) => Ok(Opened::File(entry, File::from(fd))),
            _ => Err(not_found(Errno::ENOENT.into())),
        }
    }

    fn walk(&self, rel: &Path) -> std::io::Result<OwnedFd> {
        let mut pending: VecDeque<OsString> =
            rel.iter().map(|segment| segment.to_os_string()).collect();
        // Directories opened so far below the root; the last one is the cwd of the walk.
        let mut parents: Vec<OwnedFd> = Vec::new();
        let mut hops = 0;

        if pending.is_empty() {
            return Ok(owned(openat(
                Some(self.fd.as_raw_fd()),
                ".",
                OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_CLOEXEC,
                Mode::empty(),
            )?));
        }

        while let Some(segment) = pending.pop_front() {
            if segment == ".." {
                if parents.pop().is_none() {
                    return Err(escapes());
                }
                if pending.is_empty() {
                    return self.reopen_cwd(&parents);
                }
                continue;
            }
            if segment == "." || segment.is_empty() {
                if pending.is_empty() {
                    return self.reopen_cwd(&parents);
                }
                continue;
            }

            let cwd = parents.last().map_or(self.fd.as_raw_fd(), |fd| fd.as_raw_fd());
            let stat = fstatat(Some(cwd), segment.as_os_str(), AtFlags::AT_SYMLINK_NOFOLLOW)?;

            match mode_of(&stat) & S_IFMT {
                S_IFLNK => {
                    hops += 1;
                    if hops > MAX_SYMLINK_HOPS {
                        return Err(Errno::ELOOP.into());
                    }
                    let target = PathBuf::from(readlinkat(Some(cwd), segment.as_os_str())?);
                    for component in target.components().rev() {
                        match component {
                            Component::Normal(part) => pending.push_front(part.to_os_string()),
                            Component::ParentDir => pending.push_front(OsString::from("..")),
                            Component::CurDir => pending.push_front(OsString::from(".")),
                            Component::RootDir | Component::Prefix(_) => return Err(escapes()),
                        }
                    }
                }
                S_IFDIR | S_IFREG => {
                    let is_last = pending.is_empty();
                    if !is_last && mode_of(&stat) & S_IFMT != S_IFDIR {
                        return Err(Errno::ENOTDIR.into());
                    }
                    // O_NOFOLLOW guards against a swap to a symlink since the stat;
                    // O_NONBLOCK against a swap to a FIFO.
                    let fd = owned(openat(
                        Some(cwd),
                        segment.as_os_str(),
                        OFlag::O_RDONLY | OFlag::O_NOFOLLOW | OFlag::O_NONBLOCK | OFlag::O_CLOEXEC,
                        Mode::empty(),
                    )?);
                    if is_last {
                        clear_nonblocking(&fd)?;
                        return Ok(fd);
                    }
                    parents.push(fd);
                }
                // FIFOs, sockets and devices are never opened.
                _ => return Err(Errno::ENOENT.into()),
            }
        }

        // Only reachable when a symlink expanded to nothing.
        self.reopen_cwd(&parents)
    }

    fn reopen_cwd(&self, parents: &[OwnedFd]) -> std::io::Result<OwnedFd> {
        let cwd = parents.last().map_or(self.fd.as_raw_fd(), |fd| fd.as_raw_fd());
        Ok(owned(openat(
            Some(cwd),
            ".",
            OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_CLOEXEC,
            Mode::empty(),
        )?))
    }
}

fn read_listing(fd: OwnedFd) -> std::io::Result<DirectoryListing> {
    let mut dir = Dir::from(fd)?;
    let dir_fd = dir.as_raw_fd();
    let mut entries = Vec::new();

    for child in dir.iter() {
        let child = child?;
        let name = OsStr::from_bytes(child.file_name().to_bytes());
        if name == "." || name == ".." {
            continue;
        }
        let stat = fstatat(Some(dir_fd), name, AtFlags::AT_SYMLINK_NOFOLLOW)?;
        entries.push(ResolvedEntry::from_stat(name.to_string_lossy(), &stat));
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(DirectoryListing { entries })
}

fn clear_nonblocking(fd: &OwnedFd) -> std::io::Result<()> {
    use nix::fcntl::{FcntlArg, fcntl};

    let flags = OFlag::from_bits_truncate(fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)?);
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(flags - OFlag::O_NONBLOCK))?;
    Ok(())
}

fn mode_of(stat: &FileStat) -> u32 {
    stat.st_mode as u32
}

fn escapes() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "path leaves the shared directory")
}

fn owned(fd: RawFd) -> OwnedFd {
    // SAFETY: `fd` was just returned by a successful open and is owned by nobody else.
    unsafe { OwnedFd::from_raw_fd(fd) }
}
