use std::fmt;

use crate::sandbox::resolver::{ResolvedEntry, has_control_chars};

/// The immediate children of a directory, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub entries: Vec<ResolvedEntry>,
}

impl DirectoryListing {
    /// Reads every immediate child of `dir`.
    ///
    /// Child metadata is taken without following symlinks, so a link shows up
    /// as a link even when its target lies outside the shared directory.
    #[cfg(not(unix))]
    pub async fn read(dir: &std::path::Path) -> std::io::Result<Self> {
        let mut read_dir = tokio::fs::read_dir(dir).await?;
        let mut entries = Vec::new();

        while let Some(child) = read_dir.next_entry().await? {
            let meta = child.metadata().await?;
            let name = child.file_name().to_string_lossy().into_owned();
            entries.push(ResolvedEntry::from_metadata(name, &meta));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One listing line: `ls`-style mode, size, then the name (`/`-suffixed for directories).
///
/// Control characters in the name are escaped, so every entry stays on one line.
impl fmt::Display for ResolvedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = if self.is_directory { "/" } else { "" };
        write!(f, "{} {:>10} ", mode_string(self.mode), self.size)?;
        if has_control_chars(&self.name) {
            write!(f, "{}{}", self.name.escape_debug(), suffix)
        } else {
            write!(f, "{}{}", self.name, suffix)
        }
    }
}

/// Renders mode bits the way `ls -l` does, e.g. `drwxr-xr-x`.
pub fn mode_string(mode: u32) -> String {
    let kind = match mode & 0o170000 {
        0o040000 => 'd',
        0o120000 => 'l',
        0o100000 => '-',
        0o020000 => 'c',
        0o060000 => 'b',
        0o010000 => 'p',
        0o140000 => 's',
        _ => '?',
    };

    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}
