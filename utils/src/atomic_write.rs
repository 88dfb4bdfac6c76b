//! Crash-safe file writes: the bytes go to a synced temp file in the target
//! directory, which is then renamed into place. Readers see either the old
//! file or the complete new one.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Permissions of the written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// 0o600 on Unix. Transcripts and session snapshots.
    #[default]
    Private,
    /// Whatever the umask gives. Files the user asked to export.
    Inherit,
}

/// Create `path`, failing with [`io::ErrorKind::AlreadyExists`] rather than
/// replacing an existing file. The parent directory is synced afterwards so
/// the new entry survives a crash.
pub fn atomic_create(path: impl AsRef<Path>, bytes: &[u8], visibility: Visibility) -> io::Result<()> {
    let path = path.as_ref();
    let parent = parent_dir(path);
    staged(parent, bytes, visibility)?
        .persist_noclobber(path)
        .map_err(|err| err.error)?;
    sync_dir(parent);
    Ok(())
}

/// Write `path`, replacing it if present.
pub fn atomic_replace(path: impl AsRef<Path>, bytes: &[u8], visibility: Visibility) -> io::Result<()> {
    let path = path.as_ref();
    staged(parent_dir(path), bytes, visibility)?
        .persist(path)
        .map_err(|err| err.error)?;
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn staged(dir: &Path, bytes: &[u8], visibility: Visibility) -> io::Result<NamedTempFile> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    #[cfg(unix)]
    if visibility == Visibility::Private {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = visibility;

    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(path = %dir.display(), "Directory sync failed: {e}");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
