use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use zip::ZipArchive;

use crate::error::{IoResultExt, OverlayError, Result};

/// One archive entry as seen by a scan visitor.
pub struct ArchiveEntry<'a> {
    pub relative_path: &'a Path,
    pub is_dir: bool,
    /// Uncompressed size recorded in the archive.
    pub size: u64,
    reader: &'a mut dyn Read,
}

impl<'a> ArchiveEntry<'a> {
    pub fn reader(&mut self) -> &mut (dyn Read + 'a) {
        &mut *self.reader
    }
}

/// Visits the entries of `archive_path` in archive order.
///
/// A missing archive is a silent no-op. With a `subtree`, only entries below
/// `subtree/` are visited and the prefix is stripped; the subtree root entry
/// itself is skipped. Any visitor error aborts the scan.
pub fn scan_archive<F>(archive_path: Option<&Path>, subtree: Option<&str>, mut visit: F) -> Result<()>
where
    F: FnMut(ArchiveEntry<'_>) -> Result<()>,
{
    let Some(archive_path) = archive_path else {
        return Ok(());
    };
    if !archive_path.is_file() {
        return Ok(());
    }

    let file = File::open(archive_path)
        .io_context(|| format!("failed to open archive {}", archive_path.display()))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|source| OverlayError::Archive {
            path: archive_path.to_path_buf(),
            source,
        })?;

    let subtree = subtree.map(|value| value.replace('\\', "/"));
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|source| OverlayError::Archive {
                path: archive_path.to_path_buf(),
                source,
            })?;

        let name = entry.name().replace('\\', "/");
        let is_dir = name.ends_with('/');
        let Some(residual) = strip_subtree(&name, subtree.as_deref()) else {
            continue;
        };
        let residual = residual.trim_end_matches('/');
        if residual.is_empty() {
            continue;
        }

        let relative_path = validated_entry_path(residual)?;
        let size = entry.size();
        visit(ArchiveEntry {
            relative_path: &relative_path,
            is_dir,
            size,
            reader: &mut entry,
        })?;
    }

    Ok(())
}

fn strip_subtree<'a>(name: &'a str, subtree: Option<&str>) -> Option<&'a str> {
    let Some(subtree) = subtree else {
        return Some(name);
    };
    let head = name.get(..subtree.len())?;
    if !head.eq_ignore_ascii_case(subtree) {
        return None;
    }
    name[subtree.len()..].strip_prefix('/')
}

fn validated_entry_path(residual: &str) -> Result<PathBuf> {
    let relative = Path::new(residual);
    let mut out = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return Err(OverlayError::UnsafeEntryPath(residual.to_string())),
        }
    }
    if out.as_os_str().is_empty() {
        return Err(OverlayError::UnsafeEntryPath(residual.to_string()));
    }
    Ok(out)
}
