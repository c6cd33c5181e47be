use std::fs::{self, File};
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::Path;

use modlayer_core::Component;

use crate::error::{IoResultExt, OverlayError, Result};
use crate::fs_utils::{ensure_parent_dir, move_file_or_copy, remove_file_if_exists};
use crate::reporter::{OverlayEvent, Reporter};
use crate::scan::{scan_archive, ArchiveEntry};

const COMPARE_CHUNK_SIZE: usize = 8 * 1024;

/// Applies and reverts one component's archive on top of an install target.
///
/// Files the install would overwrite with different content are copied to
/// `backup_dir` first; uninstall moves them back, or deletes files the
/// install added. Files that no longer match the archive are left alone.
pub struct Overlay<'a> {
    component: &'a Component,
    target_dir: &'a Path,
    backup_dir: &'a Path,
    reporter: &'a dyn Reporter,
}

impl<'a> Overlay<'a> {
    pub fn new(
        component: &'a Component,
        target_dir: &'a Path,
        backup_dir: &'a Path,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            component,
            target_dir,
            backup_dir,
            reporter,
        }
    }

    pub fn backup_overlapping(&self, archive: Option<&Path>) -> Result<()> {
        scan_archive(archive, self.component.subtree(), |mut entry| {
            if entry.is_dir {
                return Ok(());
            }
            let existing = self.target_dir.join(entry.relative_path);
            if !existing.is_file() {
                return Ok(());
            }

            let backup = self.backup_dir.join(entry.relative_path);
            if backup_entry_with(&existing, &backup, &mut entry, copy_file)? {
                self.report(OverlayEvent::BackedUp {
                    path: entry.relative_path.to_path_buf(),
                });
            }
            Ok(())
        })
    }

    pub fn copy_into_place(&self, archive: Option<&Path>) -> Result<()> {
        extract_archive_subtree(archive, self.component.subtree(), self.target_dir)
    }

    /// Reverts the overlay. Safe to repeat and safe to run when nothing was
    /// installed.
    pub fn check_uninstall(&self, archive: Option<&Path>) -> Result<()> {
        scan_archive(archive, self.component.subtree(), |mut entry| {
            if entry.is_dir {
                return Ok(());
            }
            let backup = self.backup_dir.join(entry.relative_path);
            let destination = self.target_dir.join(entry.relative_path);
            let has_backup = backup.is_file();
            let has_destination = destination.exists();
            if !has_backup && !has_destination {
                return Ok(());
            }

            if has_destination {
                let matches = destination.is_file()
                    && file_matches_entry(&destination, &mut entry).io_context(|| {
                        format!("failed to compare {}", destination.display())
                    })?;
                if !matches {
                    self.report(OverlayEvent::DriftPreserved {
                        path: entry.relative_path.to_path_buf(),
                    });
                    return Ok(());
                }
            }

            if has_backup {
                move_file_or_copy(&backup, &destination).io_context(|| {
                    format!(
                        "failed to restore {} from {}",
                        destination.display(),
                        backup.display()
                    )
                })?;
                self.report(OverlayEvent::Restored {
                    path: entry.relative_path.to_path_buf(),
                });
            } else {
                fs::remove_file(&destination)
                    .io_context(|| format!("failed to remove {}", destination.display()))?;
                self.report(OverlayEvent::Removed {
                    path: entry.relative_path.to_path_buf(),
                });
            }
            Ok(())
        })
    }

    fn report(&self, event: OverlayEvent) {
        self.reporter.report(&self.component.name, &event);
    }
}

/// Writes every entry below `subtree` into `destination`, overwriting
/// existing files.
pub fn extract_archive_subtree(
    archive: Option<&Path>,
    subtree: Option<&str>,
    destination: &Path,
) -> Result<()> {
    scan_archive(archive, subtree, |mut entry| {
        let path = destination.join(entry.relative_path);
        if entry.is_dir {
            return fs::create_dir_all(&path)
                .io_context(|| format!("failed to create {}", path.display()));
        }

        ensure_parent_dir(&path)
            .io_context(|| format!("failed to create parent of {}", path.display()))?;
        let mut file =
            File::create(&path).io_context(|| format!("failed to create {}", path.display()))?;
        io::copy(entry.reader(), &mut file)
            .io_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    })
}

/// True when every file entry below `subtree` exists in `dir` with identical
/// bytes.
pub fn directory_matches_archive(
    archive: &Path,
    subtree: Option<&str>,
    dir: &Path,
) -> Result<bool> {
    let mut matches = true;
    scan_archive(Some(archive), subtree, |mut entry| {
        if !matches || entry.is_dir {
            return Ok(());
        }
        let path = dir.join(entry.relative_path);
        if !path.is_file() {
            matches = false;
            return Ok(());
        }
        matches = file_matches_entry(&path, &mut entry)
            .io_context(|| format!("failed to compare {}", path.display()))?;
        Ok(())
    })?;
    Ok(matches)
}

/// Copies `existing` to `backup` unless it already matches `entry`. Returns
/// whether a backup was written; on failure nothing is left at `backup`.
pub(crate) fn backup_entry_with<C>(
    existing: &Path,
    backup: &Path,
    entry: &mut ArchiveEntry<'_>,
    copy: C,
) -> Result<bool>
where
    C: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let result = file_matches_entry(existing, entry).and_then(|matches| {
        if matches {
            return Ok(false);
        }
        ensure_parent_dir(backup)?;
        copy(existing, backup)?;
        Ok(true)
    });

    result.map_err(|source| {
        let _ = remove_file_if_exists(backup);
        OverlayError::BackupFailed {
            path: existing.to_path_buf(),
            source,
        }
    })
}

fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

fn file_matches_entry(path: &Path, entry: &mut ArchiveEntry<'_>) -> io::Result<bool> {
    let metadata = fs::metadata(path)?;
    if metadata.len() != entry.size {
        return Ok(false);
    }
    let mut file = BufReader::new(File::open(path)?);
    streams_equal(&mut file, entry.reader())
}

/// Chunked byte comparison; both streams must end at the same offset.
pub fn streams_equal<L, R>(left: &mut L, right: &mut R) -> io::Result<bool>
where
    L: Read + ?Sized,
    R: Read + ?Sized,
{
    let mut left_buf = vec![0_u8; COMPARE_CHUNK_SIZE];
    let mut right_buf = vec![0_u8; COMPARE_CHUNK_SIZE];

    loop {
        let left_len = read_chunk(left, &mut left_buf)?;
        let right_len = read_chunk(right, &mut right_buf)?;
        if left_len != right_len {
            return Ok(false);
        }
        if left_len == 0 {
            return Ok(true);
        }
        if left_buf[..left_len] != right_buf[..right_len] {
            return Ok(false);
        }
    }
}

/// Fills `buf` unless the stream ends first; a short chunk therefore only
/// ever happens at end of stream.
fn read_chunk<T: Read + ?Sized>(reader: &mut T, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
