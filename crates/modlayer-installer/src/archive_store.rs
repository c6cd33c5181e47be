use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{IoResultExt, OverlayError, Result};
use crate::fs_utils::{move_file_or_copy, remove_dir_all_if_exists, remove_file_if_exists};
use crate::ManagerLayout;

/// Returns the single archive held in the component's slot, if any.
///
/// More than one file in the slot is a configuration error.
pub fn current_archive(layout: &ManagerLayout, name: &str) -> Result<Option<PathBuf>> {
    let slot = layout.archive_slot_dir(name);
    let entries = match fs::read_dir(&slot) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).io_context(|| format!("failed to read archive slot {}", slot.display()))
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.io_context(|| format!("failed to read archive slot {}", slot.display()))?;
        let file_type = entry
            .file_type()
            .io_context(|| format!("failed to stat {}", entry.path().display()))?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }

    if files.len() > 1 {
        files.sort();
        let names = files
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        return Err(OverlayError::InvariantViolated(format!(
            "archive slot for component '{name}' holds more than one file ({}): {}",
            names.join(", "),
            slot.display()
        )));
    }

    Ok(files.pop())
}

/// File name of the current archive, used to detect spec updates.
pub fn current_archive_name(archive: Option<&Path>) -> Option<String> {
    archive
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
}

/// Replaces the slot contents with a staged download and removes the
/// staging directory. Returns the archive's new location.
pub fn install_staged_archive(
    layout: &ManagerLayout,
    name: &str,
    staged: &Path,
) -> Result<PathBuf> {
    let file_name = staged.file_name().ok_or_else(|| {
        OverlayError::InvariantViolated(format!(
            "staged archive has no file name: {}",
            staged.display()
        ))
    })?;

    if let Some(previous) = current_archive(layout, name)? {
        fs::remove_file(&previous)
            .io_context(|| format!("failed to remove previous archive {}", previous.display()))?;
    }

    let destination = layout.archive_slot_dir(name).join(file_name);
    move_file_or_copy(staged, &destination).io_context(|| {
        format!(
            "failed to move {} into archive slot {}",
            staged.display(),
            destination.display()
        )
    })?;

    let staged_dir = layout.staged_archive_dir(name);
    remove_dir_all_if_exists(&staged_dir)
        .io_context(|| format!("failed to remove {}", staged_dir.display()))?;

    Ok(destination)
}

/// Empties the component's slot.
pub fn clear_archive_slot(layout: &ManagerLayout, name: &str) -> Result<()> {
    if let Some(archive) = current_archive(layout, name)? {
        remove_file_if_exists(&archive)
            .io_context(|| format!("failed to remove archive {}", archive.display()))?;
    }
    Ok(())
}
