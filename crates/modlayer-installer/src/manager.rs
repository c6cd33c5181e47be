use std::fs;
use std::path::Path;

use modlayer_core::{ArchiveSpec, Component};

use crate::archive_store::{current_archive, current_archive_name, install_staged_archive};
use crate::error::{IoResultExt, OverlayError, Result};
use crate::fs_utils::{recreate_dir_empty, remove_dir_all_if_exists, remove_file_if_exists, touch_file};
use crate::overlay::{directory_matches_archive, extract_archive_subtree};
use crate::reporter::{OverlayEvent, Reporter};
use crate::updater::ArchiveFetcher;
use crate::ManagerLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerUpdateMode {
    No,
    Yes,
    CheckInstallOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerOutcome {
    Skipped,
    NoArchiveAvailable,
    Verified,
    NotVerified,
    /// A new manager build is staged in `New`; the caller must exit and let
    /// the launcher swap it in and relaunch with `residual_args`.
    RestartRequested { residual_args: Vec<String> },
}

/// Self-update flow for the manager's own component.
pub struct ManagerUpdater<'a> {
    layout: &'a ManagerLayout,
    component: &'a Component,
    spec: &'a ArchiveSpec,
    fetcher: &'a dyn ArchiveFetcher,
    reporter: &'a dyn Reporter,
}

impl<'a> ManagerUpdater<'a> {
    pub fn new(
        layout: &'a ManagerLayout,
        component: &'a Component,
        spec: &'a ArchiveSpec,
        fetcher: &'a dyn ArchiveFetcher,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            layout,
            component,
            spec,
            fetcher,
            reporter,
        }
    }

    pub fn perform(
        &self,
        mode: ManagerUpdateMode,
        residual_args: Vec<String>,
    ) -> Result<ManagerOutcome> {
        match mode {
            ManagerUpdateMode::No => Ok(ManagerOutcome::Skipped),
            ManagerUpdateMode::Yes => self.check_update(residual_args),
            ManagerUpdateMode::CheckInstallOnly => self.check_current_install(),
        }
    }

    /// Verifies that `Current` matches the slot archive, creating the
    /// installed-flag on success.
    pub fn verify_current_install(&self) -> Result<bool> {
        let flag = self.layout.manager_installed_flag_path(self.name());
        if flag.is_file() {
            return Ok(true);
        }

        let Some(archive) = current_archive(self.layout, self.name())? else {
            self.report(OverlayEvent::ManagerNotVerified {
                reason: "no current archive".to_string(),
            });
            return Ok(false);
        };

        let current_dir = self.layout.manager_current_dir(self.name());
        if !directory_matches_archive(&archive, self.component.subtree(), &current_dir)? {
            self.report(OverlayEvent::ManagerNotVerified {
                reason: "current install does not match current archive".to_string(),
            });
            return Ok(false);
        }

        touch_file(&flag).io_context(|| format!("failed to create {}", flag.display()))?;
        Ok(true)
    }

    fn check_update(&self, residual_args: Vec<String>) -> Result<ManagerOutcome> {
        self.report(OverlayEvent::CheckingForUpdate);

        let file_name = self
            .spec
            .archive_file_name(self.name())
            .map_err(|err| OverlayError::InvariantViolated(format!("{err:#}")))?;
        let (Some(file_name), Some(url)) = (file_name, self.spec.archive_url(self.name())) else {
            self.report(OverlayEvent::NoArchiveInSpec);
            return Ok(ManagerOutcome::NoArchiveAvailable);
        };

        let current = current_archive(self.layout, self.name())?;
        if current_archive_name(current.as_deref()).as_deref() == Some(file_name.as_str()) {
            self.verify_current_install()?;
        } else {
            self.download_new_archive(&file_name, url)?;
        }

        let flag = self.layout.manager_installed_flag_path(self.name());
        if !flag.is_file() {
            if let Some(archive) = current_archive(self.layout, self.name())? {
                return self.stage_new_install(&archive, residual_args);
            }
        }

        self.report(OverlayEvent::ManagerVerified);
        Ok(ManagerOutcome::Verified)
    }

    fn check_current_install(&self) -> Result<ManagerOutcome> {
        if !self.verify_current_install()? {
            return Ok(ManagerOutcome::NotVerified);
        }
        self.remove_previous_install_dir()?;
        self.report(OverlayEvent::ManagerVerified);
        Ok(ManagerOutcome::Verified)
    }

    fn download_new_archive(&self, file_name: &str, url: String) -> Result<()> {
        let staged_dir = self.layout.staged_archive_dir(self.name());
        recreate_dir_empty(&staged_dir)
            .io_context(|| format!("failed to create {}", staged_dir.display()))?;
        let staged = staged_dir.join(file_name);

        self.report(OverlayEvent::DownloadingArchive {
            url: url.clone(),
            destination: staged.clone(),
        });
        self.fetcher
            .download(&url, &staged)
            .map_err(|source| OverlayError::DownloadFailed {
                url,
                source: source.into(),
            })?;

        let flag = self.layout.manager_installed_flag_path(self.name());
        remove_file_if_exists(&flag).io_context(|| format!("failed to remove {}", flag.display()))?;
        let swapped = install_staged_archive(self.layout, self.name(), &staged)?;
        self.report(OverlayEvent::ArchiveSwapped { archive: swapped });
        Ok(())
    }

    /// Extracts the archive into `New` and records the arguments to relaunch
    /// with.
    fn stage_new_install(
        &self,
        archive: &Path,
        residual_args: Vec<String>,
    ) -> Result<ManagerOutcome> {
        let new_dir = self.layout.manager_new_dir(self.name());
        let new_temp_dir = self.layout.manager_new_temp_dir(self.name());
        remove_dir_all_if_exists(&new_dir)
            .io_context(|| format!("failed to remove {}", new_dir.display()))?;
        recreate_dir_empty(&new_temp_dir)
            .io_context(|| format!("failed to create {}", new_temp_dir.display()))?;

        extract_archive_subtree(Some(archive), self.component.subtree(), &new_temp_dir)?;
        fs::rename(&new_temp_dir, &new_dir).io_context(|| {
            format!(
                "failed to move {} to {}",
                new_temp_dir.display(),
                new_dir.display()
            )
        })?;

        self.remove_previous_install_dir()?;

        let params_path = self.layout.recall_params_path(self.name());
        let mut params = residual_args.join("\n");
        params.push('\n');
        fs::write(&params_path, params)
            .io_context(|| format!("failed to write {}", params_path.display()))?;

        self.report(OverlayEvent::RestartRequested { params_path });
        Ok(ManagerOutcome::RestartRequested { residual_args })
    }

    fn remove_previous_install_dir(&self) -> Result<()> {
        let old_dir = self.layout.manager_old_dir(self.name());
        if old_dir.exists() {
            remove_dir_all_if_exists(&old_dir)
                .io_context(|| format!("failed to remove {}", old_dir.display()))?;
            self.report(OverlayEvent::RemovedPreviousInstall { path: old_dir });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.component.name
    }

    fn report(&self, event: OverlayEvent) {
        self.reporter.report(self.name(), &event);
    }
}

/// Drops every occurrence of `flag` (with its value) from `args` and appends
/// `flag value`, so a relaunch does not repeat the self-update.
pub fn residual_args(args: &[String], flag: &str, value: &str) -> Vec<String> {
    let inline_prefix = format!("{flag}=");
    let mut residual = Vec::with_capacity(args.len() + 2);
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            iter.next();
            continue;
        }
        if arg.starts_with(&inline_prefix) {
            continue;
        }
        residual.push(arg.clone());
    }
    residual.push(flag.to_string());
    residual.push(value.to_string());
    residual
}
