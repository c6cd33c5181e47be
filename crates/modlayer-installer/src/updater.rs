use std::path::{Path, PathBuf};

use modlayer_core::{ArchiveSpec, Component, ComponentState};

use crate::archive_store::{
    clear_archive_slot, current_archive, current_archive_name, install_staged_archive,
};
use crate::error::{IoResultExt, OverlayError, Result};
use crate::fs_utils::{recreate_dir_empty, remove_dir_all_if_exists, remove_file_if_exists, touch_file};
use crate::overlay::Overlay;
use crate::reporter::{OverlayEvent, Reporter};
use crate::ManagerLayout;

/// Blocking archive download used when the spec names a newer archive.
pub trait ArchiveFetcher {
    fn download(&self, url: &str, destination: &Path) -> anyhow::Result<()>;
}

/// Actions derived from observed state, target state and whether a new
/// archive was just downloaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionPlan {
    pub reinstall: bool,
    pub uninstall: bool,
    pub install: bool,
}

impl TransitionPlan {
    pub fn derive(
        current: ComponentState,
        target: ComponentState,
        new_archive_downloaded: bool,
    ) -> Self {
        let reinstall = new_archive_downloaded
            && current == ComponentState::Installed
            && target == ComponentState::Installed;
        let uninstall = reinstall
            || (target == ComponentState::Uninstalled && current == ComponentState::Installed);
        let install = reinstall
            || (target == ComponentState::Installed && current == ComponentState::Uninstalled);
        Self {
            reinstall,
            uninstall,
            install,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentOutcome {
    NoOp,
    Applied {
        previous: ComponentState,
        current: ComponentState,
        plan: TransitionPlan,
        archive_swapped: bool,
    },
    Purged {
        previous: ComponentState,
    },
}

/// Install/uninstall state machine for one overlay component.
pub struct ComponentUpdater<'a> {
    layout: &'a ManagerLayout,
    component: &'a Component,
    spec: &'a ArchiveSpec,
    target_dir: &'a Path,
    fetcher: &'a dyn ArchiveFetcher,
    reporter: &'a dyn Reporter,
}

impl<'a> ComponentUpdater<'a> {
    pub fn new(
        layout: &'a ManagerLayout,
        component: &'a Component,
        spec: &'a ArchiveSpec,
        target_dir: &'a Path,
        fetcher: &'a dyn ArchiveFetcher,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            layout,
            component,
            spec,
            target_dir,
            fetcher,
            reporter,
        }
    }

    /// Observed state: installed iff the slot holds an archive and the
    /// installed-flag is present.
    pub fn current_state(&self) -> Result<ComponentState> {
        let archive = current_archive(self.layout, self.name())?;
        Ok(self.state_for(archive.as_deref()))
    }

    pub fn check_implement_installed_state(
        &self,
        check_download: bool,
        requested: ComponentState,
    ) -> Result<ComponentOutcome> {
        if !check_download && requested == ComponentState::Maintain {
            return Ok(ComponentOutcome::NoOp);
        }

        self.preparatory_clean()?;

        let mut archive = current_archive(self.layout, self.name())?;
        let staged = if check_download {
            self.check_download_update(archive.as_deref())?
        } else {
            None
        };

        let previous = self.state_for(archive.as_deref());
        let target = requested.resolve_target(previous);
        let plan = TransitionPlan::derive(previous, target, staged.is_some());

        if plan.uninstall {
            self.uninstall(archive.as_deref())?;
        }

        let archive_swapped = staged.is_some();
        if let Some(staged) = staged {
            if previous == ComponentState::Uninstalled {
                // A flag without an applied archive is stale.
                self.remove_installed_flag()?;
            }
            let swapped = install_staged_archive(self.layout, self.name(), &staged)?;
            self.report(OverlayEvent::ArchiveSwapped {
                archive: swapped.clone(),
            });
            archive = Some(swapped);
        }

        if plan.install {
            self.install(archive.as_deref())?;
        }

        Ok(ComponentOutcome::Applied {
            previous,
            current: self.current_state()?,
            plan,
            archive_swapped,
        })
    }

    /// Uninstalls if needed and empties the archive slot.
    pub fn uninstall_and_purge(&self) -> Result<ComponentOutcome> {
        self.preparatory_clean()?;

        let archive = current_archive(self.layout, self.name())?;
        let previous = self.state_for(archive.as_deref());
        if previous == ComponentState::Installed {
            self.uninstall(archive.as_deref())?;
        }
        self.remove_installed_flag()?;
        clear_archive_slot(self.layout, self.name())?;

        Ok(ComponentOutcome::Purged { previous })
    }

    fn name(&self) -> &str {
        &self.component.name
    }

    fn state_for(&self, archive: Option<&Path>) -> ComponentState {
        if archive.is_some() && self.layout.installed_flag_path(self.name()).is_file() {
            ComponentState::Installed
        } else {
            ComponentState::Uninstalled
        }
    }

    fn overlay<'b>(&'b self, backup_dir: &'b Path) -> Overlay<'b> {
        Overlay::new(self.component, self.target_dir, backup_dir, self.reporter)
    }

    fn preparatory_clean(&self) -> Result<()> {
        let staged_dir = self.layout.staged_archive_dir(self.name());
        if staged_dir.exists() {
            remove_dir_all_if_exists(&staged_dir)
                .io_context(|| format!("failed to remove {}", staged_dir.display()))?;
            self.report(OverlayEvent::CleanedStaleDownload { path: staged_dir });
        }
        Ok(())
    }

    /// Downloads the spec's archive into the staging directory when it
    /// differs from the slot. Returns the staged file.
    fn check_download_update(&self, current: Option<&Path>) -> Result<Option<PathBuf>> {
        self.report(OverlayEvent::CheckingForUpdate);

        let file_name = self
            .spec
            .archive_file_name(self.name())
            .map_err(|err| OverlayError::InvariantViolated(format!("{err:#}")))?;
        let (Some(file_name), Some(url)) = (file_name, self.spec.archive_url(self.name())) else {
            self.report(OverlayEvent::NoArchiveInSpec);
            return Ok(None);
        };

        if current_archive_name(current).as_deref() == Some(file_name.as_str()) {
            self.report(OverlayEvent::ArchiveUpToDate { archive: file_name });
            return Ok(None);
        }

        let staged_dir = self.layout.staged_archive_dir(self.name());
        recreate_dir_empty(&staged_dir)
            .io_context(|| format!("failed to create {}", staged_dir.display()))?;
        let staged = staged_dir.join(&file_name);

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

        Ok(Some(staged))
    }

    fn uninstall(&self, archive: Option<&Path>) -> Result<()> {
        self.report(OverlayEvent::Uninstalling);

        let backup_dir = self.layout.orig_files_dir(self.name());
        self.overlay(&backup_dir).check_uninstall(archive)?;
        self.remove_installed_flag()?;
        remove_dir_all_if_exists(&backup_dir)
            .io_context(|| format!("failed to remove {}", backup_dir.display()))?;

        self.report(OverlayEvent::Uninstalled);
        Ok(())
    }

    fn install(&self, archive: Option<&Path>) -> Result<()> {
        let Some(archive) = archive else {
            self.report(OverlayEvent::NothingToInstall);
            return Ok(());
        };
        self.report(OverlayEvent::Installing);

        let backup_dir = self.layout.orig_files_dir(self.name());
        remove_dir_all_if_exists(&backup_dir)
            .io_context(|| format!("failed to remove stale backups {}", backup_dir.display()))?;

        let overlay = self.overlay(&backup_dir);
        overlay.backup_overlapping(Some(archive))?;
        overlay.copy_into_place(Some(archive))?;

        let flag = self.layout.installed_flag_path(self.name());
        touch_file(&flag).io_context(|| format!("failed to create {}", flag.display()))?;

        self.report(OverlayEvent::Installed);
        Ok(())
    }

    fn remove_installed_flag(&self) -> Result<()> {
        let flag = self.layout.installed_flag_path(self.name());
        remove_file_if_exists(&flag).io_context(|| format!("failed to remove {}", flag.display()))
    }

    fn report(&self, event: OverlayEvent) {
        self.reporter.report(self.name(), &event);
    }
}
