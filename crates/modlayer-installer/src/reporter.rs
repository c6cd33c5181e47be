use std::path::PathBuf;

/// Progress and decisions emitted while managing a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    CleanedStaleDownload { path: PathBuf },
    CheckingForUpdate,
    NoArchiveInSpec,
    ArchiveUpToDate { archive: String },
    DownloadingArchive { url: String, destination: PathBuf },
    ArchiveSwapped { archive: PathBuf },
    Uninstalling,
    Uninstalled,
    Installing,
    Installed,
    NothingToInstall,
    BackedUp { path: PathBuf },
    Restored { path: PathBuf },
    Removed { path: PathBuf },
    DriftPreserved { path: PathBuf },
    ManagerVerified,
    ManagerNotVerified { reason: String },
    RemovedPreviousInstall { path: PathBuf },
    RestartRequested { params_path: PathBuf },
}

impl OverlayEvent {
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::DriftPreserved { .. } | Self::ManagerNotVerified { .. } | Self::NothingToInstall
        )
    }
}

/// Sink for [`OverlayEvent`]s.
pub trait Reporter {
    fn report(&self, component: &str, event: &OverlayEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _component: &str, _event: &OverlayEvent) {}
}
