mod archive_store;
mod error;
mod fs_utils;
mod layout;
mod manager;
mod overlay;
mod reporter;
mod scan;
mod sequencer;
mod updater;

pub use archive_store::{clear_archive_slot, current_archive, install_staged_archive};
pub use error::{OverlayError, Result};
pub use layout::{manager_run_dir_suffix, ManagerLayout};
pub use manager::{residual_args, ManagerOutcome, ManagerUpdateMode, ManagerUpdater};
pub use overlay::{directory_matches_archive, extract_archive_subtree, streams_equal, Overlay};
pub use reporter::{NullReporter, OverlayEvent, Reporter};
pub use scan::{scan_archive, ArchiveEntry};
pub use sequencer::{sequence_order, ComponentRun, Sequencer};
pub use updater::{ArchiveFetcher, ComponentOutcome, ComponentUpdater, TransitionPlan};
