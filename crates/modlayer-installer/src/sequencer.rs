use std::path::Path;

use modlayer_core::{ArchiveSpec, Component, ComponentState};

use crate::error::Result;
use crate::reporter::Reporter;
use crate::updater::{ArchiveFetcher, ComponentOutcome, ComponentUpdater};
use crate::ManagerLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRun {
    pub name: String,
    pub outcome: ComponentOutcome,
}

/// Runs the component state machine across an ordered component list.
pub struct Sequencer<'a> {
    layout: &'a ManagerLayout,
    spec: &'a ArchiveSpec,
    target_dir: &'a Path,
    fetcher: &'a dyn ArchiveFetcher,
    reporter: &'a dyn Reporter,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        layout: &'a ManagerLayout,
        spec: &'a ArchiveSpec,
        target_dir: &'a Path,
        fetcher: &'a dyn ArchiveFetcher,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            layout,
            spec,
            target_dir,
            fetcher,
            reporter,
        }
    }

    pub fn updater<'c>(&'c self, component: &'c Component) -> ComponentUpdater<'c> {
        ComponentUpdater::new(
            self.layout,
            component,
            self.spec,
            self.target_dir,
            self.fetcher,
            self.reporter,
        )
    }

    /// Stops at the first failing component; components already processed
    /// keep their new state.
    pub fn run(
        &self,
        components: &[Component],
        check_download: bool,
        requested: ComponentState,
    ) -> Result<Vec<ComponentRun>> {
        let mut runs = Vec::with_capacity(components.len());
        for component in sequence_order(components, requested) {
            let outcome = self
                .updater(component)
                .check_implement_installed_state(check_download, requested)?;
            runs.push(ComponentRun {
                name: component.name.clone(),
                outcome,
            });
        }
        Ok(runs)
    }

    /// Uninstalls every component in reverse layering order and empties
    /// their archive slots.
    pub fn purge(&self, components: &[Component]) -> Result<Vec<ComponentRun>> {
        let mut runs = Vec::with_capacity(components.len());
        for component in sequence_order(components, ComponentState::Uninstalled) {
            let outcome = self.updater(component).uninstall_and_purge()?;
            runs.push(ComponentRun {
                name: component.name.clone(),
                outcome,
            });
        }
        Ok(runs)
    }
}

/// Layering order for installs; reversed for uninstalls so dependents are
/// removed before the components they sit on.
pub fn sequence_order(components: &[Component], requested: ComponentState) -> Vec<&Component> {
    let mut ordered = components.iter().collect::<Vec<_>>();
    if requested == ComponentState::Uninstalled {
        ordered.reverse();
    }
    ordered
}
