use std::path::{Path, PathBuf};

/// On-disk layout below the management install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerLayout {
    root: PathBuf,
}

impl ManagerLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("modlayer.toml")
    }

    pub fn components_dir(&self) -> PathBuf {
        self.root.join("Components")
    }

    pub fn component_dir(&self, name: &str) -> PathBuf {
        self.components_dir().join(name)
    }

    /// Archive slot: holds at most one archive file.
    pub fn archive_slot_dir(&self, name: &str) -> PathBuf {
        self.component_dir(name).join("Archive")
    }

    pub fn staged_archive_dir(&self, name: &str) -> PathBuf {
        self.component_dir(name).join("Archive-New")
    }

    pub fn installed_flag_path(&self, name: &str) -> PathBuf {
        self.component_dir(name).join("Component-Installed")
    }

    pub fn orig_files_dir(&self, name: &str) -> PathBuf {
        self.component_dir(name).join("OrigFiles")
    }

    pub fn manager_current_dir(&self, name: &str) -> PathBuf {
        self.component_dir(name).join("Current")
    }

    pub fn manager_new_dir(&self, name: &str) -> PathBuf {
        self.component_dir(name).join("New")
    }

    pub fn manager_new_temp_dir(&self, name: &str) -> PathBuf {
        self.component_dir(name).join("New.Temp")
    }

    pub fn manager_old_dir(&self, name: &str) -> PathBuf {
        self.component_dir(name).join("Old")
    }

    pub fn manager_installed_flag_path(&self, name: &str) -> PathBuf {
        self.component_dir(name).join("Archive-Installed")
    }

    pub fn recall_params_path(&self, name: &str) -> PathBuf {
        self.component_dir(name).join("Recall.Params")
    }
}

/// Relative location of the running manager below the install root.
pub fn manager_run_dir_suffix(manager_component: &str) -> PathBuf {
    Path::new("Components").join(manager_component).join("Current")
}
