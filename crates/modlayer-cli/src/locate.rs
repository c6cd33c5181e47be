use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use modlayer_installer::manager_run_dir_suffix;

pub(crate) const STEAM_PATH_ENV: &str = "MODLAYER_STEAM_PATH";

/// Install root from `--install-root`, or three levels above a working
/// directory shaped like `<root>/Components/<manager>/Current`.
pub(crate) fn resolve_install_root(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    if let Some(explicit) = explicit {
        return Ok(explicit.to_path_buf());
    }

    let is_current = cwd.file_name().is_some_and(|name| name == "Current");
    let components_dir = cwd.parent().and_then(Path::parent);
    let under_components = components_dir
        .and_then(Path::file_name)
        .is_some_and(|name| name == "Components");
    match components_dir.and_then(Path::parent) {
        Some(root) if is_current && under_components => Ok(root.to_path_buf()),
        _ => Err(anyhow!(
            "cannot determine install root from {}; run from Components/<manager>/Current or pass --install-root",
            cwd.display()
        )),
    }
}

/// Rejects a working directory that belongs to a different manager
/// component than the one configured.
pub(crate) fn ensure_manager_run_dir(cwd: &Path, manager_component: &str) -> Result<()> {
    let expected = manager_run_dir_suffix(manager_component);
    if cwd.ends_with(&expected) {
        return Ok(());
    }
    Err(anyhow!(
        "working directory {} does not match configured manager location {}",
        cwd.display(),
        expected.display()
    ))
}

/// Target application directory from `--app-dir`, or the first Steam
/// library holding `steamapps/common/<app_name>`.
pub(crate) fn resolve_app_dir(
    explicit: Option<&Path>,
    app_name: &str,
    steam_root_override: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(explicit) = explicit {
        if !explicit.is_dir() {
            return Err(anyhow!(
                "application directory does not exist: {}",
                explicit.display()
            ));
        }
        return Ok(explicit.to_path_buf());
    }

    let steam_roots = match steam_root_override {
        Some(root) => vec![root],
        None => default_steam_roots(),
    };
    for steam_root in &steam_roots {
        if let Some(app_dir) = find_app_in_steam(steam_root, app_name) {
            return Ok(app_dir);
        }
    }

    Err(anyhow!(
        "could not find '{app_name}' in any Steam library; pass --app-dir or set {STEAM_PATH_ENV}"
    ))
}

pub(crate) fn find_app_in_steam(steam_root: &Path, app_name: &str) -> Option<PathBuf> {
    let vdf_path = steam_root.join("steamapps").join("libraryfolders.vdf");
    let mut libraries = vec![steam_root.to_path_buf()];
    if let Ok(content) = fs::read_to_string(&vdf_path) {
        libraries.extend(parse_library_folders(&content));
    }

    libraries
        .into_iter()
        .map(|library| library.join("steamapps").join("common").join(app_name))
        .find(|candidate| candidate.is_dir())
}

/// Library paths from the `"path"` lines of a `libraryfolders.vdf`.
pub(crate) fn parse_library_folders(content: &str) -> Vec<PathBuf> {
    content
        .lines()
        .filter_map(|line| {
            let mut quoted = line.split('"').skip(1).step_by(2);
            let key = quoted.next()?;
            if !key.eq_ignore_ascii_case("path") {
                return None;
            }
            let value = quoted.next()?;
            Some(PathBuf::from(value.replace("\\\\", "\\")))
        })
        .collect()
}

fn default_steam_roots() -> Vec<PathBuf> {
    if cfg!(windows) {
        return vec![
            PathBuf::from(r"C:\Program Files (x86)\Steam"),
            PathBuf::from(r"C:\Program Files\Steam"),
        ];
    }

    let Some(home) = std::env::var_os("HOME").map(PathBuf::from) else {
        return Vec::new();
    };
    if cfg!(target_os = "macos") {
        vec![home.join("Library").join("Application Support").join("Steam")]
    } else {
        vec![
            home.join(".steam").join("steam"),
            home.join(".local").join("share").join("Steam"),
        ]
    }
}
