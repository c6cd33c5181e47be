use anyhow::anyhow;
use serde::Deserialize;

/// One independently installable overlay package.
///
/// When `archive_subtree` is set, only entries below that archive directory
/// are applied to the install target and everything else in the archive is
/// ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Hash)]
#[serde(deny_unknown_fields)]
pub struct Component {
    pub name: String,
    #[serde(default)]
    pub archive_subtree: Option<String>,
}

impl Component {
    pub fn new(name: impl Into<String>, archive_subtree: Option<&str>) -> Self {
        Self {
            name: name.into(),
            archive_subtree: archive_subtree.map(str::to_string),
        }
    }

    /// Subtree filter with surrounding separators removed; `None` when the
    /// whole archive root is the payload.
    pub fn subtree(&self) -> Option<&str> {
        self.archive_subtree
            .as_deref()
            .map(|value| value.trim().trim_matches(|ch| ch == '/' || ch == '\\'))
            .filter(|value| !value.is_empty())
    }
}

/// Component names become directory names under the management root.
pub fn validate_component_name(name: &str) -> anyhow::Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("component name must not be empty"));
    }
    if trimmed != name {
        return Err(anyhow!(
            "component name must not have surrounding whitespace: '{name}'"
        ));
    }
    if name == "." || name == ".." {
        return Err(anyhow!("component name must not be '{name}'"));
    }
    if name.contains(['/', '\\', ':']) {
        return Err(anyhow!(
            "component name must not contain path separators: {name}"
        ));
    }
    Ok(())
}
