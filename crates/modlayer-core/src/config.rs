use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::component::{validate_component_name, Component};

pub const DEFAULT_MANAGER_COMPONENT: &str = "ModlayerManager";

/// Contents of `modlayer.toml` at the management install root.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    pub app_name: String,
    pub spec_url: String,
    #[serde(default = "default_manager_component")]
    pub manager_component: String,
    #[serde(default)]
    pub manager_archive_subtree: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl ManagerConfig {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(input).context("failed to parse modlayer config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("invalid config: {}", path.display()))
    }

    /// The self-update component, described the same way as overlay
    /// components.
    pub fn manager(&self) -> Component {
        Component::new(
            self.manager_component.clone(),
            self.manager_archive_subtree.as_deref(),
        )
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(anyhow!("app_name must not be empty"));
        }
        if self.spec_url.trim().is_empty() {
            return Err(anyhow!("spec_url must not be empty"));
        }
        validate_component_name(&self.manager_component)
            .context("invalid manager_component")?;
        if self.components.is_empty() {
            return Err(anyhow!("at least one [[components]] entry is required"));
        }

        let mut seen = HashSet::new();
        for component in &self.components {
            validate_component_name(&component.name)?;
            if component.name == self.manager_component {
                return Err(anyhow!(
                    "component '{}' collides with the manager component",
                    component.name
                ));
            }
            if !seen.insert(component.name.as_str()) {
                return Err(anyhow!("duplicate component '{}'", component.name));
            }
        }
        Ok(())
    }
}

fn default_manager_component() -> String {
    DEFAULT_MANAGER_COMPONENT.to_string()
}
