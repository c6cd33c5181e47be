mod component;
mod config;
mod spec;
mod state;

pub use component::{validate_component_name, Component};
pub use config::{ManagerConfig, DEFAULT_MANAGER_COMPONENT};
pub use spec::ArchiveSpec;
pub use state::ComponentState;
