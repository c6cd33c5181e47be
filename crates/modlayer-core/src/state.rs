/// Requested or observed install state of a component.
///
/// `Maintain` is only ever requested; an observed state is always
/// `Installed` or `Uninstalled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ComponentState {
    #[default]
    Maintain,
    Installed,
    Uninstalled,
}

impl ComponentState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Maintain => "maintain",
            Self::Installed => "installed",
            Self::Uninstalled => "uninstalled",
        }
    }

    /// Resolves `Maintain` against the observed state.
    pub fn resolve_target(self, current: Self) -> Self {
        match self {
            Self::Maintain => current,
            other => other,
        }
    }
}
