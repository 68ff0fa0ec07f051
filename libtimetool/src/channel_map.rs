// Discrete records arrive with numeric ids that are only assigned when the run is
// configured. The definitions sent at configure time carry both the id and the record
// name, so the map is rebuilt from names of the form <base name><suffix>:
// [TT01:SIGNAL_WF -> 3, TT01:SIDEBAND_WF -> 4, TT01:REFERENCE_WF -> 5]
// Mapping is additive: a new definition overwrites the id for its role, nothing is
// ever unmapped.
use fxhash::FxHashMap;

use super::constants::{REFERENCE_WF_SUFFIX, SIDEBAND_WF_SUFFIX, SIGNAL_WF_SUFFIX};
use super::payload::{Fragment, PvCtrlView};
use super::source_id::TypeId;

/// The waveforms the time tool can consume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Signal,
    Sideband,
    Reference,
}

impl ChannelRole {
    /// Lookup order when an id is mapped to several roles
    pub const ALL: [ChannelRole; 3] = [Self::Signal, Self::Sideband, Self::Reference];

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Signal => SIGNAL_WF_SUFFIX,
            Self::Sideband => SIDEBAND_WF_SUFFIX,
            Self::Reference => REFERENCE_WF_SUFFIX,
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.suffix() == suffix)
    }
}

/// What a configuration fragment meant to the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Detector configuration: the fit subsystem must be reinitialized
    Reconfigure,
    Mapped(ChannelRole, i16),
    Ignored,
}

/// ChannelResolver maps the symbolic waveform names to run-time record ids.
#[derive(Debug, Clone, Default)]
pub struct ChannelResolver {
    ids: FxHashMap<ChannelRole, i16>,
}

impl ChannelResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Examine a configuration fragment.
    ///
    /// Record definitions are only considered from the owned source `phy`, and only when
    /// the record name starts with `base_name`. Everything else is ignored.
    pub fn resolve(&mut self, fragment: &Fragment<'_>, base_name: &str, phy: u32) -> Resolution {
        match fragment.type_id {
            TypeId::Opal1kConfig => Resolution::Reconfigure,
            TypeId::Epics if fragment.src.phy == phy => {
                let pv = match PvCtrlView::parse(fragment.payload) {
                    Ok(pv) => pv,
                    Err(e) => {
                        spdlog::warn!("Skipping discrete record definition: {e}");
                        return Resolution::Ignored;
                    }
                };
                let role = pv
                    .name()
                    .strip_prefix(base_name)
                    .and_then(ChannelRole::from_suffix);
                match role {
                    Some(role) => {
                        self.ids.insert(role, pv.pv_id());
                        Resolution::Mapped(role, pv.pv_id())
                    }
                    None => Resolution::Ignored,
                }
            }
            _ => Resolution::Ignored,
        }
    }

    pub fn id(&self, role: ChannelRole) -> Option<i16> {
        self.ids.get(&role).copied()
    }

    /// Get the role of a record id, if it was mapped
    pub fn role_of(&self, pv_id: i16) -> Option<ChannelRole> {
        ChannelRole::ALL
            .into_iter()
            .find(|role| self.id(*role) == Some(pv_id))
    }
}
