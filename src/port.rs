//! The set of local interfaces, classified as access or trunk, plus the
//! bidirectional id/name map that lets the rest of the switch key off numeric
//! ids internally (Design Notes §9) while still reading config/link-layer
//! names at the boundary.

use std::collections::HashMap;

use crate::config::ParsedConfig;
use crate::error::SwitchError;

/// Exactly one of access (untagged, single VLAN) or trunk (tagged, multi-VLAN,
/// gated by STP). Interfaces present at the link layer but absent from config
/// are classified `Unmanaged` and are never forwarded to or from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Access(u16),
    Trunk,
    Unmanaged,
}

struct Interface {
    name: String,
    kind: PortKind,
}

/// Immutable once built. Maps interface numeric ids (assigned by the link
/// layer) to names and port kinds.
pub struct PortRegistry {
    by_id: Vec<Interface>,
    name_to_id: HashMap<String, u32>,
}

impl PortRegistry {
    /// Builds the registry from the link layer's enumerated interface names
    /// (indexed by id, 0..N-1) and the parsed config file.
    pub fn build(interface_names: &[String], config: &ParsedConfig) -> Result<Self, SwitchError> {
        let mut by_id = Vec::with_capacity(interface_names.len());
        let mut name_to_id = HashMap::with_capacity(interface_names.len());

        for (id, name) in interface_names.iter().enumerate() {
            if name_to_id.insert(name.clone(), id as u32).is_some() {
                return Err(SwitchError::ConfigParse(format!(
                    "link layer reported duplicate interface name {name}"
                )));
            }
            let kind = config.ports.get(name).copied().unwrap_or(PortKind::Unmanaged);
            by_id.push(Interface {
                name: name.clone(),
                kind,
            });
        }

        for name in config.ports.keys() {
            if !name_to_id.contains_key(name) {
                return Err(SwitchError::ConfigParse(format!(
                    "config names interface {name}, which the link layer did not enumerate"
                )));
            }
        }

        Ok(Self { by_id, name_to_id })
    }

    /// Iterates all numeric interface ids known to the registry.
    pub fn interfaces(&self) -> impl Iterator<Item = u32> + '_ {
        0..self.by_id.len() as u32
    }

    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.by_id.get(id as usize).map(|i| i.name.as_str())
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(name).copied()
    }

    pub fn kind_of_id(&self, id: u32) -> Option<PortKind> {
        self.by_id.get(id as usize).map(|i| i.kind)
    }

    pub fn kind_of(&self, name: &str) -> Option<PortKind> {
        self.id_of(name).and_then(|id| self.kind_of_id(id))
    }

    /// Iterates the names of all trunk interfaces (used by the STP engine).
    pub fn trunk_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_id
            .iter()
            .filter(|i| matches!(i.kind, PortKind::Trunk))
            .map(|i| i.name.as_str())
    }

    /// Iterates the numeric ids of all trunk interfaces.
    pub fn trunk_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_id
            .iter()
            .enumerate()
            .filter(|(_, i)| matches!(i.kind, PortKind::Trunk))
            .map(|(id, _)| id as u32)
    }
}
