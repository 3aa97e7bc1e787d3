//! Spanning-tree discipline: maintains bridge identity, the root port, and a
//! Blocking/Designated state per trunk, and decides when a BPDU reception
//! warrants re-emitting BPDUs immediately (spec.md §4.4).
//!
//! Grounded on `original_source/switch.py`'s `init_stp` and the BPDU-reception
//! `if/elif` chain -- this is deliberately simpler than the teacher's RSTP role
//! set (Root/Designated/Alternate/Backup): spec.md's state model only has two
//! port states, and its rule list has no segment-cost tiebreak machinery.

use std::collections::HashMap;

use crate::frame::BpduFrame;
use crate::mac::MacAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrunkState {
    Blocking,
    Designated,
}

pub struct StpEngine {
    own_bridge_id: u32,
    root_bridge_id: u32,
    root_path_cost: u32,
    root_port: Option<u32>,
    trunk_states: HashMap<u32, TrunkState>,
}

/// Fixed per-hop cost; spec.md §4.4 has no per-link override.
const HOP_COST: u32 = 10;

impl StpEngine {
    /// `own_bridge_id = root_bridge_id = priority`; every trunk starts
    /// Designated, since the switch always assumes itself the root at init.
    pub fn new(priority: u32, trunk_ids: impl IntoIterator<Item = u32>) -> Self {
        let trunk_states = trunk_ids
            .into_iter()
            .map(|id| (id, TrunkState::Designated))
            .collect();

        Self {
            own_bridge_id: priority,
            root_bridge_id: priority,
            root_path_cost: 0,
            root_port: None,
            trunk_states,
        }
    }

    pub fn own_bridge_id(&self) -> u32 {
        self.own_bridge_id
    }

    pub fn root_bridge_id(&self) -> u32 {
        self.root_bridge_id
    }

    pub fn root_path_cost(&self) -> u32 {
        self.root_path_cost
    }

    pub fn root_port(&self) -> Option<u32> {
        self.root_port
    }

    pub fn is_root(&self) -> bool {
        self.own_bridge_id == self.root_bridge_id
    }

    pub fn trunk_state(&self, id: u32) -> Option<TrunkState> {
        self.trunk_states.get(&id).copied()
    }

    /// The BPDU this switch would currently advertise.
    pub fn current_bpdu(&self, switch_mac: MacAddress) -> BpduFrame {
        BpduFrame::new(switch_mac, self.root_bridge_id, self.own_bridge_id, self.root_path_cost)
    }

    /// `true` iff the periodic timer should emit a BPDU on every trunk right now.
    pub fn should_emit_periodic(&self) -> bool {
        self.is_root()
    }

    /// Applies an inbound BPDU received on trunk `ingress_id`. Returns `true`
    /// if the caller must immediately re-emit a BPDU on every trunk (spec.md
    /// §4.4 rule 1's "immediately re-emit" clause -- the only rule that does).
    pub fn receive_bpdu(&mut self, pkt: &BpduFrame, ingress_id: u32) -> bool {
        let mut should_emit = false;

        if pkt.root_bridge_id < self.root_bridge_id {
            let first_loss_of_root = self.is_root();

            self.root_bridge_id = pkt.root_bridge_id;
            self.root_path_cost = pkt.root_path_cost + HOP_COST;
            self.root_port = Some(ingress_id);

            if first_loss_of_root {
                for (&id, state) in self.trunk_states.iter_mut() {
                    if id != ingress_id {
                        *state = TrunkState::Blocking;
                    }
                }
            }

            if let Some(state) = self.trunk_states.get_mut(&ingress_id) {
                if *state == TrunkState::Blocking {
                    *state = TrunkState::Designated;
                }
            }

            should_emit = true;
        } else if pkt.root_bridge_id == self.root_bridge_id {
            match self.root_port {
                None => {}
                Some(rp) if rp == ingress_id => {
                    let candidate_cost = pkt.root_path_cost + HOP_COST;
                    if candidate_cost < self.root_path_cost {
                        self.root_path_cost = candidate_cost;
                    }
                }
                Some(_) => {
                    if pkt.root_path_cost > self.root_path_cost {
                        if let Some(state) = self.trunk_states.get_mut(&ingress_id) {
                            *state = TrunkState::Designated;
                        }
                    }
                }
            }
        } else if pkt.own_bridge_id == self.own_bridge_id {
            // Hearing our own identity reflected back: a loop on this port.
            if let Some(state) = self.trunk_states.get_mut(&ingress_id) {
                *state = TrunkState::Blocking;
            }
        }
        // Otherwise: a worse root advertisement we've already superseded. Ignore.

        if self.is_root() {
            for state in self.trunk_states.values_mut() {
                *state = TrunkState::Designated;
            }
        }

        should_emit
    }
}
