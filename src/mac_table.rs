//! The MAC learning table: source MAC -> ingress interface id. No aging
//! (spec.md §3/§1 Non-goals); touched only by the forwarding thread, so no
//! synchronization is needed (spec.md §5).

use std::collections::HashMap;

use crate::mac::MacAddress;

#[derive(Default)]
pub struct MacTable {
    entries: HashMap<MacAddress, u32>,
}

impl MacTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditionally overwrites `src`'s entry with `ingress_id`.
    pub fn learn(&mut self, src: MacAddress, ingress_id: u32) {
        self.entries.insert(src, ingress_id);
    }

    /// Returns the interface id `dst` was last seen on, if any.
    pub fn lookup(&self, dst: &MacAddress) -> Option<u32> {
        self.entries.get(dst).copied()
    }
}
