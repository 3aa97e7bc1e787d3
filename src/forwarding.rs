//! The packet-dispatch loop: learns from every frame, routes BPDUs to the STP
//! engine, and otherwise selects egress candidates and applies the VLAN rule
//! table (spec.md §4.5). Design Notes §9: the VLAN rule table is applied by
//! one consolidated `emit` rather than the reference's three inlined copies.

use std::sync::Mutex;

use crate::frame::{self, BpduFrame, ByteSerializable};
use crate::link::LinkLayer;
use crate::mac;
use crate::mac_bpdu_addr;
use crate::mac_table::MacTable;
use crate::port::{PortKind, PortRegistry};
use crate::stp::{StpEngine, TrunkState};

/// Applies the VLAN rule table (spec.md §4.5) for one ingress/egress pair and
/// sends the (possibly retagged) frame, or drops it silently.
pub fn emit(
    link: &dyn LinkLayer,
    frame_bytes: &[u8],
    frame_vlan_id: Option<u16>,
    ingress_kind: PortKind,
    egress_id: u32,
    egress_kind: PortKind,
    egress_stp_state: Option<TrunkState>,
) {
    match (ingress_kind, egress_kind) {
        (PortKind::Access(vi), PortKind::Access(va)) => {
            if vi == va {
                link.send_to_link(egress_id, frame_bytes);
            }
        }
        (PortKind::Access(vi), PortKind::Trunk) => {
            if egress_stp_state == Some(TrunkState::Designated) {
                let tagged = frame::insert_vlan_tag(frame_bytes, vi);
                link.send_to_link(egress_id, &tagged);
            }
        }
        (PortKind::Trunk, PortKind::Access(va)) => {
            if frame_vlan_id == Some(va) {
                let untagged = frame::strip_vlan_tag(frame_bytes);
                link.send_to_link(egress_id, &untagged);
            }
        }
        (PortKind::Trunk, PortKind::Trunk) => {
            if egress_stp_state == Some(TrunkState::Designated) {
                link.send_to_link(egress_id, frame_bytes);
            }
        }
        _ => {
            // Unmanaged on either side: never forwarded to or from (spec.md §3).
        }
    }
}

/// Sends the current BPDU on every trunk, locking the STP state for the whole
/// step so the snapshot of bridge fields in the emitted BPDUs is consistent
/// (spec.md §5).
pub fn emit_bpdu_on_all_trunks(registry: &PortRegistry, stp: &Mutex<StpEngine>, link: &dyn LinkLayer) {
    let guard = stp.lock().unwrap();
    let bpdu = guard.current_bpdu(link.switch_mac());
    drop(guard);

    let bytes = bpdu.to_bytes();
    for id in registry.trunk_ids() {
        link.send_to_link(id, &bytes);
    }
}

/// The BPDU timer's one action per tick: emit on every trunk iff this switch
/// currently believes itself root, with the root check and the bridge-field
/// snapshot taken under one lock acquisition (spec.md §5).
pub fn emit_periodic_bpdu(registry: &PortRegistry, stp: &Mutex<StpEngine>, link: &dyn LinkLayer) {
    let guard = stp.lock().unwrap();
    if !guard.should_emit_periodic() {
        return;
    }
    let bpdu = guard.current_bpdu(link.switch_mac());
    drop(guard);

    let bytes = bpdu.to_bytes();
    for id in registry.trunk_ids() {
        link.send_to_link(id, &bytes);
    }
}

/// Processes one inbound frame end-to-end: learn, then either route to the
/// STP engine (BPDU) or select egress candidates and emit (data).
pub fn handle_frame(
    registry: &PortRegistry,
    mac_table: &mut MacTable,
    stp: &Mutex<StpEngine>,
    link: &dyn LinkLayer,
    ingress_id: u32,
    bytes: Vec<u8>,
) {
    let ingress_kind = match registry.kind_of_id(ingress_id) {
        Some(kind) => kind,
        None => {
            tracing::warn!(ingress_id, "frame on unregistered interface, dropping");
            return;
        }
    };

    if matches!(ingress_kind, PortKind::Unmanaged) {
        tracing::trace!(ingress_id, "frame on unmanaged interface, dropping");
        return;
    }

    let header = match frame::parse_header(&bytes) {
        Some(h) => h,
        None => {
            tracing::trace!(ingress_id, "malformed frame header, dropping");
            return;
        }
    };

    mac_table.learn(header.source, ingress_id);
    tracing::trace!(ingress_id, src = %mac::to_hex_string(&header.source), "learned source MAC");

    if header.destination == mac_bpdu_addr!() {
        handle_bpdu(registry, stp, link, ingress_id, &bytes);
        return;
    }

    if mac::is_unicast(&header.destination) {
        if let Some(known_id) = mac_table.lookup(&header.destination) {
            if known_id != ingress_id {
                if let Some(egress_kind) = registry.kind_of_id(known_id) {
                    let egress_stp_state = stp.lock().unwrap().trunk_state(known_id);
                    emit(
                        link,
                        &bytes,
                        header.vlan_id,
                        ingress_kind,
                        known_id,
                        egress_kind,
                        egress_stp_state,
                    );
                }
            }
            return;
        }
    }

    // Multicast, broadcast, or unknown unicast: flood to every other interface.
    tracing::trace!(
        ingress_id,
        dst = %mac::to_hex_string(&header.destination),
        "flooding: unknown unicast, multicast, or broadcast"
    );
    for egress_id in registry.interfaces() {
        if egress_id == ingress_id {
            continue;
        }
        let Some(egress_kind) = registry.kind_of_id(egress_id) else {
            continue;
        };
        let egress_stp_state = stp.lock().unwrap().trunk_state(egress_id);
        emit(
            link,
            &bytes,
            header.vlan_id,
            ingress_kind,
            egress_id,
            egress_kind,
            egress_stp_state,
        );
    }
}

fn handle_bpdu(registry: &PortRegistry, stp: &Mutex<StpEngine>, link: &dyn LinkLayer, ingress_id: u32, bytes: &[u8]) {
    let pkt: BpduFrame = match BpduFrame::from_bytes(bytes) {
        Ok(pkt) => pkt,
        Err(_) => {
            tracing::trace!(ingress_id, "malformed BPDU, dropping");
            return;
        }
    };

    let should_emit = {
        let mut guard = stp.lock().unwrap();
        guard.receive_bpdu(&pkt, ingress_id)
    };

    if should_emit {
        emit_bpdu_on_all_trunks(registry, stp, link);
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::mac::MacAddress;
    use crate::mac_addr;
    use std::sync::Mutex as StdMutex;

    struct RecordingLinkLayer {
        mac: MacAddress,
        names: Vec<String>,
        sent: StdMutex<Vec<(u32, Vec<u8>)>>,
    }

    impl RecordingLinkLayer {
        fn new(mac: MacAddress, names: Vec<&str>) -> Self {
            Self {
                mac,
                names: names.into_iter().map(String::from).collect(),
                sent: StdMutex::new(Vec::new()),
            }
        }

        fn sent_on(&self, id: u32) -> Vec<Vec<u8>> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(i, _)| *i == id)
                .map(|(_, d)| d.clone())
                .collect()
        }
    }

    impl LinkLayer for RecordingLinkLayer {
        fn interface_count(&self) -> u32 {
            self.names.len() as u32
        }

        fn recv_from_any_link(&self) -> (u32, Vec<u8>) {
            unimplemented!("not exercised directly in these tests")
        }

        fn send_to_link(&self, interface_id: u32, data: &[u8]) {
            self.sent.lock().unwrap().push((interface_id, data.to_vec()));
        }

        fn switch_mac(&self) -> MacAddress {
            self.mac
        }

        fn interface_name(&self, id: u32) -> String {
            self.names[id as usize].clone()
        }
    }

    fn eth_frame(dst: MacAddress, src: MacAddress, payload_len: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&dst);
        bytes.extend_from_slice(&src);
        bytes.extend_from_slice(&0x0800u16.to_be_bytes());
        bytes.extend(std::iter::repeat(0xAB).take(payload_len));
        bytes
    }

    fn two_access_one_trunk() -> (PortRegistry, RecordingLinkLayer) {
        let config = parse_config("1\nr-0 10\nr-1 10\nrr-0-1 x\n").unwrap();
        let names = vec!["r-0".to_string(), "r-1".to_string(), "rr-0-1".to_string()];
        let registry = PortRegistry::build(&names, &config).unwrap();
        let link = RecordingLinkLayer::new(mac_addr!(99), vec!["r-0", "r-1", "rr-0-1"]);
        (registry, link)
    }

    #[test]
    pub fn HandleFrame_UnknownUnicast_FloodsToAllButIngress() {
        let (registry, link) = two_access_one_trunk();
        let mut mac_table = MacTable::new();
        let stp = Mutex::new(StpEngine::new(1, registry.trunk_ids()));

        let frame = eth_frame(mac_addr!(2), mac_addr!(1), 32);
        handle_frame(&registry, &mut mac_table, &stp, &link, 0, frame.clone());

        assert!(link.sent_on(0).is_empty());
        assert_eq!(link.sent_on(1).len(), 1);
        assert_eq!(link.sent_on(2).len(), 1); // tagged onto the trunk
        assert_eq!(link.sent_on(2)[0].len(), frame.len() + 4);
    }

    #[test]
    pub fn HandleFrame_LearnedUnicast_ForwardsOnlyToLearnedPort() {
        let (registry, link) = two_access_one_trunk();
        let mut mac_table = MacTable::new();
        let stp = Mutex::new(StpEngine::new(1, registry.trunk_ids()));

        // First frame from r-1 teaches the table where mac_addr!(2) lives.
        handle_frame(
            &registry,
            &mut mac_table,
            &stp,
            &link,
            1,
            eth_frame(mac_addr!(1), mac_addr!(2), 10),
        );

        // Now a frame from r-0 addressed to mac_addr!(2) should go only to r-1.
        handle_frame(
            &registry,
            &mut mac_table,
            &stp,
            &link,
            0,
            eth_frame(mac_addr!(2), mac_addr!(1), 10),
        );

        assert_eq!(link.sent_on(1).len(), 1);
        assert!(link.sent_on(2).is_empty());
    }

    #[test]
    pub fn HandleFrame_VlanIsolation_DropsAtMismatchedAccessVlan() {
        let config = parse_config("1\nr-0 10\nr-1 20\n").unwrap();
        let names = vec!["r-0".to_string(), "r-1".to_string()];
        let registry = PortRegistry::build(&names, &config).unwrap();
        let link = RecordingLinkLayer::new(mac_addr!(99), vec!["r-0", "r-1"]);
        let mut mac_table = MacTable::new();
        let stp = Mutex::new(StpEngine::new(1, registry.trunk_ids()));

        handle_frame(
            &registry,
            &mut mac_table,
            &stp,
            &link,
            0,
            eth_frame(mac_addr!(2), mac_addr!(1), 10),
        );

        assert!(link.sent_on(1).is_empty());
    }

    #[test]
    pub fn HandleFrame_AccessToTrunk_InsertsTagWithIngressVlan() {
        let (registry, link) = two_access_one_trunk();
        let mut mac_table = MacTable::new();
        let stp = Mutex::new(StpEngine::new(1, registry.trunk_ids()));

        let frame = eth_frame(mac_addr!(2), mac_addr!(1), 20);
        handle_frame(&registry, &mut mac_table, &stp, &link, 0, frame.clone());

        let on_trunk = link.sent_on(2);
        assert_eq!(on_trunk.len(), 1);
        assert_eq!(on_trunk[0].len(), frame.len() + 4);
        let tci = u16::from_be_bytes([on_trunk[0][14], on_trunk[0][15]]);
        assert_eq!(tci & 0x0FFF, 10);
    }

    #[test]
    pub fn HandleFrame_TrunkToAccess_MatchingVlan_StripsTag() {
        let (registry, link) = two_access_one_trunk();
        let mut mac_table = MacTable::new();
        let stp = Mutex::new(StpEngine::new(1, registry.trunk_ids()));

        let untagged = eth_frame(mac_addr!(3), mac_addr!(1), 20);
        let tagged = frame::insert_vlan_tag(&untagged, 10);

        handle_frame(&registry, &mut mac_table, &stp, &link, 2, tagged.clone());

        let on_r0 = link.sent_on(0);
        let on_r1 = link.sent_on(1);
        assert_eq!(on_r0.len(), 1);
        assert_eq!(on_r0[0], untagged);
        assert_eq!(on_r1.len(), 1);
        assert_eq!(on_r1[0], untagged);
    }

    #[test]
    pub fn HandleFrame_TrunkToAccess_MismatchedVlan_Drops() {
        let (registry, link) = two_access_one_trunk();
        let mut mac_table = MacTable::new();
        let stp = Mutex::new(StpEngine::new(1, registry.trunk_ids()));

        let untagged = eth_frame(mac_addr!(4), mac_addr!(1), 20);
        let tagged = frame::insert_vlan_tag(&untagged, 20); // no access port on VLAN 20

        handle_frame(&registry, &mut mac_table, &stp, &link, 2, tagged);

        assert!(link.sent_on(0).is_empty());
        assert!(link.sent_on(1).is_empty());
    }

    #[test]
    pub fn HandleFrame_EgressTrunkBlocking_DropsDataFrame() {
        let config = parse_config("5\nr-0 10\nrr-0-1 x\nrr-0-2 x\n").unwrap();
        let names = vec!["r-0".to_string(), "rr-0-1".to_string(), "rr-0-2".to_string()];
        let registry = PortRegistry::build(&names, &config).unwrap();
        let link = RecordingLinkLayer::new(mac_addr!(99), vec!["r-0", "rr-0-1", "rr-0-2"]);
        let mut mac_table = MacTable::new();

        let mut stp = StpEngine::new(5, registry.trunk_ids());
        // Losing the root race on trunk 1 blocks every other trunk (trunk 2) per rule 1.
        stp.receive_bpdu(&BpduFrame::new(mac_addr!(50), 1, 50, 0), 1);
        assert_eq!(stp.trunk_state(1), Some(TrunkState::Designated));
        assert_eq!(stp.trunk_state(2), Some(TrunkState::Blocking));
        let stp = Mutex::new(stp);

        // Unknown destination floods to both trunks, but trunk 2 is Blocking.
        handle_frame(
            &registry,
            &mut mac_table,
            &stp,
            &link,
            0,
            eth_frame(mac_addr!(2), mac_addr!(1), 10),
        );

        assert_eq!(link.sent_on(1).len(), 1);
        assert!(link.sent_on(2).is_empty());
    }

    #[test]
    pub fn HandleFrame_BpduDestination_RoutesToStpNotForwarding() {
        let (registry, link) = two_access_one_trunk();
        let mut mac_table = MacTable::new();
        let stp = Mutex::new(StpEngine::new(5, registry.trunk_ids()));

        let bpdu = BpduFrame::new(mac_addr!(50), 1, 50, 0).to_bytes();
        handle_frame(&registry, &mut mac_table, &stp, &link, 2, bpdu);

        // Adopting a superior root re-emits a BPDU on every trunk (just the one here).
        assert_eq!(link.sent_on(2).len(), 1);
        assert_eq!(stp.lock().unwrap().root_bridge_id(), 1);
    }
}
