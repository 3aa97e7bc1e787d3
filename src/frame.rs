//! Ethernet II / 802.1Q frame parsing and construction, and the BPDU wire format.
//!
//! Mirrors the byte-offset contract in spec.md §4.1/§6 exactly: TPID 0x8200 (not
//! the IEEE 0x8100 -- see DESIGN.md Open Questions), three-u32 BPDU payload, dst-then-src
//! ordering everywhere.

use std::io;

use crate::mac::MacAddress;
use crate::mac_bpdu_addr;

/// The VLAN tag protocol id this system uses on the wire. Not the IEEE 802.1Q
/// value (0x8100); kept as-is for self-consistency with the original implementation.
pub const VLAN_TPID: u16 = 0x8200;

/// A parsed Ethernet II / 802.1Q header. Only the fields the forwarding and
/// STP engines need; the frame body is left untouched in the caller's buffer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ParsedHeader {
    pub destination: MacAddress,
    pub source: MacAddress,
    pub ether_type: u16,
    pub vlan_id: Option<u16>,
}

/// Parses the header of an Ethernet II / 802.1Q frame.
///
/// Returns `None` for frames too short to contain a full header (14 bytes
/// untagged, 18 tagged) -- callers drop the frame silently per spec.md §7.
pub fn parse_header(bytes: &[u8]) -> Option<ParsedHeader> {
    if bytes.len() < 14 {
        return None;
    }

    let destination: MacAddress = bytes[0..6].try_into().unwrap();
    let source: MacAddress = bytes[6..12].try_into().unwrap();
    let first_u16 = u16::from_be_bytes([bytes[12], bytes[13]]);

    if first_u16 == VLAN_TPID {
        if bytes.len() < 18 {
            return None;
        }
        let tci = u16::from_be_bytes([bytes[14], bytes[15]]);
        let vlan_id = tci & 0x0FFF;
        let ether_type = u16::from_be_bytes([bytes[16], bytes[17]]);

        Some(ParsedHeader {
            destination,
            source,
            ether_type,
            vlan_id: Some(vlan_id),
        })
    } else {
        Some(ParsedHeader {
            destination,
            source,
            ether_type: first_u16,
            vlan_id: None,
        })
    }
}

/// Inserts an 802.1Q tag carrying `vlan_id` (priority and DEI zeroed) after the
/// dst+src prefix. Grows the frame by 4 bytes.
pub fn insert_vlan_tag(bytes: &[u8], vlan_id: u16) -> Vec<u8> {
    let mut tagged = Vec::with_capacity(bytes.len() + 4);
    tagged.extend_from_slice(&bytes[0..12]);
    tagged.extend_from_slice(&VLAN_TPID.to_be_bytes());
    tagged.extend_from_slice(&(vlan_id & 0x0FFF).to_be_bytes());
    tagged.extend_from_slice(&bytes[12..]);
    tagged
}

/// Strips a 4-byte 802.1Q tag immediately following the dst+src prefix.
///
/// The caller must already know the frame is tagged (e.g. via `parse_header`).
pub fn strip_vlan_tag(bytes: &[u8]) -> Vec<u8> {
    let mut untagged = Vec::with_capacity(bytes.len() - 4);
    untagged.extend_from_slice(&bytes[0..12]);
    untagged.extend_from_slice(&bytes[16..]);
    untagged
}

pub trait ByteSerializable: Sized {
    fn from_bytes(bytes: &[u8]) -> Result<Self, io::Error>;
    fn to_bytes(&self) -> Vec<u8>;
}

/// The control message of this system's spanning tree discipline: destination
/// `01:80:C2:00:00:00`, source = switch MAC, three big-endian u32 fields. No
/// LLC/SNAP header, no 802.1D configuration-BPDU TLVs beyond these three.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct BpduFrame {
    pub source: MacAddress,
    pub root_bridge_id: u32,
    pub own_bridge_id: u32,
    pub root_path_cost: u32,
}

impl BpduFrame {
    pub fn new(source: MacAddress, root_bridge_id: u32, own_bridge_id: u32, root_path_cost: u32) -> Self {
        Self {
            source,
            root_bridge_id,
            own_bridge_id,
            root_path_cost,
        }
    }
}

impl ByteSerializable for BpduFrame {
    fn from_bytes(bytes: &[u8]) -> Result<Self, io::Error> {
        if bytes.len() < 24 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "insufficient bytes for BPDU frame",
            ));
        }

        let source: MacAddress = bytes[6..12].try_into().unwrap();
        let root_bridge_id = u32::from_be_bytes(bytes[12..16].try_into().unwrap());
        let own_bridge_id = u32::from_be_bytes(bytes[16..20].try_into().unwrap());
        let root_path_cost = u32::from_be_bytes(bytes[20..24].try_into().unwrap());

        Ok(Self {
            source,
            root_bridge_id,
            own_bridge_id,
            root_path_cost,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(24);
        bytes.extend_from_slice(&mac_bpdu_addr!());
        bytes.extend_from_slice(&self.source);
        bytes.extend_from_slice(&self.root_bridge_id.to_be_bytes());
        bytes.extend_from_slice(&self.own_bridge_id.to_be_bytes());
        bytes.extend_from_slice(&self.root_path_cost.to_be_bytes());
        bytes
    }
}
