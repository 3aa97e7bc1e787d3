//! The link I/O layer is an external collaborator (spec.md §1, §6): raw frame
//! send/receive per interface, MAC discovery, and interface enumeration are
//! deliberately out of this crate's core. `LinkLayer` is that boundary.
//!
//! `LoopbackLinkLayer` is the one concrete implementation this crate ships --
//! an in-memory stand-in for tests and local exercise, grounded in the
//! teacher's `EthernetPort` / `CableSimulator`
//! (`network/device/cable.rs`) but adapted from tick-driven simulation to a
//! genuinely blocking queue (`std::sync::mpsc`), since spec.md §5 requires
//! `recv_from_any_link` to block the forwarding unit until a frame arrives.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use crate::mac::MacAddress;

/// The external link-layer collaborator's API (spec.md §6).
pub trait LinkLayer: Send + Sync {
    /// The number of local interfaces, ids `0..interface_count()`.
    fn interface_count(&self) -> u32;

    /// Blocks until a frame arrives on any interface; returns its id and bytes.
    fn recv_from_any_link(&self) -> (u32, Vec<u8>);

    /// Sends `data` out interface `interface_id`.
    fn send_to_link(&self, interface_id: u32, data: &[u8]);

    /// This switch's own MAC address, used as the BPDU source address.
    fn switch_mac(&self) -> MacAddress;

    /// The textual name of interface `id` (fixed at startup, spec.md §3).
    fn interface_name(&self, id: u32) -> String;
}

/// An in-memory link layer: each local id is either unconnected or wired to
/// one peer `LoopbackLinkLayer`'s id. All inbound frames, regardless of which
/// local interface they arrived on, merge into one queue so
/// `recv_from_any_link` can block on it directly.
pub struct LoopbackLinkLayer {
    mac: MacAddress,
    names: Vec<String>,
    inbox_tx: Sender<(u32, Vec<u8>)>,
    inbox_rx: Mutex<Receiver<(u32, Vec<u8>)>>,
    peers: Mutex<HashMap<u32, (Sender<(u32, Vec<u8>)>, u32)>>,
}

impl LoopbackLinkLayer {
    pub fn new(mac: MacAddress, names: Vec<String>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel();
        Self {
            mac,
            names,
            inbox_tx,
            inbox_rx: Mutex::new(inbox_rx),
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// Wires `a`'s interface `a_id` to `b`'s interface `b_id`, bidirectionally.
    pub fn connect(a: &LoopbackLinkLayer, a_id: u32, b: &LoopbackLinkLayer, b_id: u32) {
        a.peers.lock().unwrap().insert(a_id, (b.inbox_tx.clone(), b_id));
        b.peers.lock().unwrap().insert(b_id, (a.inbox_tx.clone(), a_id));
    }

    /// Injects a frame directly into this link layer's receive queue, as if it
    /// arrived on `interface_id` from an unmodeled peer.
    pub fn inject(&self, interface_id: u32, data: Vec<u8>) {
        let _ = self.inbox_tx.send((interface_id, data));
    }
}

impl LinkLayer for LoopbackLinkLayer {
    fn interface_count(&self) -> u32 {
        self.names.len() as u32
    }

    fn recv_from_any_link(&self) -> (u32, Vec<u8>) {
        self.inbox_rx
            .lock()
            .unwrap()
            .recv()
            .expect("link layer sender half dropped while owner still running")
    }

    fn send_to_link(&self, interface_id: u32, data: &[u8]) {
        if let Some((tx, peer_id)) = self.peers.lock().unwrap().get(&interface_id) {
            let _ = tx.send((*peer_id, data.to_vec()));
        }
        // No peer wired up: the frame has nowhere to go. Matches spec.md §7's
        // "link-layer send failure ... not retried" -- silently dropped here.
    }

    fn switch_mac(&self) -> MacAddress {
        self.mac
    }

    fn interface_name(&self, id: u32) -> String {
        self.names[id as usize].clone()
    }
}
