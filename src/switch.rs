//! The composition root: wires a link layer, a port registry, a MAC table,
//! and an STP engine into the two units of execution spec.md §5 describes --
//! a BPDU timer and a forwarding loop -- sharing STP state behind a `Mutex`.
//! Grounded in the teacher's `Switch` (`network/device/switch.rs`) for the
//! overall shape, adapted from its single-threaded tick-driven model to real
//! OS threads the way `luizribeiro-capsa`'s `VirtualSwitch` shares state
//! across an `Arc<Mutex<..>>` (see SPEC_FULL.md §5).

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::ParsedConfig;
use crate::error::SwitchError;
use crate::forwarding;
use crate::link::LinkLayer;
use crate::mac_table::MacTable;
use crate::port::PortRegistry;
use crate::stp::StpEngine;

/// How often the BPDU timer wakes up to consider emitting (spec.md §4.4).
const BPDU_TIMER_PERIOD: Duration = Duration::from_secs(1);

pub struct Switch {
    registry: Arc<PortRegistry>,
    mac_table: MacTable,
    stp: Arc<Mutex<StpEngine>>,
    link: Arc<dyn LinkLayer>,
}

impl Switch {
    /// Builds a switch from a fully initialized link layer and parsed config.
    /// The link layer's interface enumeration determines numeric ids (spec.md
    /// §3: ids are assigned by the link layer, not the config file).
    pub fn new(link: Arc<dyn LinkLayer>, config: &ParsedConfig) -> Result<Self, SwitchError> {
        let names: Vec<String> = (0..link.interface_count()).map(|id| link.interface_name(id)).collect();
        let registry = Arc::new(PortRegistry::build(&names, config)?);
        let stp = Arc::new(Mutex::new(StpEngine::new(config.priority, registry.trunk_ids())));

        Ok(Self {
            registry,
            mac_table: MacTable::new(),
            stp,
            link,
        })
    }

    pub fn registry(&self) -> &PortRegistry {
        &self.registry
    }

    pub fn stp(&self) -> &Mutex<StpEngine> {
        &self.stp
    }

    /// Spawns the BPDU timer as its own thread: sleeps a fixed period, then
    /// emits on every trunk iff this switch currently believes itself root
    /// (spec.md §4.4, §5). Never joined during normal operation.
    pub fn spawn_bpdu_timer(&self) -> thread::JoinHandle<()> {
        let registry = self.registry.clone();
        let stp = self.stp.clone();
        let link = self.link.clone();

        thread::spawn(move || loop {
            thread::sleep(BPDU_TIMER_PERIOD);
            forwarding::emit_periodic_bpdu(&registry, &stp, link.as_ref());
        })
    }

    /// Runs the forwarding loop on the calling thread: blocks on the link
    /// layer's receive primitive and dispatches each frame in turn (spec.md
    /// §5's "processes frames one at a time to completion before the next").
    pub fn run_forwarding_loop(&mut self) -> ! {
        loop {
            let (ingress_id, bytes) = self.link.recv_from_any_link();
            forwarding::handle_frame(&self.registry, &mut self.mac_table, &self.stp, self.link.as_ref(), ingress_id, bytes);
        }
    }

    /// Dispatches a single already-received frame. Exposed so scenario tests
    /// can drive convergence deterministically instead of racing real threads
    /// against `run_forwarding_loop`.
    pub fn handle_one_frame(&mut self, ingress_id: u32, bytes: Vec<u8>) {
        forwarding::handle_frame(&self.registry, &mut self.mac_table, &self.stp, self.link.as_ref(), ingress_id, bytes);
    }

    /// Fires one BPDU-timer tick synchronously: emits on every trunk iff this
    /// switch is currently root, without waiting out the real 1-second sleep
    /// (mirrors the teacher's `TimeProvider::freeze`/`advance` pattern in
    /// spirit -- a manual single-step rather than a frozen clock, since this
    /// timer has no calendar-time-dependent logic beyond "has 1s elapsed").
    pub fn tick_bpdu_timer(&self) {
        forwarding::emit_periodic_bpdu(&self.registry, &self.stp, self.link.as_ref());
    }
}
