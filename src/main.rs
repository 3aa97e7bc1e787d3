//! Composition root (spec.md §4.6): reads `switch_id` and the link-layer's
//! arguments from argv, reads the matching config file, builds the Port
//! Registry, MAC table and STP engine, spawns the BPDU timer on its own
//! thread, then runs the forwarding loop on the main thread.
//!
//! The real link I/O layer -- raw per-interface send/receive, MAC discovery,
//! interface enumeration -- is an external collaborator out of this crate's
//! scope (spec.md §1, §6). The only concrete `LinkLayer` shipped here is
//! `link::LoopbackLinkLayer`, an in-memory stand-in; a production deployment
//! supplies its own implementation over raw sockets.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use vswitch::config;
use vswitch::link::{LinkLayer, LoopbackLinkLayer};
use vswitch::switch::Switch;

/// `switch <switch_id> <link-layer-args...>` (spec.md §6).
#[derive(Parser, Debug)]
#[command(name = "switch", about = "Software learning Ethernet bridge")]
struct Args {
    /// Used to form the config filename `./configs/switch{switch_id}.cfg`.
    switch_id: String,

    /// Opaque tokens consumed by the link-layer wrapper. For the shipped
    /// `LoopbackLinkLayer` these are interpreted as local interface names,
    /// standing in for the interface enumeration a real link layer performs.
    #[arg(trailing_var_arg = true)]
    link_layer_args: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config_path = config::config_path(&args.switch_id);
    let parsed = match config::read_config_file(&config_path) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!(%err, path = %config_path.display(), "failed to read config");
            return ExitCode::FAILURE;
        }
    };

    let switch_mac = synthesize_mac(&args.switch_id);
    let link: Arc<dyn LinkLayer> = Arc::new(LoopbackLinkLayer::new(switch_mac, args.link_layer_args));

    let mut switch = match Switch::new(link, &parsed) {
        Ok(switch) => switch,
        Err(err) => {
            tracing::error!(%err, "failed to initialize switch");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(switch_id = %args.switch_id, priority = parsed.priority, "switch initialized");

    let _bpdu_timer = switch.spawn_bpdu_timer();
    switch.run_forwarding_loop();
}

/// Derives a locally-administered MAC from `switch_id` for the loopback link
/// layer, which has no physical NIC to discover one from.
fn synthesize_mac(switch_id: &str) -> [u8; 6] {
    let hash = switch_id.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    let bytes = hash.to_be_bytes();
    [0x02, bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]]
}
