//! Reads `./configs/switch{switch_id}.cfg`: line 1 is the switch priority, each
//! following line names an access port (`r-N V`) or a trunk port (`rr-N-M T`).
//! Blank lines and unrecognized prefixes are ignored (spec.md §6).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SwitchError;
use crate::port::PortKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfig {
    pub priority: u32,
    pub ports: HashMap<String, PortKind>,
}

/// Builds the path `./configs/switch{switch_id}.cfg` (spec.md §6).
pub fn config_path(switch_id: &str) -> PathBuf {
    PathBuf::from("./configs").join(format!("switch{switch_id}.cfg"))
}

pub fn read_config_file(path: &Path) -> Result<ParsedConfig, SwitchError> {
    let contents = fs::read_to_string(path).map_err(|source| SwitchError::ConfigRead {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<ParsedConfig, SwitchError> {
    let mut priority: Option<u32> = None;
    let mut ports = HashMap::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if priority.is_none() {
            priority = Some(line.split_whitespace().next().unwrap_or("").parse().map_err(|_| {
                SwitchError::ConfigParse(format!("expected switch priority, got {line:?}"))
            })?);
            continue;
        }

        if line.starts_with("r-") {
            let mut parts = line.split_whitespace();
            let name = parts.next().unwrap();
            let vlan_id: u16 = parts
                .next()
                .ok_or_else(|| SwitchError::ConfigParse(format!("access port {name} missing VLAN id")))?
                .parse()
                .map_err(|_| SwitchError::ConfigParse(format!("invalid VLAN id on line {line:?}")))?;
            if vlan_id > 0x0FFF {
                return Err(SwitchError::ConfigParse(format!(
                    "VLAN id {vlan_id} on port {name} exceeds 12-bit range"
                )));
            }
            if ports.insert(name.to_string(), PortKind::Access(vlan_id)).is_some() {
                return Err(SwitchError::ConfigParse(format!("duplicate interface {name}")));
            }
        } else if line.starts_with("rr-") {
            let name = line
                .split_whitespace()
                .next()
                .ok_or_else(|| SwitchError::ConfigParse(format!("malformed trunk line {line:?}")))?;
            if ports.insert(name.to_string(), PortKind::Trunk).is_some() {
                return Err(SwitchError::ConfigParse(format!("duplicate interface {name}")));
            }
        }
        // Unknown prefixes are ignored per spec.md §6.
    }

    let priority = priority.ok_or_else(|| SwitchError::ConfigParse("empty config file".to_string()))?;

    Ok(ParsedConfig { priority, ports })
}
