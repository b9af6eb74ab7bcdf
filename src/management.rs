//! Configuration message envelope and validation (spec §6.1), plus the
//! published-state record shapes external persistence consumes (spec §6.3).
//!
//! This module owns *shapes and bounds only*. Applying a message to engine
//! state is [`crate::engine::Engine::apply_config`]; this module never
//! touches instance data directly.

use crate::data_link::mac_address::MacAddress;
use crate::error::{StpError, StpResult};
use crate::instance::PortNumber;

pub type VlanId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Del = 0,
    Set = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StpMode {
    None = 0,
    Pvstp = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    Untagged = 0,
    Tagged = 1,
}

#[derive(Debug, Clone)]
pub struct VlanPortMember {
    pub intf_name: String,
    pub mode: TagMode,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct InitMessage {
    pub max_stp_instances: u16,
}

#[derive(Debug, Clone)]
pub struct BridgeConfigMessage {
    pub opcode: Opcode,
    pub stp_mode: StpMode,
    pub rootguard_timeout: i32,
    pub base_mac: MacAddress,
}

#[derive(Debug, Clone)]
pub struct VlanConfigMessage {
    pub opcode: Opcode,
    pub new_instance: bool,
    pub vlan_id: VlanId,
    pub inst_id: u16,
    pub forward_delay: u8,
    pub hello_time: u8,
    pub max_age: u8,
    pub priority: u16,
    pub members: Vec<VlanPortMember>,
}

#[derive(Debug, Clone)]
pub struct VlanPortConfigMessage {
    pub opcode: Opcode,
    pub vlan_id: VlanId,
    pub intf_name: String,
    pub inst_id: u16,
    pub path_cost: u32,
    /// `-1` means "unset" per spec §6.1.
    pub priority: i32,
}

#[derive(Debug, Clone)]
pub struct PortVlanAttribute {
    pub vlan_id: VlanId,
    pub mode: TagMode,
}

#[derive(Debug, Clone)]
pub struct PortConfigMessage {
    pub opcode: Opcode,
    pub intf_name: String,
    pub enabled: bool,
    pub root_guard: bool,
    pub bpdu_guard: bool,
    pub bpdu_guard_do_disable: bool,
    pub portfast: bool,
    pub uplink_fast: bool,
    pub path_cost: u32,
    pub priority: u8,
    pub vlans: Vec<PortVlanAttribute>,
}

#[derive(Debug, Clone)]
pub struct VlanMemberConfigMessage {
    pub opcode: Opcode,
    pub vlan_id: VlanId,
    pub inst_id: u16,
    pub intf_name: String,
    pub enabled: bool,
    pub mode: TagMode,
    pub path_cost: u32,
    pub priority: u8,
}

#[derive(Debug, Clone)]
pub enum ConfigMessage {
    Init(InitMessage),
    BridgeConfig(BridgeConfigMessage),
    VlanConfig(VlanConfigMessage),
    VlanPortConfig(VlanPortConfigMessage),
    PortConfig(PortConfigMessage),
    VlanMemberConfig(VlanMemberConfigMessage),
    Control,
}

pub const BRIDGE_PRIORITY_MIN: u16 = 0;
pub const BRIDGE_PRIORITY_MAX: u16 = 61440;
pub const BRIDGE_PRIORITY_STEP: u16 = 4096;

pub const PORT_PRIORITY_MIN: u8 = 0;
pub const PORT_PRIORITY_MAX: u8 = 240;
pub const PORT_PRIORITY_STEP: u8 = 16;

pub const FORWARD_DELAY_MIN: u8 = 4;
pub const FORWARD_DELAY_MAX: u8 = 30;
pub const MAX_AGE_MIN: u8 = 6;
pub const MAX_AGE_MAX: u8 = 40;
pub const HELLO_TIME_MIN: u8 = 1;
pub const HELLO_TIME_MAX: u8 = 10;

pub const ROOTGUARD_TIMEOUT_MIN: i32 = 5;
pub const ROOTGUARD_TIMEOUT_MAX: i32 = 600;

pub const PATH_COST_MIN_EXTENDED: u32 = 1;
pub const PATH_COST_MAX_EXTENDED: u32 = 200_000_000;
pub const PATH_COST_MIN_LEGACY: u32 = 1;
pub const PATH_COST_MAX_LEGACY: u32 = 65535;

/// Bridge priority is a 16-bit word whose effective class occupies the top
/// 4 bits, i.e. multiples of 4096 in `[0, 61440]` — see [`crate::ids::BridgeId`]
/// and DESIGN.md's reading of this bound.
pub fn validate_bridge_priority(priority: u16) -> StpResult<()> {
    if priority > BRIDGE_PRIORITY_MAX || priority % BRIDGE_PRIORITY_STEP != 0 {
        return Err(StpError::config_rejected(format!(
            "bridge priority {priority} must be a multiple of {BRIDGE_PRIORITY_STEP} in [{BRIDGE_PRIORITY_MIN}, {BRIDGE_PRIORITY_MAX}]"
        )));
    }
    Ok(())
}

pub fn validate_port_priority(priority: u8) -> StpResult<()> {
    if priority > PORT_PRIORITY_MAX || priority % PORT_PRIORITY_STEP != 0 {
        return Err(StpError::config_rejected(format!(
            "port priority {priority} must be a multiple of {PORT_PRIORITY_STEP} in [{PORT_PRIORITY_MIN}, {PORT_PRIORITY_MAX}]"
        )));
    }
    Ok(())
}

pub fn validate_forward_delay(seconds: u8) -> StpResult<()> {
    if !(FORWARD_DELAY_MIN..=FORWARD_DELAY_MAX).contains(&seconds) {
        return Err(StpError::config_rejected(format!(
            "forward delay {seconds}s out of range [{FORWARD_DELAY_MIN}, {FORWARD_DELAY_MAX}]"
        )));
    }
    Ok(())
}

pub fn validate_max_age(seconds: u8) -> StpResult<()> {
    if !(MAX_AGE_MIN..=MAX_AGE_MAX).contains(&seconds) {
        return Err(StpError::config_rejected(format!(
            "max age {seconds}s out of range [{MAX_AGE_MIN}, {MAX_AGE_MAX}]"
        )));
    }
    Ok(())
}

pub fn validate_hello_time(seconds: u8) -> StpResult<()> {
    if !(HELLO_TIME_MIN..=HELLO_TIME_MAX).contains(&seconds) {
        return Err(StpError::config_rejected(format!(
            "hello time {seconds}s out of range [{HELLO_TIME_MIN}, {HELLO_TIME_MAX}]"
        )));
    }
    Ok(())
}

pub fn validate_rootguard_timeout(seconds: i32) -> StpResult<()> {
    if !(ROOTGUARD_TIMEOUT_MIN..=ROOTGUARD_TIMEOUT_MAX).contains(&seconds) {
        return Err(StpError::config_rejected(format!(
            "root guard timeout {seconds}s out of range [{ROOTGUARD_TIMEOUT_MIN}, {ROOTGUARD_TIMEOUT_MAX}]"
        )));
    }
    Ok(())
}

pub fn validate_path_cost(cost: u32, extend_mode: bool) -> StpResult<()> {
    let (min, max) = if extend_mode {
        (PATH_COST_MIN_EXTENDED, PATH_COST_MAX_EXTENDED)
    } else {
        (PATH_COST_MIN_LEGACY, PATH_COST_MAX_LEGACY)
    };
    if !(min..=max).contains(&cost) {
        return Err(StpError::config_rejected(format!(
            "path cost {cost} out of range [{min}, {max}]"
        )));
    }
    Ok(())
}

/// Validates a `VlanConfig` message's timer and priority fields.
pub fn validate_vlan_config(msg: &VlanConfigMessage) -> StpResult<()> {
    validate_forward_delay(msg.forward_delay)?;
    validate_hello_time(msg.hello_time)?;
    validate_max_age(msg.max_age)?;
    validate_bridge_priority(msg.priority)?;
    Ok(())
}

/// Validates a `VlanPortConfig` message. `priority = -1` means "unset" and
/// skips the priority bound check.
pub fn validate_vlan_port_config(msg: &VlanPortConfigMessage, extend_mode: bool) -> StpResult<()> {
    validate_path_cost(msg.path_cost, extend_mode)?;
    if msg.priority != -1 {
        if !(0..=u8::MAX as i32).contains(&msg.priority) {
            return Err(StpError::config_rejected(format!(
                "port priority {} out of range",
                msg.priority
            )));
        }
        validate_port_priority(msg.priority as u8)?;
    }
    Ok(())
}

pub fn validate_port_config(msg: &PortConfigMessage, extend_mode: bool) -> StpResult<()> {
    validate_path_cost(msg.path_cost, extend_mode)?;
    validate_port_priority(msg.priority)?;
    Ok(())
}

pub fn validate_vlan_member_config(
    msg: &VlanMemberConfigMessage,
    extend_mode: bool,
) -> StpResult<()> {
    validate_path_cost(msg.path_cost, extend_mode)?;
    validate_port_priority(msg.priority)?;
    Ok(())
}

pub fn validate_bridge_config(msg: &BridgeConfigMessage) -> StpResult<()> {
    validate_rootguard_timeout(msg.rootguard_timeout)
}

/// A published instance-level record (spec §6.3): the modified `BridgeData`
/// fields only, with bridge ids already formatted for display.
#[derive(Debug, Clone, Default)]
pub struct PublishedInstanceRecord {
    pub vlan_id: VlanId,
    pub root_id: Option<String>,
    pub bridge_id: Option<String>,
    pub root_path_cost: Option<u32>,
    pub topology_change: Option<bool>,
    pub topology_change_count: Option<u32>,
}

/// A published port-level record (spec §6.3).
#[derive(Debug, Clone, Default)]
pub struct PublishedPortRecord {
    pub vlan_id: VlanId,
    pub intf_name: String,
    pub port_number: PortNumber,
    pub state: Option<&'static str>,
    pub role_tag: Option<&'static str>,
    pub rx_config_bpdu: Option<u32>,
    pub tx_config_bpdu: Option<u32>,
    pub forward_transitions: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ValidateBridgePriority_RejectsNonMultipleOfStep() {
        assert!(validate_bridge_priority(100).is_err());
        assert!(validate_bridge_priority(4096).is_ok());
    }

    #[test]
    fn ValidatePathCost_UsesExtendedRangeWhenExtendModeOn() {
        assert!(validate_path_cost(100_000_000, true).is_ok());
        assert!(validate_path_cost(100_000_000, false).is_err());
    }

    #[test]
    fn ValidateVlanPortConfig_AllowsUnsetPriority() {
        let msg = VlanPortConfigMessage {
            opcode: Opcode::Set,
            vlan_id: 10,
            intf_name: "eth0".into(),
            inst_id: 1,
            path_cost: 4,
            priority: -1,
        };
        assert!(validate_vlan_port_config(&msg, true).is_ok());
    }

    #[test]
    fn ValidateHelloTime_RejectsOutOfRange() {
        assert!(validate_hello_time(0).is_err());
        assert!(validate_hello_time(11).is_err());
        assert!(validate_hello_time(2).is_ok());
    }
}
