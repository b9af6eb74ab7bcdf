//! The management adapter (spec §4.6): owns the VLAN instance table, the
//! global port-wide guard/fast masks, BPDU ingress/egress routing, and the
//! scheduler (spec §4.5). This is the crate's single stateful value — "no
//! ambient globals" (design notes §9) means everything the original keeps in
//! file-scope variables lives here instead.

use std::collections::HashMap;

use crate::bpdu::{self, Bpdu, ConfigBpdu, VERSION_CLASSIC};
use crate::data_link::mac_address::MacAddress;
use crate::error::{StpError, StpResult};
use crate::ids::PortId;
use crate::instance::{ConfigBpduOutcome, InstanceState, PortNumber, PortRole, StpIndex, StpInstance, TcnOutcome};
use crate::management::{
    self as mgmt, BridgeConfigMessage, ConfigMessage, InitMessage, Opcode, PortConfigMessage,
    PublishedInstanceRecord, PublishedPortRecord, StpMode, TagMode, VlanConfigMessage, VlanId,
    VlanMemberConfigMessage, VlanPortConfigMessage,
};
use crate::mask::PortMask;
use crate::transport::{PortDatabase, StatePublisher, Transport};

/// Default root-protect timeout, in seconds, applied until `BridgeConfig`
/// sets one explicitly.
pub const DEFAULT_ROOT_PROTECT_TIMEOUT_SECS: i32 = 30;

/// The PVST+ engine: one instance table plus the global masks and drop
/// counters of spec.md §3's "Global engine state". Generic over the three
/// external collaborators (spec.md §1) so tests can supply recording
/// doubles and the daemon binary can supply real ones.
pub struct Engine<T: Transport, P: PortDatabase, S: StatePublisher> {
    transport: T,
    port_db: P,
    publisher: S,

    instances: Vec<StpInstance>,
    vlan_index: HashMap<VlanId, StpIndex>,

    bpdu_guard: PortMask,
    bpdu_guard_do_disable: PortMask,
    bpdu_guard_tripped: PortMask,
    root_guard: PortMask,
    portfast_admin: PortMask,
    uplinkfast_admin: PortMask,
    enabled_admin: PortMask,

    root_protect_timeout_ticks: u32,
    stp_drop: u32,
    tcn_drop: u32,
    pvst_drop: u32,

    extend_mode: bool,
    base_mac: MacAddress,
    stp_mode: StpMode,

    intf_names: HashMap<PortNumber, String>,
    name_to_port: HashMap<String, PortNumber>,
    next_port: PortNumber,
}

impl<T: Transport, P: PortDatabase, S: StatePublisher> Engine<T, P, S> {
    pub fn new(max_instances: usize, base_mac: MacAddress, extend_mode: bool, transport: T, port_db: P, publisher: S) -> Self {
        Engine {
            transport,
            port_db,
            publisher,
            instances: (0..max_instances).map(|_| StpInstance::free()).collect(),
            vlan_index: HashMap::new(),
            bpdu_guard: PortMask::empty(),
            bpdu_guard_do_disable: PortMask::empty(),
            bpdu_guard_tripped: PortMask::empty(),
            root_guard: PortMask::empty(),
            portfast_admin: PortMask::empty(),
            uplinkfast_admin: PortMask::empty(),
            enabled_admin: PortMask::empty(),
            root_protect_timeout_ticks: (DEFAULT_ROOT_PROTECT_TIMEOUT_SECS as u32) * 2,
            stp_drop: 0,
            tcn_drop: 0,
            pvst_drop: 0,
            extend_mode,
            base_mac,
            stp_mode: StpMode::Pvstp,
            intf_names: HashMap::new(),
            name_to_port: HashMap::new(),
            next_port: 0,
        }
    }

    pub fn instance(&self, vlan_id: VlanId) -> Option<&StpInstance> {
        self.vlan_index.get(&vlan_id).map(|&idx| &self.instances[idx])
    }

    pub fn drop_counters(&self) -> (u32, u32, u32) {
        (self.stp_drop, self.tcn_drop, self.pvst_drop)
    }

    /// Read access to the transport collaborator, for test harnesses that
    /// need to inspect transmitted frames.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Read access to the state-publication collaborator, for test
    /// harnesses that need to inspect published records.
    pub fn publisher(&self) -> &S {
        &self.publisher
    }

    pub fn port_number(&self, intf_name: &str) -> Option<PortNumber> {
        self.name_to_port.get(intf_name).copied()
    }

    fn resolve_port(&mut self, intf_name: &str) -> PortNumber {
        if let Some(&p) = self.name_to_port.get(intf_name) {
            return p;
        }
        let p = self.next_port;
        self.next_port += 1;
        self.name_to_port.insert(intf_name.to_string(), p);
        self.intf_names.insert(p, intf_name.to_string());
        p
    }

    fn intf_name(&self, port: PortNumber) -> String {
        self.intf_names.get(&port).cloned().unwrap_or_else(|| format!("port{port}"))
    }

    fn find_free_slot(&self) -> StpResult<StpIndex> {
        self.instances
            .iter()
            .position(|i| i.state == InstanceState::Free)
            .ok_or(StpError::ResourceExhausted {
                reason: "no free STP instance slot",
            })
    }

    // ---- configuration ingestion (spec §4.6, §6.1) ----

    pub fn apply_config(&mut self, msg: ConfigMessage) -> StpResult<()> {
        match msg {
            ConfigMessage::Init(m) => self.apply_init(m),
            ConfigMessage::BridgeConfig(m) => self.apply_bridge_config(m),
            ConfigMessage::VlanConfig(m) => self.apply_vlan_config(m),
            ConfigMessage::VlanPortConfig(m) => self.apply_vlan_port_config(m),
            ConfigMessage::PortConfig(m) => self.apply_port_config(m),
            ConfigMessage::VlanMemberConfig(m) => self.apply_vlan_member_config(m),
            ConfigMessage::Control => Ok(()),
        }
    }

    fn apply_init(&mut self, msg: InitMessage) -> StpResult<()> {
        if (msg.max_stp_instances as usize) > self.instances.len() {
            return Err(StpError::ResourceExhausted {
                reason: "requested instance count exceeds engine capacity",
            });
        }
        Ok(())
    }

    fn apply_bridge_config(&mut self, msg: BridgeConfigMessage) -> StpResult<()> {
        mgmt::validate_bridge_config(&msg)?;
        if msg.opcode == Opcode::Del {
            self.stp_mode = StpMode::None;
            return Ok(());
        }
        self.stp_mode = msg.stp_mode;
        self.root_protect_timeout_ticks = (msg.rootguard_timeout as u32) * 2;
        self.base_mac = msg.base_mac;
        Ok(())
    }

    fn apply_vlan_config(&mut self, msg: VlanConfigMessage) -> StpResult<()> {
        if msg.opcode == Opcode::Del {
            if let Some(idx) = self.vlan_index.remove(&msg.vlan_id) {
                self.instances[idx] = StpInstance::free();
            }
            return Ok(());
        }
        mgmt::validate_vlan_config(&msg)?;

        let idx = if let Some(&idx) = self.vlan_index.get(&msg.vlan_id) {
            idx
        } else {
            let idx = self.find_free_slot()?;
            self.instances[idx].initialize_bridge(msg.vlan_id, msg.priority & 0xF000, self.base_mac);
            self.vlan_index.insert(msg.vlan_id, idx);
            idx
        };

        {
            let inst = &mut self.instances[idx];
            inst.bridge.bridge_max_age = msg.max_age;
            inst.bridge.bridge_hello_time = msg.hello_time;
            inst.bridge.bridge_forward_delay = msg.forward_delay;
            inst.bridge.max_age = msg.max_age;
            inst.bridge.hello_time = msg.hello_time;
            inst.bridge.forward_delay = msg.forward_delay;
        }

        for member in &msg.members {
            let port = self.resolve_port(&member.intf_name);
            self.ensure_control_port(idx, port);
            if member.mode == TagMode::Untagged {
                self.instances[idx].untag_mask.set(port);
            } else {
                self.instances[idx].untag_mask.clear(port);
            }
            if member.enabled {
                self.bring_port_up(idx, port);
            } else {
                self.bring_port_down(idx, port);
            }
        }

        self.activate_if_ready(idx);
        Ok(())
    }

    fn apply_vlan_port_config(&mut self, msg: VlanPortConfigMessage) -> StpResult<()> {
        mgmt::validate_vlan_port_config(&msg, self.extend_mode)?;
        let idx = *self
            .vlan_index
            .get(&msg.vlan_id)
            .ok_or_else(|| StpError::config_rejected(format!("unknown VLAN {}", msg.vlan_id)))?;
        let port = self.resolve_port(&msg.intf_name);
        let p = self.instances[idx].port_mut(port);
        p.path_cost = msg.path_cost;
        p.auto_config = false;
        if msg.priority != -1 {
            p.port_id = PortId::from_config_priority(msg.priority as u8, port as u16);
        }
        self.instances[idx].configuration_update();
        self.instances[idx].port_state_selection(&self.uplinkfast_admin);
        Ok(())
    }

    fn apply_port_config(&mut self, msg: PortConfigMessage) -> StpResult<()> {
        mgmt::validate_port_config(&msg, self.extend_mode)?;
        let port = self.resolve_port(&msg.intf_name);

        if msg.opcode == Opcode::Del {
            self.bpdu_guard.clear(port);
            self.bpdu_guard_do_disable.clear(port);
            self.bpdu_guard_tripped.clear(port);
            self.root_guard.clear(port);
            self.portfast_admin.clear(port);
            self.uplinkfast_admin.clear(port);
            self.enabled_admin.clear(port);
            return Ok(());
        }

        if msg.root_guard {
            self.root_guard.set(port);
        } else {
            self.root_guard.clear(port);
        }
        if msg.bpdu_guard {
            self.bpdu_guard.set(port);
        } else {
            self.bpdu_guard.clear(port);
            self.bpdu_guard_tripped.clear(port);
        }
        if msg.bpdu_guard_do_disable {
            self.bpdu_guard_do_disable.set(port);
        } else {
            self.bpdu_guard_do_disable.clear(port);
        }
        if msg.portfast {
            self.portfast_admin.set(port);
        } else {
            self.portfast_admin.clear(port);
        }
        if msg.uplink_fast {
            self.uplinkfast_admin.set(port);
        } else {
            self.uplinkfast_admin.clear(port);
        }
        if msg.enabled {
            self.enabled_admin.set(port);
        } else {
            self.enabled_admin.clear(port);
        }

        for attr in &msg.vlans {
            if let Some(&idx) = self.vlan_index.get(&attr.vlan_id) {
                self.ensure_control_port(idx, port);
                self.instances[idx].port_mut(port).path_cost = msg.path_cost;
                if attr.mode == TagMode::Untagged {
                    self.instances[idx].untag_mask.set(port);
                } else {
                    self.instances[idx].untag_mask.clear(port);
                }
                self.refresh_operational(idx, port);
            }
        }
        Ok(())
    }

    fn apply_vlan_member_config(&mut self, msg: VlanMemberConfigMessage) -> StpResult<()> {
        mgmt::validate_vlan_member_config(&msg, self.extend_mode)?;
        let idx = *self
            .vlan_index
            .get(&msg.vlan_id)
            .ok_or_else(|| StpError::config_rejected(format!("unknown VLAN {}", msg.vlan_id)))?;
        let port = self.resolve_port(&msg.intf_name);
        self.ensure_control_port(idx, port);
        self.instances[idx].port_mut(port).path_cost = msg.path_cost;
        if msg.mode == TagMode::Untagged {
            self.instances[idx].untag_mask.set(port);
        } else {
            self.instances[idx].untag_mask.clear(port);
        }
        if msg.opcode == Opcode::Del || !msg.enabled {
            self.bring_port_down(idx, port);
        } else {
            self.bring_port_up(idx, port);
        }
        self.activate_if_ready(idx);
        Ok(())
    }

    fn ensure_control_port(&mut self, idx: StpIndex, port: PortNumber) {
        if !self.instances[idx].control_mask.get(port) {
            let speed = self.port_db.port_speed(port);
            let default_cost = speed.default_path_cost(self.extend_mode);
            self.instances[idx].initialize_control_port(port, default_cost);
        }
    }

    fn bring_port_up(&mut self, idx: StpIndex, port: PortNumber) {
        if self.port_db.port_up(port) {
            let portfast = self.portfast_admin.get(port);
            self.instances[idx].enable_port(port, portfast, &self.uplinkfast_admin);
        }
    }

    fn bring_port_down(&mut self, idx: StpIndex, port: PortNumber) {
        if self.instances[idx].enable_mask.get(port) {
            let became_root = self.instances[idx].disable_port(port, &self.uplinkfast_admin);
            if became_root {
                self.transmit_all_designated(idx);
            }
        }
        self.instances[idx].control_mask.clear(port);
    }

    /// Re-derives a port's enable-mask membership from `enabled_admin AND
    /// port_db.port_up` (spec.md §3's "engine-enabled-operational").
    fn refresh_operational(&mut self, idx: StpIndex, port: PortNumber) {
        let should_be_up = self.enabled_admin.get(port) && self.port_db.port_up(port);
        let currently_up = self.instances[idx].enable_mask.get(port);
        if should_be_up && !currently_up {
            self.bring_port_up(idx, port);
        } else if !should_be_up && currently_up {
            self.bring_port_down(idx, port);
        }
    }

    /// Called by the surrounding daemon on a link-state change (spec.md
    /// §1's port database collaborator).
    pub fn on_port_link_change(&mut self, port: PortNumber) {
        for idx in 0..self.instances.len() {
            if self.instances[idx].state != InstanceState::Free && self.instances[idx].control_mask.get(port) {
                self.refresh_operational(idx, port);
            }
        }
    }

    fn activate_if_ready(&mut self, idx: StpIndex) {
        let inst = &mut self.instances[idx];
        if inst.state == InstanceState::Config && !inst.enable_mask.is_empty() {
            inst.state = InstanceState::Active;
        } else if inst.state == InstanceState::Active && inst.enable_mask.is_empty() {
            inst.state = InstanceState::Config;
        }
    }

    // ---- BPDU ingress (spec §4.6) ----

    pub fn rx(&mut self, port: PortNumber, bytes: &[u8]) {
        if self.bpdu_guard.get(port) {
            if self.bpdu_guard_do_disable.get(port) {
                self.bpdu_guard_tripped.set(port);
                self.enabled_admin.clear(port);
                log::warn!("interface {}: BPDU guard violation, port disabled", self.intf_name(port));
            } else {
                self.stp_drop += 1;
            }
            return;
        }

        if bytes.len() < 15 {
            self.stp_drop += 1;
            return;
        }

        // DA second octet distinguishes classic STP (0x80) from PVST+ (0x00).
        let is_classic = bytes[1] == 0x80;
        if is_classic {
            match bpdu::decode_classic(bytes) {
                Ok(frame) => match self.untagged_vlan_of(port) {
                    Some(vlan) => {
                        if let Some(idx) = self.vlan_index.get(&vlan).copied() {
                            self.process_bpdu(idx, port, frame);
                        } else {
                            self.stp_drop += 1;
                        }
                    }
                    None => self.stp_drop += 1,
                },
                Err(_) => self.stp_drop += 1,
            }
        } else {
            match bpdu::decode_pvst(bytes) {
                Ok((frame, vlan)) => {
                    let vlan = if vlan == 0 { self.untagged_vlan_of(port) } else { Some(vlan) };
                    let Some(vlan) = vlan else {
                        self.pvst_drop += 1;
                        return;
                    };
                    if vlan == 1 && self.untagged_vlan_of(port) == Some(1) {
                        // Waiting for the untagged IEEE BPDU instead (spec §4.6).
                        self.pvst_drop += 1;
                        return;
                    }
                    match self.vlan_index.get(&vlan).copied() {
                        Some(idx) => self.process_bpdu(idx, port, frame),
                        None => self.pvst_drop += 1,
                    }
                }
                Err(_) => self.pvst_drop += 1,
            }
        }
    }

    fn untagged_vlan_of(&self, port: PortNumber) -> Option<VlanId> {
        self.instances
            .iter()
            .find(|i| i.state != InstanceState::Free && i.untag_mask.get(port))
            .map(|i| i.vlan_id)
    }

    fn port_number_for(&self, idx: StpIndex, id: PortId) -> Option<PortNumber> {
        self.instances[idx].enable_mask.iter().find(|&p| self.instances[idx].port(p).port_id == id)
    }

    fn process_bpdu(&mut self, idx: StpIndex, port: PortNumber, frame: Bpdu) {
        let root_guard = self.root_guard.get(port);
        match frame {
            Bpdu::Config(cfg) => match self.instances[idx].received_config_bpdu(port, &cfg, root_guard) {
                ConfigBpduOutcome::RootGuardBlocked => {
                    log::warn!(
                        "interface {}, VLAN {} inconsistent (Received superior BPDU)",
                        self.intf_name(port),
                        self.instances[idx].vlan_id
                    );
                }
                ConfigBpduOutcome::Accepted { supersedes, topology_change } => {
                    if supersedes {
                        self.instances[idx].configuration_update();
                        self.instances[idx].port_state_selection(&self.uplinkfast_admin);
                    }
                    if topology_change {
                        self.instances[idx].topology_change_detection_local();
                    }
                }
            },
            Bpdu::Tcn(_) => {
                if let TcnOutcome::Propagate = self.instances[idx].received_tcn_bpdu(port) {
                    if let Some(rp) = self.instances[idx].bridge.root_port {
                        if let Some(p) = self.port_number_for(idx, rp) {
                            self.transmit_tcn(idx, p);
                        }
                    }
                }
            }
        }
        self.publish_dirty(idx);
    }

    // ---- BPDU egress (spec §4.2, §4.6) ----

    fn build_config_bpdu(&self, idx: StpIndex, port: PortNumber) -> ConfigBpdu {
        let inst = &self.instances[idx];
        let p = inst.port(port);
        ConfigBpdu {
            version: VERSION_CLASSIC,
            topology_change: inst.bridge.topology_change,
            topology_change_ack: p.topology_change_acknowledge,
            root_id: inst.bridge.root_id,
            root_path_cost: inst.bridge.root_path_cost,
            bridge_id: inst.bridge.bridge_id,
            port_id: p.port_id,
            message_age: 0,
            max_age: inst.bridge.max_age,
            hello_time: inst.bridge.hello_time,
            forward_delay: inst.bridge.forward_delay,
        }
    }

    fn transmit_config_bpdu(&mut self, idx: StpIndex, port: PortNumber) {
        let bpdu = self.build_config_bpdu(idx, port);
        let vlan = self.instances[idx].vlan_id;
        let untagged = self.instances[idx].untag_mask.get(port);

        if untagged {
            let bytes = bpdu::encode_classic_config(&bpdu, self.base_mac);
            self.transport.tx(port, vlan, bytes, false);
            if vlan == 1 {
                // Interoperability: also send the tagged PVST+ frame on VLAN 1.
                let pvst_bytes = bpdu::encode_pvst_config(&bpdu, self.base_mac, vlan);
                self.transport.tx(port, vlan, pvst_bytes, true);
            }
        } else {
            let bytes = bpdu::encode_pvst_config(&bpdu, self.base_mac, vlan);
            self.transport.tx(port, vlan, bytes, true);
        }

        let p = self.instances[idx].port_mut(port);
        p.tx_config_bpdu += 1;
        p.config_pending = true;
        p.hold.start(0);
        p.topology_change_acknowledge = false;
    }

    fn transmit_tcn(&mut self, idx: StpIndex, port: PortNumber) {
        let vlan = self.instances[idx].vlan_id;
        let untagged = self.instances[idx].untag_mask.get(port);
        let bytes = if untagged {
            bpdu::encode_classic_tcn(VERSION_CLASSIC, self.base_mac)
        } else {
            bpdu::encode_pvst_tcn(VERSION_CLASSIC, self.base_mac)
        };
        self.transport.tx(port, vlan, bytes, !untagged);
        self.instances[idx].port_mut(port).tx_tcn_bpdu += 1;
    }

    fn transmit_all_designated(&mut self, idx: StpIndex) {
        let ports: Vec<PortNumber> = self.instances[idx]
            .enable_mask
            .iter()
            .filter(|&p| matches!(self.instances[idx].port(p).role, Some(PortRole::Designated) | Some(PortRole::Root)))
            .collect();
        for port in ports {
            self.transmit_config_bpdu(idx, port);
        }
    }

    // ---- scheduler (spec §4.5) ----

    /// One 100 ms scheduler tick. `t` is the caller's free-running tick
    /// counter; every instance ticks every 5 calls (500 ms) and publishes
    /// counters every 100 calls (10 s / 10 groups of 1 s, per spec §4.5).
    pub fn tick(&mut self, t: u32) {
        let tick_group = (t % 5) as usize;
        let publish_group = ((t / 10) % 10) as usize;

        for idx in 0..self.instances.len() {
            if self.instances[idx].state != InstanceState::Active {
                continue;
            }
            if idx % 5 == tick_group {
                self.run_instance_tick(idx);
            }
            if idx % 10 == publish_group {
                self.publish_counters(idx);
            }
        }

        for idx in 0..self.instances.len() {
            if matches!(self.instances[idx].state, InstanceState::Active | InstanceState::Config) {
                self.publish_dirty(idx);
            }
        }
    }

    fn run_instance_tick(&mut self, idx: StpIndex) {
        let events = self.instances[idx].tick_timers(&self.uplinkfast_admin, self.root_protect_timeout_ticks);

        if events.hello_expired {
            self.transmit_all_designated(idx);
        }
        if events.tcn_expired {
            if let Some(rp) = self.instances[idx].bridge.root_port {
                if let Some(port) = self.port_number_for(idx, rp) {
                    self.transmit_tcn(idx, port);
                }
            }
        }
        for port in &events.forward_delay_reached_forwarding {
            log::info!("VLAN {} interface {} -> FORWARDING", self.instances[idx].vlan_id, self.intf_name(*port));
        }
        for port in &events.root_protect_expired {
            log::warn!(
                "interface {}, VLAN {} consistent (Timeout)",
                self.intf_name(*port),
                self.instances[idx].vlan_id
            );
        }
        if !events.message_age_expired.is_empty() {
            self.transmit_all_designated(idx);
        }
    }

    // ---- state publication (spec §6.3) ----

    fn publish_dirty(&mut self, idx: StpIndex) {
        let vlan_id = self.instances[idx].vlan_id;
        let bits = self.instances[idx].bridge.dirty.take();
        if bits != 0 {
            let bridge = &self.instances[idx].bridge;
            self.publisher.publish_instance(PublishedInstanceRecord {
                vlan_id,
                root_id: Some(bridge.root_id.to_display_string()),
                bridge_id: Some(bridge.bridge_id.to_display_string()),
                root_path_cost: Some(bridge.root_path_cost),
                topology_change: Some(bridge.topology_change),
                topology_change_count: Some(bridge.topology_change_count),
            });
        }

        let ports: Vec<PortNumber> = self.instances[idx].enable_mask.iter().collect();
        for port in ports {
            let port_bits = self.instances[idx].port_mut(port).dirty.take();
            if port_bits == 0 {
                continue;
            }
            let role_tag = self.role_tag(idx, port);
            let p = self.instances[idx].port(port);
            self.publisher.publish_port(PublishedPortRecord {
                vlan_id,
                intf_name: self.intf_name(port),
                port_number: port,
                state: Some(p.state.as_display_str()),
                role_tag,
                rx_config_bpdu: Some(p.rx_config_bpdu),
                tx_config_bpdu: Some(p.tx_config_bpdu),
                forward_transitions: Some(p.forward_transitions),
            });
        }
    }

    fn role_tag(&self, idx: StpIndex, port: PortNumber) -> Option<&'static str> {
        let p = self.instances[idx].port(port);
        if self.bpdu_guard_tripped.get(port) {
            Some("BPDU-DIS")
        } else if p.root_protect.is_active() {
            Some("ROOT-INC")
        } else {
            None
        }
    }

    fn publish_counters(&mut self, idx: StpIndex) {
        let vlan_id = self.instances[idx].vlan_id;
        let bridge = &self.instances[idx].bridge;
        self.publisher.publish_instance(PublishedInstanceRecord {
            vlan_id,
            root_id: None,
            bridge_id: None,
            root_path_cost: None,
            topology_change: Some(bridge.topology_change),
            topology_change_count: Some(bridge.topology_change_count),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_link::mac_address::MacAddress;
    use crate::ids::BridgeId;
    use crate::management::{Opcode, StpMode, TagMode, VlanPortMember};
    use crate::transport::{NullTransport, RecordingPublisher, StaticPortDatabase};

    const LOCAL_MAC: MacAddress = [0xaa; 6];

    fn test_engine() -> Engine<NullTransport, StaticPortDatabase, RecordingPublisher> {
        Engine::new(
            16,
            LOCAL_MAC,
            true,
            NullTransport::default(),
            StaticPortDatabase::new(LOCAL_MAC),
            RecordingPublisher::default(),
        )
    }

    fn vlan10_two_ports(engine: &mut Engine<NullTransport, StaticPortDatabase, RecordingPublisher>) {
        engine
            .apply_config(ConfigMessage::VlanConfig(VlanConfigMessage {
                opcode: Opcode::Set,
                new_instance: true,
                vlan_id: 10,
                inst_id: 1,
                forward_delay: 15,
                hello_time: 2,
                max_age: 20,
                priority: 32768,
                members: vec![
                    VlanPortMember { intf_name: "eth0".into(), mode: TagMode::Tagged, enabled: true },
                    VlanPortMember { intf_name: "eth1".into(), mode: TagMode::Tagged, enabled: true },
                ],
            }))
            .unwrap();
    }

    #[test]
    fn ApplyVlanConfig_TwoEnabledMembers_ActivatesInstanceAsDesignatedOnBoth() {
        let mut engine = test_engine();
        vlan10_two_ports(&mut engine);

        let inst = engine.instance(10).unwrap();
        assert_eq!(inst.state, InstanceState::Active);
        assert!(inst.bridge.is_root());
        for port in [0, 1] {
            assert_eq!(inst.port(port).role, Some(PortRole::Designated));
        }
    }

    #[test]
    fn Rx_SuperiorBpduOnUnguardedPort_ShiftsRootPort() {
        let mut engine = test_engine();
        vlan10_two_ports(&mut engine);

        let superior = ConfigBpdu {
            version: VERSION_CLASSIC,
            topology_change: false,
            topology_change_ack: false,
            root_id: BridgeId::new(4096, [0xaa, 0, 0, 0, 0, 9]),
            root_path_cost: 0,
            bridge_id: BridgeId::new(4096, [0xaa, 0, 0, 0, 0, 9]),
            port_id: PortId::new(8, 1),
            message_age: 0,
            max_age: 20,
            hello_time: 2,
            forward_delay: 15,
        };
        let frame = bpdu::encode_pvst_config(&superior, [0xaa, 0, 0, 0, 0, 9], 10);
        engine.rx(0, &frame);

        let inst = engine.instance(10).unwrap();
        assert!(!inst.bridge.is_root());
        assert_eq!(inst.port(0).role, Some(PortRole::Root));
    }

    #[test]
    fn Rx_BpduGuardDoDisable_TripsGuardWithoutProcessing() {
        let mut engine = test_engine();
        vlan10_two_ports(&mut engine);
        engine
            .apply_config(ConfigMessage::PortConfig(PortConfigMessage {
                opcode: Opcode::Set,
                intf_name: "eth0".into(),
                enabled: true,
                root_guard: false,
                bpdu_guard: true,
                bpdu_guard_do_disable: true,
                portfast: false,
                uplink_fast: false,
                path_cost: 4,
                priority: 128,
                vlans: vec![],
            }))
            .unwrap();

        engine.rx(0, &[0u8; 60]);
        assert!(engine.bpdu_guard_tripped.get(0));
        assert!(!engine.enabled_admin.get(0));
    }

    #[test]
    fn ApplyBridgeConfig_RejectsOutOfRangeRootGuardTimeout() {
        let mut engine = test_engine();
        let result = engine.apply_config(ConfigMessage::BridgeConfig(BridgeConfigMessage {
            opcode: Opcode::Set,
            stp_mode: StpMode::Pvstp,
            rootguard_timeout: 1,
            base_mac: LOCAL_MAC,
        }));
        assert!(result.is_err());
    }
}
