//! Per-VLAN instance table data (spec §3, §4.3): [`BridgeData`], [`StpPort`]
//! and [`StpInstance`], stored in the engine as a fixed-capacity dense array
//! indexed by `StpIndex` (design notes §9 — "arrays instead of pointer
//! graphs").

use crate::bpdu::ConfigBpdu;
use crate::ids::{BridgeId, PortId};
use crate::mask::{PortMask, MAX_PORTS};
use crate::timer::Timer;

/// Index of a [`StpInstance`] within the engine's instance table.
pub type StpIndex = usize;

/// A physical port number, `0..MAX_PORTS`.
pub type PortNumber = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Free,
    Config,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Disabled,
    Blocking,
    Listening,
    Learning,
    Forwarding,
}

impl PortState {
    /// The human-readable state name used in published records (spec §6.3).
    pub fn as_display_str(&self) -> &'static str {
        match self {
            PortState::Disabled => "DISABLED",
            PortState::Blocking => "BLOCKING",
            PortState::Listening => "LISTENING",
            PortState::Learning => "LEARNING",
            PortState::Forwarding => "FORWARDING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelPortState {
    Blocking,
    Forward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRole {
    Root,
    Designated,
    Alternate,
}

/// Bits of [`BridgeData`] that have changed since the last publication.
pub mod bridge_dirty {
    pub const ROOT: u32 = 1 << 0;
    pub const TIMERS: u32 = 1 << 1;
    pub const TOPOLOGY_CHANGE: u32 = 1 << 2;
    pub const BRIDGE_ID: u32 = 1 << 3;
    pub const ALL: u32 = ROOT | TIMERS | TOPOLOGY_CHANGE | BRIDGE_ID;
}

/// Bits of [`StpPort`] that have changed since the last publication.
pub mod port_dirty {
    pub const STATE: u32 = 1 << 0;
    pub const ROLE: u32 = 1 << 1;
    pub const DESIGNATED: u32 = 1 << 2;
    pub const COUNTERS: u32 = 1 << 3;
    pub const ALL: u32 = STATE | ROLE | DESIGNATED | COUNTERS;
}

/// A small changed-fields bitmask, shared by [`BridgeData`] and [`StpPort`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dirty(u32);

impl Dirty {
    pub const fn new() -> Self {
        Dirty(0)
    }

    pub fn mark(&mut self, bits: u32) {
        self.0 |= bits;
    }

    pub fn is_dirty(&self) -> bool {
        self.0 != 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Returns the current bits and clears them, for use by the publication
    /// step which flushes dirty fields after every instance update.
    pub fn take(&mut self) -> u32 {
        let bits = self.0;
        self.0 = 0;
        bits
    }
}

/// Per-VLAN bridge data (spec §3).
#[derive(Debug, Clone)]
pub struct BridgeData {
    pub bridge_id: BridgeId,
    pub root_id: BridgeId,
    pub root_path_cost: u32,
    pub root_port: Option<PortId>,

    pub max_age: u8,
    pub hello_time: u8,
    pub forward_delay: u8,
    pub hold_time: u8,

    pub bridge_max_age: u8,
    pub bridge_hello_time: u8,
    pub bridge_forward_delay: u8,

    pub topology_change_count: u32,
    pub topology_change_tick: u32,
    pub topology_change_time: u32,
    pub topology_change_detected: bool,
    pub topology_change: bool,

    pub dirty: Dirty,
}

pub const DEFAULT_MAX_AGE: u8 = 20;
pub const DEFAULT_HELLO_TIME: u8 = 2;
pub const DEFAULT_FORWARD_DELAY: u8 = 15;
pub const DEFAULT_HOLD_TIME: u8 = 1;
pub const FASTSPAN_FORWARD_DELAY: u8 = 2;
pub const FASTUPLINK_FORWARD_DELAY: u8 = 1;

impl BridgeData {
    pub fn new(bridge_id: BridgeId) -> Self {
        BridgeData {
            bridge_id,
            root_id: bridge_id,
            root_path_cost: 0,
            root_port: None,
            max_age: DEFAULT_MAX_AGE,
            hello_time: DEFAULT_HELLO_TIME,
            forward_delay: DEFAULT_FORWARD_DELAY,
            hold_time: DEFAULT_HOLD_TIME,
            bridge_max_age: DEFAULT_MAX_AGE,
            bridge_hello_time: DEFAULT_HELLO_TIME,
            bridge_forward_delay: DEFAULT_FORWARD_DELAY,
            topology_change_count: 0,
            topology_change_tick: 0,
            topology_change_time: 0,
            topology_change_detected: false,
            topology_change: false,
            dirty: Dirty::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.root_port.is_none()
    }
}

/// Per-port STP state within one VLAN instance (spec §3).
#[derive(Debug, Clone)]
pub struct StpPort {
    pub port_id: PortId,
    pub state: PortState,
    pub role: Option<PortRole>,
    pub path_cost: u32,

    pub designated_root: BridgeId,
    pub designated_cost: u32,
    pub designated_bridge: BridgeId,
    pub designated_port: PortId,

    pub message_age: Timer,
    pub forward_delay: Timer,
    pub hold: Timer,
    pub root_protect: Timer,

    pub topology_change_acknowledge: bool,
    pub config_pending: bool,
    pub change_detection_enabled: bool,
    pub self_loop: bool,
    pub auto_config: bool,
    pub oper_edge: bool,

    pub kernel_state: KernelPortState,

    pub rx_config_bpdu: u32,
    pub tx_config_bpdu: u32,
    pub rx_tcn_bpdu: u32,
    pub tx_tcn_bpdu: u32,
    pub forward_transitions: u32,
    pub rx_drop_bpdu: u32,

    pub dirty: Dirty,
}

impl StpPort {
    pub fn new(number: PortNumber) -> Self {
        let port_id = PortId::new(0, number as u16);
        StpPort {
            port_id,
            state: PortState::Disabled,
            role: None,
            path_cost: 0,
            designated_root: BridgeId::new(0, [0; 6]),
            designated_cost: 0,
            designated_bridge: BridgeId::new(0, [0; 6]),
            designated_port: port_id,
            message_age: Timer::new(),
            forward_delay: Timer::new(),
            hold: Timer::new(),
            root_protect: Timer::new(),
            topology_change_acknowledge: false,
            config_pending: false,
            change_detection_enabled: false,
            self_loop: false,
            auto_config: false,
            oper_edge: false,
            kernel_state: KernelPortState::Blocking,
            rx_config_bpdu: 0,
            tx_config_bpdu: 0,
            rx_tcn_bpdu: 0,
            tx_tcn_bpdu: 0,
            forward_transitions: 0,
            rx_drop_bpdu: 0,
            dirty: Dirty::new(),
        }
    }

    pub fn number(&self) -> PortNumber {
        self.port_id.number() as PortNumber
    }

    /// Sets state, updates `forward_transitions`/`kernel_state` and marks
    /// the state dirty. Central so the invariant "Forwarding iff
    /// kernel_state == Forward" (spec §3, §8 invariant 1) can never be
    /// violated by a direct field write.
    pub fn set_state(&mut self, state: PortState) {
        if self.state == state {
            return;
        }
        if state == PortState::Forwarding {
            self.forward_transitions += 1;
        }
        self.kernel_state = if state == PortState::Forwarding {
            KernelPortState::Forward
        } else {
            KernelPortState::Blocking
        };
        self.state = state;
        self.dirty.mark(port_dirty::STATE);
    }

    pub fn set_role(&mut self, role: Option<PortRole>) {
        if self.role != role {
            self.role = role;
            self.dirty.mark(port_dirty::ROLE);
        }
    }
}

/// One VLAN's full Spanning Tree state (spec §3).
pub struct StpInstance {
    pub vlan_id: u16,
    pub state: InstanceState,
    pub bridge: BridgeData,

    pub enable_mask: PortMask,
    pub control_mask: PortMask,
    pub untag_mask: PortMask,

    pub hello_timer: Timer,
    pub tcn_timer: Timer,
    pub topology_change_timer: Timer,

    pub rx_drop_bpdu: u32,
    pub fast_aging: bool,
    pub last_bpdu_rx_time: u32,

    pub ports: Vec<StpPort>,
}

impl StpInstance {
    /// Builds a `Free` instance with no VLAN assigned yet.
    pub fn free() -> Self {
        StpInstance {
            vlan_id: 0,
            state: InstanceState::Free,
            bridge: BridgeData::new(BridgeId::new(0, [0; 6])),
            enable_mask: PortMask::empty(),
            control_mask: PortMask::empty(),
            untag_mask: PortMask::empty(),
            hello_timer: Timer::new(),
            tcn_timer: Timer::new(),
            topology_change_timer: Timer::new(),
            rx_drop_bpdu: 0,
            fast_aging: false,
            last_bpdu_rx_time: 0,
            ports: (0..MAX_PORTS).map(StpPort::new).collect(),
        }
    }

    pub fn port(&self, number: PortNumber) -> &StpPort {
        &self.ports[number]
    }

    pub fn port_mut(&mut self, number: PortNumber) -> &mut StpPort {
        &mut self.ports[number]
    }

    /// Enabled ports other than `except`, for "no other enabled port"-style
    /// scans (e.g. UplinkFast eligibility in §4.4).
    pub fn other_enabled_ports(&self, except: PortNumber) -> impl Iterator<Item = &StpPort> + '_ {
        self.enable_mask
            .iter()
            .filter(move |p| *p != except)
            .map(move |p| &self.ports[p])
    }

    /// Brings a VLAN instance into `Config` state with a fresh bridge
    /// identity and default timers (802.1D `initialize_stp_class`).
    pub fn initialize_bridge(&mut self, vlan_id: u16, priority_class: u16, base_mac: crate::data_link::mac_address::MacAddress) {
        self.vlan_id = vlan_id;
        self.state = InstanceState::Config;
        let bridge_id = BridgeId::from_parts(priority_class, vlan_id, base_mac);
        self.bridge = BridgeData::new(bridge_id);
        self.bridge.dirty.mark(bridge_dirty::ALL);
    }

    /// Zeroes a port's record and applies defaults (802.1D
    /// `initialize_control_port`).
    pub fn initialize_control_port(&mut self, port_num: PortNumber, default_path_cost: u32) {
        let mut p = StpPort::new(port_num);
        p.path_cost = default_path_cost;
        p.change_detection_enabled = true;
        p.auto_config = true;
        self.ports[port_num] = p;
        self.control_mask.set(port_num);
    }

    /// Brings a control port into service: adds it to `enable_mask`,
    /// re-initializes its dynamic fields and re-derives roles/states.
    pub fn enable_port(&mut self, port_num: PortNumber, portfast_admin: bool, uplinkfast_admin_mask: &PortMask) {
        self.enable_mask.set(port_num);
        {
            let own_bid = self.bridge.bridge_id;
            let p = self.port_mut(port_num);
            p.oper_edge = portfast_admin;
            p.message_age.stop();
            p.forward_delay.stop();
            p.hold.stop();
            p.root_protect.stop();
            p.topology_change_acknowledge = false;
            p.config_pending = false;
            p.designated_root = own_bid;
            p.designated_cost = 0;
            p.designated_bridge = own_bid;
            p.designated_port = p.port_id;
            p.set_state(PortState::Blocking);
        }
        self.configuration_update();
        self.port_state_selection(uplinkfast_admin_mask);
    }

    /// Takes a port out of service (802.1D `disable_port`). Returns `true`
    /// if this bridge just became root as a result, so the caller can
    /// restart `hello_timer` and regenerate BPDUs.
    pub fn disable_port(&mut self, port_num: PortNumber, uplinkfast_admin_mask: &PortMask) -> bool {
        let was_root = self.bridge.is_root();
        let own_bid = self.bridge.bridge_id;
        {
            let p = self.port_mut(port_num);
            p.set_state(PortState::Disabled);
            p.set_role(None);
            p.message_age.stop();
            p.forward_delay.stop();
            p.hold.stop();
            p.root_protect.stop();
            p.self_loop = false;
            p.designated_root = own_bid;
            p.designated_cost = 0;
            p.designated_bridge = own_bid;
            p.designated_port = p.port_id;
        }
        self.enable_mask.clear(port_num);
        self.control_mask.clear(port_num);

        self.configuration_update();
        self.port_state_selection(uplinkfast_admin_mask);

        let became_root = !was_root && self.bridge.is_root();
        if became_root {
            self.hello_timer.start(0);
        }
        self.topology_change_detection_local();
        became_root
    }

    /// Root selection and designated-info propagation (802.1D
    /// `configuration_update`): picks the enabled port whose advertised
    /// `(root_id, cost, designated_bridge, designated_port, port_id)` tuple
    /// is lexicographically minimal, treating this bridge's own identity as
    /// a candidate with cost 0. Every other enabled port then has the
    /// bridge's own identity stamped into its `designated_*` fields; a port
    /// only keeps that claim in `port_state_selection` if no neighbour has
    /// since overridden it with better information.
    pub fn configuration_update(&mut self) {
        let own_bid = self.bridge.bridge_id;
        let self_candidate = RootCandidate {
            root_id: own_bid,
            cost: 0,
            designated_bridge: own_bid,
            designated_port: PortId::new(0x0F, 0x0FFF),
            port_id: PortId::new(0x0F, 0x0FFF),
        };

        let mut best_port: Option<PortNumber> = None;
        let mut best = self_candidate;
        for port_num in self.enable_mask.iter() {
            let p = &self.ports[port_num];
            let candidate = RootCandidate {
                root_id: p.designated_root,
                cost: p.designated_cost.saturating_add(p.path_cost),
                designated_bridge: p.designated_bridge,
                designated_port: p.designated_port,
                port_id: p.port_id,
            };
            if candidate < best {
                best = candidate;
                best_port = Some(port_num);
            }
        }

        let new_root_port = best_port.map(|n| self.ports[n].port_id);
        if self.bridge.root_port != new_root_port {
            self.bridge.dirty.mark(bridge_dirty::ROOT);
        }
        self.bridge.root_id = best.root_id;
        self.bridge.root_path_cost = best.cost;
        self.bridge.root_port = new_root_port;

        let root_id = self.bridge.root_id;
        let root_path_cost = self.bridge.root_path_cost;
        let bridge_id = self.bridge.bridge_id;
        for port_num in self.enable_mask.iter() {
            if Some(port_num) == best_port {
                continue;
            }
            let p = &mut self.ports[port_num];
            // Only claim this port as ours if our own candidacy (as the
            // bridge that would become designated here) beats whatever is
            // already stored, or we already held the claim. Otherwise a
            // neighbour's superior info stays in place so the port resolves
            // to Alternate below rather than being overwritten as ours.
            let already_ours = p.designated_bridge == bridge_id;
            let self_claim = BpduInfo {
                root_id,
                cost: root_path_cost,
                designated_bridge: bridge_id,
                designated_port: p.port_id,
            };
            let stored = BpduInfo {
                root_id: p.designated_root,
                cost: p.designated_cost,
                designated_bridge: p.designated_bridge,
                designated_port: p.designated_port,
            };
            if already_ours || self_claim <= stored {
                p.designated_root = root_id;
                p.designated_cost = root_path_cost;
                p.designated_bridge = bridge_id;
                p.designated_port = p.port_id;
                p.dirty.mark(port_dirty::DESIGNATED);
            }
        }
    }

    /// Role and state assignment for every enabled port (802.1D
    /// `port_state_selection`).
    pub fn port_state_selection(&mut self, uplinkfast_admin_mask: &PortMask) {
        let own_bid = self.bridge.bridge_id;
        let root_port = self.bridge.root_port;

        let ports: Vec<PortNumber> = self.enable_mask.iter().collect();
        for port_num in ports {
            let role = {
                let p = &self.ports[port_num];
                if root_port == Some(p.port_id) {
                    PortRole::Root
                } else if p.designated_bridge == own_bid && p.designated_port == p.port_id {
                    PortRole::Designated
                } else {
                    PortRole::Alternate
                }
            };

            let portfast = self.ports[port_num].oper_edge;
            let uplinkfast = uplinkfast_admin_mask.get(port_num)
                && !self.other_uplinkfast_active(port_num, uplinkfast_admin_mask);

            let p = &mut self.ports[port_num];
            p.set_role(Some(role));

            match role {
                PortRole::Root | PortRole::Designated => {
                    if p.state == PortState::Blocking || p.state == PortState::Disabled {
                        if portfast {
                            p.set_state(PortState::Forwarding);
                            p.forward_delay.stop();
                        } else {
                            let limit = forward_delay_ticks(self.bridge.forward_delay, uplinkfast);
                            p.set_state(PortState::Listening);
                            p.forward_delay.start(0);
                            let _ = limit; // limit applied by tick_timers each expiry
                        }
                    }
                }
                PortRole::Alternate => {
                    p.set_state(PortState::Blocking);
                    p.forward_delay.stop();
                }
            }
        }
    }

    fn other_uplinkfast_active(&self, except: PortNumber, uplinkfast_admin_mask: &PortMask) -> bool {
        uplinkfast_admin_mask
            .iter()
            .filter(|p| *p != except)
            .any(|p| {
                let state = self.ports[p].state;
                state != PortState::Blocking && state != PortState::Disabled
            })
    }

    /// Marks a topology change as detected (802.1D
    /// `topology_change_detection`). Returns the root port to immediately
    /// transmit a TCN on, if this bridge is not the root.
    pub fn topology_change_detection_local(&mut self) -> Option<PortId> {
        if self.bridge.topology_change_detected {
            return None;
        }
        self.bridge.topology_change_detected = true;
        self.bridge.dirty.mark(bridge_dirty::TOPOLOGY_CHANGE);
        self.fast_aging = true;

        if self.bridge.is_root() {
            self.bridge.topology_change = true;
            self.topology_change_timer.start(0);
            None
        } else {
            self.tcn_timer.start(0);
            self.bridge.root_port
        }
    }

    /// Applies a received Configuration BPDU (802.1D `received_config_bpdu`).
    /// Root Guard is honoured before any other processing.
    pub fn received_config_bpdu(
        &mut self,
        port_num: PortNumber,
        bpdu: &ConfigBpdu,
        root_guard: bool,
    ) -> ConfigBpduOutcome {
        let stored = {
            let p = &self.ports[port_num];
            BpduInfo {
                root_id: p.designated_root,
                cost: p.designated_cost,
                designated_bridge: p.designated_bridge,
                designated_port: p.designated_port,
            }
        };
        let incoming = BpduInfo {
            root_id: bpdu.root_id,
            cost: bpdu.root_path_cost,
            designated_bridge: bpdu.bridge_id,
            designated_port: bpdu.port_id,
        };
        let strictly_better = incoming < stored;

        if strictly_better && root_guard {
            let p = self.port_mut(port_num);
            p.set_state(PortState::Blocking);
            p.root_protect.start(0);
            return ConfigBpduOutcome::RootGuardBlocked;
        }

        let max_age = self.bridge.max_age;
        let port_id = self.ports[port_num].port_id;

        // A TC-ACK on the root port means the designated bridge upstream has
        // seen our notification; stop notifying (802.1D `received_config_bpdu`).
        if bpdu.topology_change_ack && Some(port_id) == self.bridge.root_port {
            self.bridge.topology_change_detected = false;
            self.bridge.dirty.mark(bridge_dirty::TOPOLOGY_CHANGE);
            self.fast_aging = false;
            self.tcn_timer.stop();
        }

        let p = self.port_mut(port_num);
        // Any valid config BPDU disqualifies PortFast operational on this
        // port, per the scenario in which PortFast must re-enter Listening
        // the moment a real bridge is detected; this subsumes the v2-only
        // reading of 802.1D's text. A port that had already jumped straight
        // to Forwarding under PortFast is walked back to Listening rather
        // than left forwarding indefinitely.
        let was_edge = p.oper_edge;
        p.oper_edge = false;
        if was_edge {
            p.set_state(PortState::Listening);
            p.forward_delay.start(0);
        }

        self.last_bpdu_rx_time = self.last_bpdu_rx_time.wrapping_add(1);

        let is_refresh =
            bpdu.bridge_id == stored.designated_bridge && bpdu.port_id == stored.designated_port;
        let supersedes = strictly_better || is_refresh;

        let p = self.port_mut(port_num);
        if supersedes {
            p.designated_root = bpdu.root_id;
            p.designated_cost = bpdu.root_path_cost;
            p.designated_bridge = bpdu.bridge_id;
            p.designated_port = bpdu.port_id;
            p.dirty.mark(port_dirty::DESIGNATED);

            let clipped_age = bpdu.message_age.min(max_age);
            p.message_age.start((clipped_age as u32) * 2);
        }
        p.rx_config_bpdu += 1;
        p.dirty.mark(port_dirty::COUNTERS);

        ConfigBpduOutcome::Accepted {
            supersedes,
            topology_change: bpdu.topology_change,
        }
    }

    /// Applies a received Topology Change Notification (802.1D
    /// `received_tcn_bpdu`). Only designated ports accept TCNs.
    pub fn received_tcn_bpdu(&mut self, port_num: PortNumber) -> TcnOutcome {
        {
            let p = self.port_mut(port_num);
            if p.role != Some(PortRole::Designated) && p.role != Some(PortRole::Root) {
                return TcnOutcome::Ignored;
            }
            p.rx_tcn_bpdu += 1;
            p.topology_change_acknowledge = true;
            p.dirty.mark(port_dirty::COUNTERS);
        }

        self.bridge.topology_change_detected = true;
        self.bridge.dirty.mark(bridge_dirty::TOPOLOGY_CHANGE);
        self.fast_aging = true;

        if self.bridge.is_root() {
            self.bridge.topology_change = true;
            self.topology_change_timer.start(0);
            TcnOutcome::AcceptedAsRoot
        } else {
            self.tcn_timer.start(0);
            TcnOutcome::Propagate
        }
    }

    /// Advances every active timer in this instance by one tick (802.1D's
    /// five timer expiry handlers plus hold/root-protect), returning the
    /// set of expiries the caller (which owns I/O) must act on.
    pub fn tick_timers(&mut self, uplinkfast_admin_mask: &PortMask, root_protect_timeout_ticks: u32) -> TickEvents {
        let mut events = TickEvents::default();

        if self.hello_timer.tick((self.bridge.hello_time as u32) * 2) {
            events.hello_expired = true;
            self.hello_timer.start(0);
        }
        if self.tcn_timer.tick((self.bridge.hello_time as u32) * 2) {
            events.tcn_expired = true;
            if self.bridge.topology_change_detected {
                self.tcn_timer.start(0);
            }
        }
        if self
            .topology_change_timer
            .tick((self.bridge.max_age as u32 + self.bridge.forward_delay as u32) * 2)
        {
            self.bridge.topology_change = false;
            self.bridge.topology_change_detected = false;
            self.fast_aging = false;
            self.bridge.topology_change_count += 1;
            self.bridge.dirty.mark(bridge_dirty::TOPOLOGY_CHANGE);
            events.topology_change_expired = true;
        }

        let mut message_age_expired_any = false;
        for port_num in self.enable_mask.iter() {
            let p = &mut self.ports[port_num];
            if p.message_age.tick((self.bridge.max_age as u32) * 2) {
                let own_bid = self.bridge.bridge_id;
                p.designated_root = own_bid;
                p.designated_cost = 0;
                p.designated_bridge = own_bid;
                p.designated_port = p.port_id;
                p.dirty.mark(port_dirty::DESIGNATED);
                message_age_expired_any = true;
                events.message_age_expired.push(port_num);
            }
        }

        let portfast_ports: Vec<PortNumber> = self
            .enable_mask
            .iter()
            .filter(|p| matches!(self.ports[*p].role, Some(PortRole::Root) | Some(PortRole::Designated)))
            .collect();
        for port_num in portfast_ports {
            let uplinkfast = uplinkfast_admin_mask.get(port_num)
                && !self.other_uplinkfast_active(port_num, uplinkfast_admin_mask);
            let limit = forward_delay_ticks(self.bridge.forward_delay, uplinkfast);
            let p = &mut self.ports[port_num];
            if p.forward_delay.is_active() && p.forward_delay.tick(limit) {
                match p.state {
                    PortState::Listening => {
                        p.set_state(PortState::Learning);
                        p.forward_delay.start(0);
                    }
                    PortState::Learning => {
                        p.set_state(PortState::Forwarding);
                        events.forward_delay_reached_forwarding.push(port_num);
                    }
                    _ => {}
                }
            }
        }

        for port_num in self.enable_mask.iter() {
            let p = &mut self.ports[port_num];
            if p.hold.tick(self.bridge.hold_time as u32 * 2) {
                if p.config_pending {
                    events.hold_expired.push(port_num);
                }
                p.config_pending = false;
            }
            if p.root_protect.tick(root_protect_timeout_ticks) {
                events.root_protect_expired.push(port_num);
            }
        }

        if message_age_expired_any {
            self.configuration_update();
            self.port_state_selection(uplinkfast_admin_mask);
        }
        if !events.root_protect_expired.is_empty() {
            self.configuration_update();
            self.port_state_selection(uplinkfast_admin_mask);
        }

        events
    }
}

/// The tuple 802.1D compares lexicographically when selecting a root port
/// or evaluating a received BPDU against stored port info: `Ord` gives the
/// "lexicographically minimal" comparison directly instead of a hand-rolled
/// comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct RootCandidate {
    root_id: BridgeId,
    cost: u32,
    designated_bridge: BridgeId,
    designated_port: PortId,
    port_id: PortId,
}

/// The 4-field tuple 802.1D compares when deciding whether a received BPDU
/// "supersedes" a port's stored info, distinct from [`RootCandidate`]'s
/// 5-field form: there is no local-port tiebreak here, since we are
/// comparing a remote message against our own record, not ranking our own
/// candidate ports against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct BpduInfo {
    root_id: BridgeId,
    cost: u32,
    designated_bridge: BridgeId,
    designated_port: PortId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigBpduOutcome {
    RootGuardBlocked,
    Accepted { supersedes: bool, topology_change: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcnOutcome {
    Ignored,
    AcceptedAsRoot,
    Propagate,
}

/// Timer expiries from one [`StpInstance::tick_timers`] call that require
/// engine-level I/O (BPDU transmission, logging) to act on.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    pub hello_expired: bool,
    pub tcn_expired: bool,
    pub topology_change_expired: bool,
    pub message_age_expired: Vec<PortNumber>,
    pub forward_delay_reached_forwarding: Vec<PortNumber>,
    pub hold_expired: Vec<PortNumber>,
    pub root_protect_expired: Vec<PortNumber>,
}

/// The operative forward-delay limit, in ticks, for a port's
/// Listening/Learning walk: the bridge's configured forward delay normally,
/// or [`FASTUPLINK_FORWARD_DELAY`] under UplinkFast conditions. PortFast
/// bypasses this walk entirely rather than using [`FASTSPAN_FORWARD_DELAY`]
/// here — see `port_state_selection`.
fn forward_delay_ticks(bridge_forward_delay: u8, uplinkfast: bool) -> u32 {
    let seconds = if uplinkfast {
        FASTUPLINK_FORWARD_DELAY
    } else {
        bridge_forward_delay
    };
    seconds as u32 * 2
}
