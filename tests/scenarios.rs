//! Integration tests for the scenarios and invariants in spec.md §8,
//! driven through the public [`Engine`] surface with the test-double
//! collaborators from `transport.rs`.

use pvst_core::bpdu::{self, ConfigBpdu, VERSION_CLASSIC};
use pvst_core::data_link::mac_address::MacAddress;
use pvst_core::engine::Engine;
use pvst_core::ids::{BridgeId, PortId};
use pvst_core::instance::{InstanceState, PortRole, PortState};
use pvst_core::management::{ConfigMessage, Opcode, PortConfigMessage, VlanConfigMessage, VlanPortMember, TagMode};
use pvst_core::transport::{NullTransport, RecordingPublisher, StaticPortDatabase};

const LOCAL_MAC: MacAddress = [0xaa, 0, 0, 0, 0, 1];
const FAST_FORWARD_DELAY: u8 = 4;
const FAST_HELLO: u8 = 1;
const FAST_MAX_AGE: u8 = 6;

type TestEngine = Engine<NullTransport, StaticPortDatabase, RecordingPublisher>;

fn new_engine() -> TestEngine {
    Engine::new(
        16,
        LOCAL_MAC,
        true,
        NullTransport::default(),
        StaticPortDatabase::new(LOCAL_MAC),
        RecordingPublisher::default(),
    )
}

fn vlan_with_ports(engine: &mut TestEngine, vlan_id: u16, intf_names: &[&str]) {
    let members = intf_names
        .iter()
        .map(|name| VlanPortMember {
            intf_name: (*name).into(),
            mode: TagMode::Tagged,
            enabled: true,
        })
        .collect();
    engine
        .apply_config(ConfigMessage::VlanConfig(VlanConfigMessage {
            opcode: Opcode::Set,
            new_instance: true,
            vlan_id,
            inst_id: vlan_id,
            forward_delay: FAST_FORWARD_DELAY,
            hello_time: FAST_HELLO,
            max_age: FAST_MAX_AGE,
            priority: 32768,
            members,
        }))
        .unwrap();
}

fn superior_bpdu(root_priority: u16, root_mac: MacAddress, sender_port: PortId) -> ConfigBpdu {
    ConfigBpdu {
        version: VERSION_CLASSIC,
        topology_change: false,
        topology_change_ack: false,
        root_id: BridgeId::new(root_priority, root_mac),
        root_path_cost: 0,
        bridge_id: BridgeId::new(root_priority, root_mac),
        port_id: sender_port,
        message_age: 0,
        max_age: FAST_MAX_AGE,
        hello_time: FAST_HELLO,
        forward_delay: FAST_FORWARD_DELAY,
    }
}

fn tick_many(engine: &mut TestEngine, count: u32) {
    for t in 0..count {
        engine.tick(t);
    }
}

/// S1: a superior BPDU arriving on one port makes it root port; that port
/// walks Listening -> Learning -> Forwarding, while uncontested ports
/// remain Designated/Blocking-free.
#[test]
fn S1_SingleBridgeRootElection_RootPortWalksToForwarding() {
    let mut engine = new_engine();
    vlan_with_ports(&mut engine, 10, &["eth1", "eth2", "eth3"]);

    let root_port_num = engine.port_number("eth3").unwrap();
    let bpdu = superior_bpdu(8192, [0xaa, 0, 0, 0, 0, 9], PortId::new(8, 1));
    let frame = bpdu::encode_pvst_config(&bpdu, [0xaa, 0, 0, 0, 0, 9], 10);
    engine.rx(root_port_num, &frame);

    let inst = engine.instance(10).unwrap();
    assert!(!inst.bridge.is_root());
    assert_eq!(inst.port(root_port_num).role, Some(PortRole::Root));

    // Advance enough instance-ticks (each instance ticks every 5 scheduler
    // ticks, spec.md §4.5) to walk through two forward-delay periods.
    tick_many(&mut engine, 5 * (FAST_FORWARD_DELAY as u32) * 2 * 2 + 10);

    let inst = engine.instance(10).unwrap();
    assert_eq!(inst.port(root_port_num).state, PortState::Forwarding);
    for name in ["eth1", "eth2"] {
        let port = engine.port_number(name).unwrap();
        assert_ne!(inst.port(port).state, PortState::Disabled);
    }
}

/// S2: Root Guard blocks a port on a superior BPDU and releases it once
/// `root_protect_timeout` elapses with no further superior announcement.
#[test]
fn S2_RootGuard_BlocksThenReleasesAfterTimeout() {
    let mut engine = new_engine();
    vlan_with_ports(&mut engine, 20, &["eth5"]);
    engine
        .apply_config(ConfigMessage::PortConfig(PortConfigMessage {
            opcode: Opcode::Set,
            intf_name: "eth5".into(),
            enabled: true,
            root_guard: true,
            bpdu_guard: false,
            bpdu_guard_do_disable: false,
            portfast: false,
            uplink_fast: false,
            path_cost: 4,
            priority: 128,
            vlans: vec![],
        }))
        .unwrap();

    let port = engine.port_number("eth5").unwrap();
    let bpdu = superior_bpdu(0, [0; 6], PortId::new(8, 1));
    let frame = bpdu::encode_pvst_config(&bpdu, [0; 6], 20);
    engine.rx(port, &frame);

    let inst = engine.instance(20).unwrap();
    assert_eq!(inst.port(port).state, PortState::Blocking);
    assert!(inst.port(port).root_protect.is_active());
    assert!(engine.instance(20).unwrap().bridge.is_root());

    // Root-protect timeout is seconds*2 ticks; default is 30s unless set
    // explicitly, so advance comfortably past it.
    tick_many(&mut engine, 5 * 70);

    let inst = engine.instance(20).unwrap();
    assert!(!inst.port(port).root_protect.is_active());
}

/// S3: BPDU Guard with do-disable trips on any frame without running STP
/// processing on it.
#[test]
fn S3_BpduGuardDoDisable_DisablesPortWithoutProcessing() {
    let mut engine = new_engine();
    vlan_with_ports(&mut engine, 30, &["eth7"]);
    engine
        .apply_config(ConfigMessage::PortConfig(PortConfigMessage {
            opcode: Opcode::Set,
            intf_name: "eth7".into(),
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

    let port = engine.port_number("eth7").unwrap();
    let bpdu = superior_bpdu(0, [0; 6], PortId::new(8, 1));
    let frame = bpdu::encode_pvst_config(&bpdu, [0; 6], 30);
    let rx_before = engine.instance(30).unwrap().port(port).rx_config_bpdu;
    engine.rx(port, &frame);

    assert_eq!(engine.instance(30).unwrap().port(port).rx_config_bpdu, rx_before);
}

/// S4: a non-root bridge signals topology change and starts retransmitting
/// TCNs on its root port when a port goes down.
#[test]
fn S4_TcnPropagation_StartsOnPortDown() {
    let mut engine = new_engine();
    vlan_with_ports(&mut engine, 40, &["eth1", "eth2"]);

    let root_facing = engine.port_number("eth1").unwrap();
    let bpdu = superior_bpdu(4096, [0xaa, 0, 0, 0, 0, 9], PortId::new(8, 1));
    let frame = bpdu::encode_pvst_config(&bpdu, [0xaa, 0, 0, 0, 0, 9], 40);
    engine.rx(root_facing, &frame);
    assert!(!engine.instance(40).unwrap().bridge.is_root());

    engine
        .apply_config(ConfigMessage::VlanConfig(VlanConfigMessage {
            opcode: Opcode::Set,
            new_instance: false,
            vlan_id: 40,
            inst_id: 40,
            forward_delay: FAST_FORWARD_DELAY,
            hello_time: FAST_HELLO,
            max_age: FAST_MAX_AGE,
            priority: 32768,
            members: vec![VlanPortMember {
                intf_name: "eth2".into(),
                mode: TagMode::Tagged,
                enabled: false,
            }],
        }))
        .unwrap();

    let inst = engine.instance(40).unwrap();
    assert!(inst.bridge.topology_change_detected);
    assert!(inst.tcn_timer.is_active());
}

/// S5: a VLAN-1 untagged port transmits both a tagged PVST+ frame and an
/// untagged classic frame for interoperability.
#[test]
fn S5_PvstVlan1_SendsBothTaggedAndUntaggedFrames() {
    let mut engine = new_engine();
    engine
        .apply_config(ConfigMessage::VlanConfig(VlanConfigMessage {
            opcode: Opcode::Set,
            new_instance: true,
            vlan_id: 1,
            inst_id: 1,
            forward_delay: FAST_FORWARD_DELAY,
            hello_time: FAST_HELLO,
            max_age: FAST_MAX_AGE,
            priority: 32768,
            members: vec![VlanPortMember {
                intf_name: "eth0".into(),
                mode: TagMode::Untagged,
                enabled: true,
            }],
        }))
        .unwrap();

    // One instance-tick (five scheduler ticks) is enough to fire the
    // initial hello and exercise transmission.
    tick_many(&mut engine, 6);

    let sent = &engine.transport().sent;
    let tagged = sent.iter().any(|(_, _, _, tagged)| *tagged);
    let untagged = sent.iter().any(|(_, _, _, tagged)| !*tagged);
    assert!(tagged, "expected a tagged PVST+ frame on VLAN 1");
    assert!(untagged, "expected an untagged classic BPDU on VLAN 1");
}

/// S6: a PortFast port skips straight to Forwarding, then drops back to
/// Listening the moment it receives any valid BPDU.
#[test]
fn S6_PortFast_SkipsToForwardingThenRevertsOnBpdu() {
    let mut engine = new_engine();
    engine
        .apply_config(ConfigMessage::PortConfig(PortConfigMessage {
            opcode: Opcode::Set,
            intf_name: "eth9".into(),
            enabled: true,
            root_guard: false,
            bpdu_guard: false,
            bpdu_guard_do_disable: false,
            portfast: true,
            uplink_fast: false,
            path_cost: 4,
            priority: 128,
            vlans: vec![],
        }))
        .unwrap();
    vlan_with_ports(&mut engine, 50, &["eth9"]);

    let port = engine.port_number("eth9").unwrap();
    assert_eq!(engine.instance(50).unwrap().port(port).state, PortState::Forwarding);

    let bpdu = superior_bpdu(4096, [0xaa, 0, 0, 0, 0, 9], PortId::new(8, 1));
    let frame = bpdu::encode_pvst_config(&bpdu, [0xaa, 0, 0, 0, 0, 9], 50);
    engine.rx(port, &frame);

    let inst = engine.instance(50).unwrap();
    assert!(!inst.port(port).oper_edge);
    assert_eq!(inst.port(port).state, PortState::Listening);
}

/// Cross-cutting invariants (spec.md §8): checked after driving the engine
/// through a run of scheduler ticks with a contested root port.
#[test]
fn Invariants_HoldAfterManyTicksWithContestedRoot() {
    let mut engine = new_engine();
    vlan_with_ports(&mut engine, 60, &["eth1", "eth2"]);

    let root_facing = engine.port_number("eth1").unwrap();
    let bpdu = superior_bpdu(4096, [0xaa, 0, 0, 0, 0, 9], PortId::new(8, 1));
    let frame = bpdu::encode_pvst_config(&bpdu, [0xaa, 0, 0, 0, 0, 9], 60);
    engine.rx(root_facing, &frame);

    tick_many(&mut engine, 200);

    let inst = engine.instance(60).unwrap();
    assert_eq!(inst.state, InstanceState::Active);
    // Invariant 4: topology_change_detected implies fast_aging, and they
    // clear together.
    assert_eq!(inst.bridge.topology_change_detected, inst.fast_aging);

    if inst.bridge.root_port.is_none() {
        assert_eq!(inst.bridge.root_id, inst.bridge.bridge_id);
        assert_eq!(inst.bridge.root_path_cost, 0);
    }

    for port in [engine.port_number("eth1").unwrap(), engine.port_number("eth2").unwrap()] {
        let p = inst.port(port);
        let is_forwarding = p.state == PortState::Forwarding;
        let kernel_forward = matches!(p.kernel_state, pvst_core::instance::KernelPortState::Forward);
        assert_eq!(is_forwarding, kernel_forward);

        if p.role == Some(PortRole::Designated) {
            assert_eq!(p.designated_bridge, inst.bridge.bridge_id);
            assert_eq!(p.designated_cost, inst.bridge.root_path_cost);
        }
    }
}
