//! External collaborator traits (spec §1, §6.3): link discovery, raw-frame
//! transport and state persistence are out of scope for this crate, but the
//! engine still needs to call them and tests still need to exercise it, so
//! their interfaces are formalized here.

use crate::cost::PortSpeed;
use crate::data_link::mac_address::MacAddress;
use crate::instance::PortNumber;
use crate::management::{PublishedInstanceRecord, PublishedPortRecord, VlanId};

/// Raw-frame egress. `tagged` selects whether the frame is sent with an
/// 802.1Q tag for `vlan` or untagged (spec §4.6's "egress tag mode from the
/// untag mask").
pub trait Transport {
    fn tx(&mut self, port: PortNumber, vlan: VlanId, bytes: Vec<u8>, tagged: bool);
}

/// Link/interface discovery, populated externally from kernel link events
/// (spec §1).
pub trait PortDatabase {
    fn port_up(&self, port: PortNumber) -> bool;
    fn port_speed(&self, port: PortNumber) -> PortSpeed;
    fn port_mac(&self, port: PortNumber) -> MacAddress;
}

/// State publication (spec §6.3): pushed on every instance or port change,
/// carrying the modified fields only.
pub trait StatePublisher {
    fn publish_instance(&mut self, record: PublishedInstanceRecord);
    fn publish_port(&mut self, record: PublishedPortRecord);
}

/// A [`Transport`] that records every frame it was asked to send, for test
/// assertions, and otherwise does nothing.
#[derive(Debug, Default)]
pub struct NullTransport {
    pub sent: Vec<(PortNumber, VlanId, Vec<u8>, bool)>,
}

impl Transport for NullTransport {
    fn tx(&mut self, port: PortNumber, vlan: VlanId, bytes: Vec<u8>, tagged: bool) {
        self.sent.push((port, vlan, bytes, tagged));
    }
}

/// A [`PortDatabase`] backed by a fixed table, for tests and the demo
/// daemon. Every port defaults to up at 1 Gb/s.
pub struct StaticPortDatabase {
    up: [bool; crate::mask::MAX_PORTS],
    speed: [PortSpeed; crate::mask::MAX_PORTS],
    mac: MacAddress,
}

impl StaticPortDatabase {
    pub fn new(mac: MacAddress) -> Self {
        StaticPortDatabase {
            up: [true; crate::mask::MAX_PORTS],
            speed: [PortSpeed::Gb1; crate::mask::MAX_PORTS],
            mac,
        }
    }

    pub fn set_up(&mut self, port: PortNumber, up: bool) {
        self.up[port] = up;
    }

    pub fn set_speed(&mut self, port: PortNumber, speed: PortSpeed) {
        self.speed[port] = speed;
    }
}

impl PortDatabase for StaticPortDatabase {
    fn port_up(&self, port: PortNumber) -> bool {
        self.up[port]
    }

    fn port_speed(&self, port: PortNumber) -> PortSpeed {
        self.speed[port]
    }

    fn port_mac(&self, _port: PortNumber) -> MacAddress {
        self.mac
    }
}

/// A [`StatePublisher`] that records every record it receives, for test
/// assertions.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    pub instances: Vec<PublishedInstanceRecord>,
    pub ports: Vec<PublishedPortRecord>,
}

impl StatePublisher for RecordingPublisher {
    fn publish_instance(&mut self, record: PublishedInstanceRecord) {
        self.instances.push(record);
    }

    fn publish_port(&mut self, record: PublishedPortRecord) {
        self.ports.push(record);
    }
}
