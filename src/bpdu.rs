//! BPDU wire codec (spec §4.2, §6.2).
//!
//! This is the *only* module that touches network byte order (design notes
//! §9): everything upstream of [`decode_classic_config`] /
//! [`decode_pvst_config`] works in host order, and everything downstream of
//! [`encode_classic_config`] / [`encode_pvst_config`] is ready-to-transmit
//! bytes.
//!
//! Four wire shapes are supported, matching spec §4.2 exactly:
//! classic STP config, classic STP TCN, PVST+ config, PVST+ TCN.

use crate::data_link::mac_address::MacAddress;
use crate::error::StpError;
use crate::ids::{BridgeId, PortId};
use crate::{mac_pvst_addr, mac_stp_addr};

pub const PROTOCOL_ID: u16 = 0x0000;
pub const VERSION_CLASSIC: u8 = 0;
pub const VERSION_RSTP: u8 = 2;
pub const BPDU_TYPE_CONFIG: u8 = 0x00;
pub const BPDU_TYPE_TCN: u8 = 0x80;

pub const PVST_SNAP_OUI: [u8; 3] = [0x00, 0x00, 0x0C];
pub const PVST_SNAP_PROTOCOL_ID: u16 = 0x010B;

/// Minimum hello time, in seconds. A wire `hello_time` field below
/// `MIN_HELLO_TIME << 8` (the same threshold in 1/256s units) is silently
/// repaired to [`DEFAULT_HELLO_TIME`], per spec §4.2.
pub const MIN_HELLO_TIME: u8 = 1;
pub const DEFAULT_HELLO_TIME: u8 = 2;

const FLAG_TOPOLOGY_CHANGE: u8 = 0x01;
const FLAG_TOPOLOGY_CHANGE_ACK: u8 = 0x80;

/// A decoded Configuration BPDU, fully in host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigBpdu {
    pub version: u8,
    pub topology_change: bool,
    pub topology_change_ack: bool,
    pub root_id: BridgeId,
    pub root_path_cost: u32,
    pub bridge_id: BridgeId,
    pub port_id: PortId,
    /// Seconds, already shifted down from the wire's 1/256s units.
    pub message_age: u8,
    pub max_age: u8,
    pub hello_time: u8,
    pub forward_delay: u8,
}

/// A decoded Topology Change Notification BPDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcnBpdu {
    pub version: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bpdu {
    Config(ConfigBpdu),
    Tcn(TcnBpdu),
}

impl Bpdu {
    pub fn version(&self) -> u8 {
        match self {
            Bpdu::Config(c) => c.version,
            Bpdu::Tcn(t) => t.version,
        }
    }
}

fn is_recognized_version(version: u8) -> bool {
    version == VERSION_CLASSIC || version == VERSION_RSTP
}

fn encode_bridge_id(id: &BridgeId, out: &mut Vec<u8>) {
    out.extend_from_slice(&id.priority_word().to_be_bytes());
    out.extend_from_slice(&id.mac());
}

fn decode_bridge_id(bytes: &[u8]) -> BridgeId {
    let priority = u16::from_be_bytes([bytes[0], bytes[1]]);
    let mac: MacAddress = [bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]];
    BridgeId::new(priority, mac)
}

/// Repairs an out-of-range wire hello time to the default, per spec §4.2.
/// `wire_hello_time` is in 1/256s units, matching the field on the wire.
fn repair_hello_time(wire_hello_time: u16) -> u16 {
    if wire_hello_time < (MIN_HELLO_TIME as u16) << 8 {
        (DEFAULT_HELLO_TIME as u16) << 8
    } else {
        wire_hello_time
    }
}

fn encode_config_payload(bpdu: &ConfigBpdu, out: &mut Vec<u8>) {
    out.extend_from_slice(&PROTOCOL_ID.to_be_bytes());
    out.push(bpdu.version);
    out.push(BPDU_TYPE_CONFIG);

    let mut flags = 0u8;
    if bpdu.topology_change {
        flags |= FLAG_TOPOLOGY_CHANGE;
    }
    if bpdu.topology_change_ack {
        flags |= FLAG_TOPOLOGY_CHANGE_ACK;
    }
    out.push(flags);

    encode_bridge_id(&bpdu.root_id, out);
    out.extend_from_slice(&bpdu.root_path_cost.to_be_bytes());
    encode_bridge_id(&bpdu.bridge_id, out);
    out.extend_from_slice(&bpdu.port_id.packed().to_be_bytes());
    out.extend_from_slice(&((bpdu.message_age as u16) << 8).to_be_bytes());
    out.extend_from_slice(&((bpdu.max_age as u16) << 8).to_be_bytes());
    out.extend_from_slice(&((bpdu.hello_time as u16) << 8).to_be_bytes());
    out.extend_from_slice(&((bpdu.forward_delay as u16) << 8).to_be_bytes());
}

/// Length of a Config BPDU payload starting at the protocol id field.
const CONFIG_PAYLOAD_LEN: usize = 35;

fn decode_config_payload(payload: &[u8], port: PortId) -> Result<ConfigBpdu, StpError> {
    if payload.len() < CONFIG_PAYLOAD_LEN {
        return Err(StpError::InvalidBpdu {
            port,
            reason: "config BPDU shorter than 35 bytes",
        });
    }

    let version = payload[2];
    if !is_recognized_version(version) {
        return Err(StpError::InvalidBpdu {
            port,
            reason: "unrecognized protocol version",
        });
    }

    let flags = payload[4];
    let root_id = decode_bridge_id(&payload[5..13]);
    let root_path_cost = u32::from_be_bytes(payload[13..17].try_into().unwrap());
    let bridge_id = decode_bridge_id(&payload[17..25]);
    let port_id = PortId::from_packed(u16::from_be_bytes([payload[25], payload[26]]));
    let message_age = u16::from_be_bytes([payload[27], payload[28]]);
    let max_age = u16::from_be_bytes([payload[29], payload[30]]);
    let hello_time = repair_hello_time(u16::from_be_bytes([payload[31], payload[32]]));
    let forward_delay = u16::from_be_bytes([payload[33], payload[34]]);

    Ok(ConfigBpdu {
        version,
        topology_change: flags & FLAG_TOPOLOGY_CHANGE != 0,
        topology_change_ack: flags & FLAG_TOPOLOGY_CHANGE_ACK != 0,
        root_id,
        root_path_cost,
        bridge_id,
        port_id,
        message_age: (message_age >> 8) as u8,
        max_age: (max_age >> 8) as u8,
        hello_time: (hello_time >> 8) as u8,
        forward_delay: (forward_delay >> 8) as u8,
    })
}

/// Encodes a classic (untagged) IEEE 802.1D Configuration BPDU.
pub fn encode_classic_config(bpdu: &ConfigBpdu, source: MacAddress) -> Vec<u8> {
    let mut payload = Vec::with_capacity(CONFIG_PAYLOAD_LEN);
    encode_config_payload(bpdu, &mut payload);

    let mut out = Vec::with_capacity(14 + 3 + payload.len());
    out.extend_from_slice(&mac_stp_addr!());
    out.extend_from_slice(&source);
    out.extend_from_slice(&((3 + payload.len()) as u16).to_be_bytes());
    out.extend_from_slice(&[0x42, 0x42, 0x03]); // LLC: DSAP=SSAP=0x42, UI
    out.extend_from_slice(&payload);
    out
}

/// Encodes a classic (untagged) IEEE 802.1D TCN BPDU.
pub fn encode_classic_tcn(version: u8, source: MacAddress) -> Vec<u8> {
    let mut out = Vec::with_capacity(14 + 3 + 7);
    out.extend_from_slice(&mac_stp_addr!());
    out.extend_from_slice(&source);
    out.extend_from_slice(&(3 + 7u16).to_be_bytes());
    out.extend_from_slice(&[0x42, 0x42, 0x03]);
    out.extend_from_slice(&PROTOCOL_ID.to_be_bytes());
    out.push(version);
    out.push(BPDU_TYPE_TCN);
    out.extend_from_slice(&[0u8; 3]); // padding
    out
}

/// Decodes a classic (untagged) 802.1D BPDU frame (config or TCN).
pub fn decode_classic(bytes: &[u8]) -> Result<Bpdu, StpError> {
    let unknown_port = PortId::new(0, 0);
    if bytes.len() < 17 {
        return Err(StpError::InvalidBpdu {
            port: unknown_port,
            reason: "runt classic BPDU frame",
        });
    }
    // DA(6) + SA(6) + length(2) = 14 bytes, then the 3-byte LLC header.
    if bytes[14] != 0x42 || bytes[15] != 0x42 {
        return Err(StpError::InvalidBpdu {
            port: unknown_port,
            reason: "not an LLC/STP frame",
        });
    }

    let payload = &bytes[17..];
    if payload.len() < 4 {
        return Err(StpError::InvalidBpdu {
            port: unknown_port,
            reason: "truncated STP payload",
        });
    }

    let version = payload[2];
    if !is_recognized_version(version) {
        return Err(StpError::InvalidBpdu {
            port: unknown_port,
            reason: "unrecognized protocol version",
        });
    }

    match payload[3] {
        BPDU_TYPE_CONFIG => {
            decode_config_payload(payload, unknown_port).map(Bpdu::Config)
        }
        BPDU_TYPE_TCN => Ok(Bpdu::Tcn(TcnBpdu { version })),
        _ => Err(StpError::InvalidBpdu {
            port: unknown_port,
            reason: "unknown BPDU type",
        }),
    }
}

/// Encodes a PVST+ Configuration BPDU for the given VLAN.
pub fn encode_pvst_config(bpdu: &ConfigBpdu, source: MacAddress, vlan_id: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(CONFIG_PAYLOAD_LEN);
    encode_config_payload(bpdu, &mut payload);

    let mut out = Vec::with_capacity(14 + 8 + payload.len() + 4);
    out.extend_from_slice(&mac_pvst_addr!());
    out.extend_from_slice(&source);
    out.extend_from_slice(&((8 + payload.len() + 4) as u16).to_be_bytes());
    out.push(0xAA); // DSAP
    out.push(0xAA); // SSAP
    out.push(0x03); // UI control
    out.extend_from_slice(&PVST_SNAP_OUI);
    out.extend_from_slice(&PVST_SNAP_PROTOCOL_ID.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&2u16.to_be_bytes()); // TLV length
    out.extend_from_slice(&vlan_id.to_be_bytes());
    out
}

/// Encodes a PVST+ TCN BPDU for the given VLAN.
pub fn encode_pvst_tcn(version: u8, source: MacAddress) -> Vec<u8> {
    let mut out = Vec::with_capacity(14 + 8 + 4 + 38);
    out.extend_from_slice(&mac_pvst_addr!());
    out.extend_from_slice(&source);
    out.extend_from_slice(&(8 + 4 + 38u16).to_be_bytes());
    out.push(0xAA);
    out.push(0xAA);
    out.push(0x03);
    out.extend_from_slice(&PVST_SNAP_OUI);
    out.extend_from_slice(&PVST_SNAP_PROTOCOL_ID.to_be_bytes());
    out.extend_from_slice(&PROTOCOL_ID.to_be_bytes());
    out.push(version);
    out.push(BPDU_TYPE_TCN);
    out.extend_from_slice(&[0u8; 38]);
    out
}

/// Decodes a PVST+ BPDU frame, returning the BPDU and the VLAN id carried in
/// its trailing TLV. Frames with `tag_length != 2` or a VLAN id outside
/// `[1, 4094]` are rejected per spec §4.2 (the caller bumps the PVST drop
/// counter on `Err`).
pub fn decode_pvst(bytes: &[u8]) -> Result<(Bpdu, u16), StpError> {
    let unknown_port = PortId::new(0, 0);
    if bytes.len() < 22 {
        return Err(StpError::InvalidBpdu {
            port: unknown_port,
            reason: "runt PVST+ frame",
        });
    }
    // DA(6) + SA(6) + length(2) = 14 bytes, then the 8-byte SNAP header.
    if bytes[14] != 0xAA || bytes[15] != 0xAA {
        return Err(StpError::InvalidBpdu {
            port: unknown_port,
            reason: "not a SNAP frame",
        });
    }
    if bytes[17..20] != PVST_SNAP_OUI {
        return Err(StpError::InvalidBpdu {
            port: unknown_port,
            reason: "unexpected SNAP OUI",
        });
    }
    let snap_pid = u16::from_be_bytes([bytes[20], bytes[21]]);
    if snap_pid != PVST_SNAP_PROTOCOL_ID {
        return Err(StpError::InvalidBpdu {
            port: unknown_port,
            reason: "unexpected SNAP protocol id",
        });
    }

    let payload = &bytes[22..];
    if payload.len() < 4 {
        return Err(StpError::InvalidBpdu {
            port: unknown_port,
            reason: "truncated PVST+ payload",
        });
    }
    let version = payload[2];
    if !is_recognized_version(version) {
        return Err(StpError::InvalidBpdu {
            port: unknown_port,
            reason: "unrecognized protocol version",
        });
    }

    match payload[3] {
        BPDU_TYPE_CONFIG => {
            let config = decode_config_payload(payload, unknown_port)?;
            let tlv_start = CONFIG_PAYLOAD_LEN;
            if payload.len() < tlv_start + 4 {
                return Err(StpError::InvalidBpdu {
                    port: unknown_port,
                    reason: "missing PVST+ VLAN TLV",
                });
            }
            let tag_length = u16::from_be_bytes([payload[tlv_start], payload[tlv_start + 1]]);
            if tag_length != 2 {
                return Err(StpError::InvalidBpdu {
                    port: unknown_port,
                    reason: "PVST+ TLV length must be 2",
                });
            }
            let vlan_id =
                u16::from_be_bytes([payload[tlv_start + 2], payload[tlv_start + 3]]);
            if !(1..=4094).contains(&vlan_id) {
                return Err(StpError::InvalidBpdu {
                    port: unknown_port,
                    reason: "PVST+ VLAN id out of range",
                });
            }
            Ok((Bpdu::Config(config), vlan_id))
        }
        BPDU_TYPE_TCN => {
            // Classic TCN-over-PVST carries no VLAN TLV; the VLAN is implied
            // by the ingress port's configuration, resolved by the caller.
            Ok((Bpdu::Tcn(TcnBpdu { version }), 0))
        }
        _ => Err(StpError::InvalidBpdu {
            port: unknown_port,
            reason: "unknown BPDU type",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> ConfigBpdu {
        ConfigBpdu {
            version: VERSION_CLASSIC,
            topology_change: true,
            topology_change_ack: false,
            root_id: BridgeId::new(4096, [0, 1, 2, 3, 4, 5]),
            root_path_cost: 19,
            bridge_id: BridgeId::new(32768, [6, 7, 8, 9, 10, 11]),
            port_id: PortId::new(8, 3),
            message_age: 0,
            max_age: 20,
            hello_time: 2,
            forward_delay: 15,
        }
    }

    #[test]
    fn ClassicConfig_EncodeThenDecode_RoundTrips() {
        let bpdu = sample_config();
        let bytes = encode_classic_config(&bpdu, [1, 2, 3, 4, 5, 6]);
        let decoded = decode_classic(&bytes).unwrap();
        match decoded {
            Bpdu::Config(c) => assert_eq!(c, bpdu),
            _ => panic!("expected config BPDU"),
        }
    }

    #[test]
    fn ClassicTcn_EncodeThenDecode_RoundTrips() {
        let bytes = encode_classic_tcn(VERSION_CLASSIC, [1, 2, 3, 4, 5, 6]);
        let decoded = decode_classic(&bytes).unwrap();
        assert_eq!(decoded, Bpdu::Tcn(TcnBpdu { version: VERSION_CLASSIC }));
    }

    #[test]
    fn PvstConfig_EncodeThenDecode_RoundTrips() {
        let bpdu = sample_config();
        let bytes = encode_pvst_config(&bpdu, [1, 2, 3, 4, 5, 6], 10);
        let (decoded, vlan) = decode_pvst(&bytes).unwrap();
        assert_eq!(vlan, 10);
        match decoded {
            Bpdu::Config(c) => assert_eq!(c, bpdu),
            _ => panic!("expected config BPDU"),
        }
    }

    #[test]
    fn PvstConfig_VlanOutOfRange_IsRejected() {
        let bpdu = sample_config();
        let bytes = encode_pvst_config(&bpdu, [1, 2, 3, 4, 5, 6], 4095);
        assert!(decode_pvst(&bytes).is_err());
    }

    #[test]
    fn PvstConfig_BadTlvLength_IsRejected() {
        let bpdu = sample_config();
        let mut bytes = encode_pvst_config(&bpdu, [1, 2, 3, 4, 5, 6], 10);
        let len = bytes.len();
        bytes[len - 4] = 0x00;
        bytes[len - 3] = 0x03; // tag_length = 3, invalid
        assert!(decode_pvst(&bytes).is_err());
    }

    #[test]
    fn ClassicConfig_LowHelloTime_IsRepairedToDefault() {
        let mut bpdu = sample_config();
        bpdu.hello_time = 0;
        let bytes = encode_classic_config(&bpdu, [1, 2, 3, 4, 5, 6]);
        let decoded = decode_classic(&bytes).unwrap();
        match decoded {
            Bpdu::Config(c) => assert_eq!(c.hello_time, DEFAULT_HELLO_TIME),
            _ => panic!("expected config BPDU"),
        }
    }

    #[test]
    fn Decode_UnrecognizedVersion_IsRejected() {
        let bpdu = sample_config();
        let mut bytes = encode_classic_config(&bpdu, [1, 2, 3, 4, 5, 6]);
        bytes[17 + 2] = 5; // version field, payload offset 2
        assert!(decode_classic(&bytes).is_err());
    }
}
