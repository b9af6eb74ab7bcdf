//! Demonstration daemon binary (SPEC_FULL.md §2.10): wires an [`Engine`] to
//! stub transport/port-db/publisher collaborators and runs the cooperative
//! dispatch loop of spec.md §5 — a 100 ms scheduler tick serviced ahead of
//! a control channel carrying configuration messages. Real link discovery,
//! frame transport and persistence are out of scope for this crate; a
//! production daemon would replace the stub collaborators with ones backed
//! by packet sockets, netlink and a key-value store.

use std::sync::mpsc;
use std::time::Duration;

use pvst_core::data_link::mac_address::MacAddress;
use pvst_core::engine::Engine;
use pvst_core::management::{ConfigMessage, Opcode, TagMode, VlanConfigMessage, VlanPortMember};
use pvst_core::transport::{NullTransport, RecordingPublisher, StaticPortDatabase};

const MAX_INSTANCES: usize = 64;
const BASE_MAC: MacAddress = [0x00, 0x1b, 0x0d, 0x00, 0x00, 0x01];

fn main() {
    env_logger::init();

    let engine = Engine::new(
        MAX_INSTANCES,
        BASE_MAC,
        true,
        NullTransport::default(),
        StaticPortDatabase::new(BASE_MAC),
        RecordingPublisher::default(),
    );

    let (config_tx, config_rx) = mpsc::channel::<ConfigMessage>();

    config_tx
        .send(ConfigMessage::VlanConfig(VlanConfigMessage {
            opcode: Opcode::Set,
            new_instance: true,
            vlan_id: 1,
            inst_id: 1,
            forward_delay: 15,
            hello_time: 2,
            max_age: 20,
            priority: 32768,
            members: vec![VlanPortMember {
                intf_name: "eth0".into(),
                mode: TagMode::Untagged,
                enabled: true,
            }],
        }))
        .expect("config channel receiver dropped");

    run(engine, config_rx);
}

/// The dispatch loop of spec.md §5: the scheduler tick is serviced first on
/// every pass, ahead of configuration messages, so a BPDU storm or config
/// burst cannot starve protocol progress.
fn run(
    mut engine: Engine<NullTransport, StaticPortDatabase, RecordingPublisher>,
    config_rx: mpsc::Receiver<ConfigMessage>,
) {
    let mut tick: u32 = 0;
    loop {
        engine.tick(tick);
        tick = tick.wrapping_add(1);

        while let Ok(msg) = config_rx.try_recv() {
            if let Err(e) = engine.apply_config(msg) {
                log::warn!("configuration rejected: {e}");
            }
        }

        std::thread::sleep(Duration::from_millis(100));

        // This demonstration harness runs a bounded number of ticks rather
        // than forever, since there is no real link/config source to keep
        // it busy.
        if tick > 50 {
            break;
        }
    }
}
