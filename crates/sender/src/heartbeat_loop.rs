//! The sender's heartbeat task: ticks a [`HeartbeatEmitter`] forever, one
//! datagram per inter-beat delay, independent of and concurrent with the
//! synchronization loop.

use std::net::{SocketAddr, UdpSocket};

use heartbeat::HeartbeatEmitter;
use protocol::{HeartbeatPacket, Packet};

/// Runs forever: emit, sleep `delay`, repeat. A failed `sendto` is logged
/// and does not stop the loop — the next tick will simply try again.
pub fn run(mut emitter: HeartbeatEmitter, socket: &UdpSocket, dest: SocketAddr) -> ! {
    loop {
        let tick = emitter.tick();
        let packet = Packet::Heartbeat(HeartbeatPacket {
            session_id: tick.session_id,
            seq: tick.seq,
            delay_secs: tick.delay_secs,
            message: "alive".to_string(),
        });
        match socket.send_to(&packet.encode(), dest) {
            Ok(_) => tracing::debug!(seq = tick.seq, "heartbeat sent"),
            Err(err) => tracing::warn!(error = %err, "failed to send heartbeat"),
        }
        std::thread::sleep(emitter.delay());
    }
}
