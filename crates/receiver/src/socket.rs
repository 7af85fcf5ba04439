//! Binding the receiver's single UDP socket with a generous receive buffer.
//! A unidirectional link gives the sender no way to know it's sending
//! faster than this loop can drain the kernel socket buffer, so that
//! buffer is sized up front rather than left at the platform default.

use std::net::{SocketAddr, UdpSocket};

use socket2::{Domain, Socket, Type};

use crate::error::ReceiverError;

/// 8 MiB: generous enough to absorb a scheduling hiccup in the receive
/// loop without the kernel dropping datagrams, without being large enough
/// to matter on any host this binary targets.
const RECV_BUFFER_BYTES: usize = 8 * 1024 * 1024;

pub fn bind(addr: SocketAddr) -> Result<UdpSocket, ReceiverError> {
    let socket =
        Socket::new(Domain::for_address(addr), Type::DGRAM, None).map_err(|source| {
            ReceiverError::Bind { addr, source }
        })?;
    if let Err(source) = socket.set_recv_buffer_size(RECV_BUFFER_BYTES) {
        tracing::warn!(error = %source, "failed to widen UDP receive buffer; continuing with the platform default");
    }
    socket
        .bind(&addr.into())
        .map_err(|source| ReceiverError::Bind { addr, source })?;
    Ok(socket.into())
}
