//! Per-connection Modbus TCP request loop.
//!
//! One task per accepted connection; requests are processed strictly in
//! arrival order, each response fully written before the next read. The loop
//! enforces the locked order: frame → state sealing → authority → dispatch.

use std::io::ErrorKind;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use authority::{AccessRequest, Authority, EXCEPTION_DEVICE_BUSY};
use memcore::{Memory, MemoryId, Store};

use super::dispatch::dispatch;
use super::frame::{build_response, read_request, Request};
use super::pdu::encode_exception;
use crate::error::MemSrvError;

/// Whether the state-sealing interlock blocks this request.
///
/// Presence-based: a memory without a sealing definition is never blocked.
/// The flag bit reads through the ordinary coil path — same lock, same
/// bounds checks — so the sealing view can never diverge from the
/// addressable-memory view. A failed read of the flag bit counts as sealed.
fn sealed(memory: &Memory) -> bool {
    let Some(def) = memory.state_sealing() else {
        return false;
    };

    let mut flag = [0u8; 1];
    if memory.read_bits(def.area, def.address, 1, &mut flag).is_err() {
        return true;
    }

    // 0 = sealed, 1 = unsealed
    flag[0] & 0x01 == 0
}

async fn respond(stream: &mut TcpStream, req: &Request, pdu: &[u8]) -> std::io::Result<()> {
    let frame = build_response(req, pdu);
    stream.write_all(&frame).await
}

/// Handle a single Modbus TCP connection until the peer closes or a fatal
/// protocol/transport error occurs.
pub async fn handle_connection(mut stream: TcpStream, store: Arc<Store>, auth: Arc<Authority>) {
    let port = match stream.local_addr() {
        Ok(addr) => addr.port(),
        Err(e) => {
            warn!("modbus: failed to get local address: {e}");
            return;
        }
    };

    let source: IpAddr = match stream.peer_addr() {
        Ok(addr) => addr.ip(),
        Err(e) => {
            warn!("modbus: failed to get peer address: {e}");
            return;
        }
    };

    loop {
        let req = match read_request(&mut stream, port).await {
            Ok(req) => req,
            Err(MemSrvError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("modbus: peer {source} closed the connection");
                return;
            }
            Err(e) => {
                warn!("modbus: read error from {source}: {e}");
                return;
            }
        };

        let memory_id = MemoryId::new(req.port, u16::from(req.unit_id));

        // State sealing precedes everything, including explicit allow rules.
        if let Some(memory) = store.get(memory_id) {
            if sealed(&memory) {
                debug!("modbus: {memory_id} sealed, denying fc {}", req.function_code);
                let pdu = encode_exception(req.function_code, EXCEPTION_DEVICE_BUSY);
                if respond(&mut stream, &req, &pdu).await.is_err() {
                    return;
                }
                continue;
            }
        }

        let decision = auth.evaluate(AccessRequest {
            memory_id,
            source,
            function_code: req.function_code,
        });

        if !decision.allowed {
            debug!(
                "modbus: denied {memory_id} fc {} from {source}: {}",
                req.function_code, decision.reason
            );
            let pdu = encode_exception(req.function_code, decision.exception_code);
            if respond(&mut stream, &req, &pdu).await.is_err() {
                return;
            }
            continue;
        }

        let pdu = dispatch(&store, &req);
        if let Err(e) = respond(&mut stream, &req, &pdu).await {
            warn!("modbus: write error to {source}: {e}");
            return;
        }
    }
}
