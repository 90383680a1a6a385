//! Per-connection raw ingest loop.
//!
//! Write-only channel: each frame is a fixed header plus an area-sized
//! payload, answered with a single status byte. The first rejection — a
//! malformed header, an unknown identity, or a failed write — replies
//! `STATUS_REJECTED` and terminates the connection; successful frames reply
//! `STATUS_OK` and the loop continues. This channel carries no
//! authority/sealing check: it is a separate, structurally-gated write path.

use std::io::ErrorKind;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use memcore::Store;

use super::packet::{IngestHeader, RAW_HEADER_LEN, STATUS_OK, STATUS_REJECTED};

async fn reject(stream: &mut TcpStream) {
    let _ = stream.write_all(&[STATUS_REJECTED]).await;
}

/// Handle a single raw ingest connection until the peer closes or a frame
/// is rejected.
pub async fn handle_connection(mut stream: TcpStream, store: Arc<Store>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".into());

    loop {
        let mut header_buf = [0u8; RAW_HEADER_LEN];
        match stream.read_exact(&mut header_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("rawingest: peer {peer} closed the connection");
                return;
            }
            Err(e) => {
                warn!("rawingest: read error from {peer}: {e}");
                return;
            }
        }

        // Structural validation happens before any payload byte is read.
        let header = match IngestHeader::parse(&header_buf) {
            Ok(header) => header,
            Err(e) => {
                debug!("rawingest: rejecting frame from {peer}: {e}");
                reject(&mut stream).await;
                return;
            }
        };

        let mut payload = vec![0u8; header.payload_len()];
        if let Err(e) = stream.read_exact(&mut payload).await {
            warn!("rawingest: payload read error from {peer}: {e}");
            reject(&mut stream).await;
            return;
        }

        let memory = match store.must_get(header.memory_id()) {
            Ok(memory) => memory,
            Err(e) => {
                debug!("rawingest: rejecting frame from {peer}: {e}");
                reject(&mut stream).await;
                return;
            }
        };

        let applied = if header.area.is_bit_area() {
            memory.write_bits(header.area, header.address, header.count, &payload)
        } else {
            memory.write_registers(header.area, header.address, header.count, &payload)
        };

        if let Err(e) = applied {
            debug!("rawingest: write rejected for {peer}: {e}");
            reject(&mut stream).await;
            return;
        }

        if let Err(e) = stream.write_all(&[STATUS_OK]).await {
            warn!("rawingest: status write error to {peer}: {e}");
            return;
        }
    }
}
