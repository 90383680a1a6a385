//! Modbus TCP framing (MBAP envelope).
//!
//! A frame is a fixed 7-byte MBAP header followed by `length - 1` bytes of
//! PDU: one function-code byte plus the function-specific payload. A zero
//! length field is a protocol violation and fails the read immediately —
//! there is no attempt to resynchronize a corrupted stream.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{MemSrvError, Result};

/// MBAP header length in bytes
pub const MBAP_HEADER_LEN: usize = 7;

/// MBAP (Modbus Application Protocol) header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    /// Byte count of unit id + PDU
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    /// Parse an MBAP header from exactly 7 bytes.
    pub fn from_bytes(data: &[u8; MBAP_HEADER_LEN]) -> Self {
        Self {
            transaction_id: u16::from_be_bytes([data[0], data[1]]),
            protocol_id: u16::from_be_bytes([data[2], data[3]]),
            length: u16::from_be_bytes([data[4], data[5]]),
            unit_id: data[6],
        }
    }

    /// Serialize the header to bytes.
    pub fn to_bytes(&self) -> [u8; MBAP_HEADER_LEN] {
        let mut out = [0u8; MBAP_HEADER_LEN];
        out[0..2].copy_from_slice(&self.transaction_id.to_be_bytes());
        out[2..4].copy_from_slice(&self.protocol_id.to_be_bytes());
        out[4..6].copy_from_slice(&self.length.to_be_bytes());
        out[6] = self.unit_id;
        out
    }
}

/// A fully parsed Modbus TCP request. Transport-local and
/// protocol-mechanical; created per inbound frame, consumed immediately.
#[derive(Debug, Clone)]
pub struct Request {
    /// Listening TCP port, injected by the reader
    pub port: u16,

    // MBAP
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub length: u16,

    // PDU
    pub unit_id: u8,
    pub function_code: u8,
    pub payload: Vec<u8>,
}

/// Read exactly one Modbus TCP request from the stream.
///
/// The listening TCP port is injected into the request so that dispatch can
/// form the memory identity without touching the socket again.
pub async fn read_request<R>(reader: &mut R, port: u16) -> Result<Request>
where
    R: AsyncRead + Unpin,
{
    let mut mbap = [0u8; MBAP_HEADER_LEN];
    reader.read_exact(&mut mbap).await?;

    let header = MbapHeader::from_bytes(&mbap);

    if header.length == 0 {
        return Err(MemSrvError::ProtocolError("invalid MBAP length".into()));
    }

    let pdu_len = header.length as usize - 1;
    if pdu_len == 0 {
        return Err(MemSrvError::ProtocolError("invalid PDU length".into()));
    }

    let mut pdu = vec![0u8; pdu_len];
    reader.read_exact(&mut pdu).await?;

    Ok(Request {
        port,
        transaction_id: header.transaction_id,
        protocol_id: header.protocol_id,
        length: header.length,
        unit_id: mbap[6],
        function_code: pdu[0],
        payload: pdu[1..].to_vec(),
    })
}

/// Wrap a response PDU into a Modbus TCP frame, echoing the request's
/// transaction id, protocol id and unit id.
pub fn build_response(req: &Request, pdu: &[u8]) -> BytesMut {
    let header = MbapHeader {
        transaction_id: req.transaction_id,
        protocol_id: req.protocol_id,
        length: pdu.len() as u16 + 1,
        unit_id: req.unit_id,
    };

    let mut frame = BytesMut::with_capacity(MBAP_HEADER_LEN + pdu.len());
    frame.put_slice(&header.to_bytes());
    frame.put_slice(pdu);
    frame
}
