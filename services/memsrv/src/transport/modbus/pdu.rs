//! Modbus PDU codec: request decoding and response/exception encoding.
//!
//! Decoders validate shape only (lengths, byte counts, value domains) and
//! never touch memory; encoders are pure byte assembly. All multi-byte
//! fields are big-endian.

use bytes::{BufMut, BytesMut};

use memcore::bits::bytes_for_bits;

use crate::error::{MemSrvError, Result};

// Supported function codes
pub const FC_READ_COILS: u8 = 0x01;
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const FC_WRITE_MULTIPLE_COILS: u8 = 0x0F;
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Modbus exception codes used by this appliance.
pub mod exception {
    pub const ILLEGAL_FUNCTION: u8 = 0x01;
    pub const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
    pub const ILLEGAL_DATA_VALUE: u8 = 0x03;
    pub const DEVICE_BUSY: u8 = 0x06;
}

/// Coil value for "on" in FC5 requests; the only other legal value is 0x0000.
pub const COIL_ON: u16 = 0xFF00;

/// Decoded FC 1/2/3/4 request payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub address: u16,
    pub quantity: u16,
}

/// Decoded FC 5/6 request payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSingleRequest {
    pub address: u16,
    pub value: u16,
}

/// Decoded FC 15/16 request payload; `data` is the raw packed-bit or
/// big-endian-word block, already validated against the byte count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteMultipleRequest {
    pub address: u16,
    pub quantity: u16,
    pub data: Vec<u8>,
}

fn decode_err(msg: &str) -> MemSrvError {
    MemSrvError::DecodeError(msg.into())
}

/// Decode an FC 1/2/3/4 payload: address + quantity.
pub fn decode_read_request(payload: &[u8]) -> Result<ReadRequest> {
    if payload.len() != 4 {
        return Err(decode_err("invalid read request length"));
    }

    let quantity = u16::from_be_bytes([payload[2], payload[3]]);
    if quantity == 0 {
        return Err(decode_err("quantity must be > 0"));
    }

    Ok(ReadRequest {
        address: u16::from_be_bytes([payload[0], payload[1]]),
        quantity,
    })
}

/// Decode an FC 5/6 payload: address + value.
pub fn decode_write_single(payload: &[u8]) -> Result<WriteSingleRequest> {
    if payload.len() != 4 {
        return Err(decode_err("invalid write single length"));
    }

    Ok(WriteSingleRequest {
        address: u16::from_be_bytes([payload[0], payload[1]]),
        value: u16::from_be_bytes([payload[2], payload[3]]),
    })
}

fn decode_write_multiple(payload: &[u8]) -> Result<WriteMultipleRequest> {
    if payload.len() < 5 {
        return Err(decode_err("invalid write multiple length"));
    }

    let address = u16::from_be_bytes([payload[0], payload[1]]);
    let quantity = u16::from_be_bytes([payload[2], payload[3]]);
    if quantity == 0 {
        return Err(decode_err("quantity must be > 0"));
    }

    let byte_count = payload[4] as usize;
    let data = &payload[5..];
    if data.len() != byte_count {
        return Err(decode_err("byte count mismatch"));
    }

    Ok(WriteMultipleRequest {
        address,
        quantity,
        data: data.to_vec(),
    })
}

/// Decode an FC 15 payload. The byte count must equal `ceil(quantity / 8)`.
pub fn decode_write_multiple_coils(payload: &[u8]) -> Result<WriteMultipleRequest> {
    let req = decode_write_multiple(payload)?;
    if req.data.len() != bytes_for_bits(req.quantity) {
        return Err(decode_err("byte count does not match quantity"));
    }
    Ok(req)
}

/// Decode an FC 16 payload. The byte count must be even and equal
/// `quantity * 2`.
pub fn decode_write_multiple_registers(payload: &[u8]) -> Result<WriteMultipleRequest> {
    let req = decode_write_multiple(payload)?;
    if req.data.len() % 2 != 0 || req.data.len() != req.quantity as usize * 2 {
        return Err(decode_err("byte count does not match quantity"));
    }
    Ok(req)
}

/// Build an FC 1/2/3/4 response: function code, byte count, data.
pub fn encode_read_response(function_code: u8, data: &[u8]) -> BytesMut {
    let mut pdu = BytesMut::with_capacity(2 + data.len());
    pdu.put_u8(function_code);
    pdu.put_u8(data.len() as u8);
    pdu.put_slice(data);
    pdu
}

/// Build an FC 5/6 response: echo address and value.
pub fn encode_write_single_response(function_code: u8, address: u16, value: u16) -> BytesMut {
    let mut pdu = BytesMut::with_capacity(5);
    pdu.put_u8(function_code);
    pdu.put_u16(address);
    pdu.put_u16(value);
    pdu
}

/// Build an FC 15/16 response: echo address and quantity.
pub fn encode_write_multiple_response(function_code: u8, address: u16, quantity: u16) -> BytesMut {
    let mut pdu = BytesMut::with_capacity(5);
    pdu.put_u8(function_code);
    pdu.put_u16(address);
    pdu.put_u16(quantity);
    pdu
}

/// Build an exception response: function code with its high bit set,
/// followed by the exception code.
pub fn encode_exception(function_code: u8, code: u8) -> BytesMut {
    let mut pdu = BytesMut::with_capacity(2);
    pdu.put_u8(function_code | 0x80);
    pdu.put_u8(code);
    pdu
}
