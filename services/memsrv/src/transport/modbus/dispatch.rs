//! Request dispatch into the memory core.
//!
//! Resolves the target memory from `(port, unit_id)`, applies the decoded
//! operation, and encodes the response PDU. Failure mapping: decode failure
//! ⇒ Illegal Data Value, unknown identity or any memory-core bounds/area
//! failure ⇒ Illegal Data Address, unsupported function code ⇒ Illegal
//! Function.

use std::sync::Arc;

use memcore::bits::bytes_for_bits;
use memcore::{Area, Memory, MemoryId, Store};

use super::frame::Request;
use super::pdu::{self, exception};

/// Dispatch one request and produce the response PDU bytes.
pub fn dispatch(store: &Store, req: &Request) -> Vec<u8> {
    match req.function_code {
        pdu::FC_READ_COILS => read_bits(store, req, Area::Coils),
        pdu::FC_READ_DISCRETE_INPUTS => read_bits(store, req, Area::DiscreteInputs),
        pdu::FC_READ_HOLDING_REGISTERS => read_registers(store, req, Area::HoldingRegisters),
        pdu::FC_READ_INPUT_REGISTERS => read_registers(store, req, Area::InputRegisters),
        pdu::FC_WRITE_SINGLE_COIL => write_single_coil(store, req),
        pdu::FC_WRITE_SINGLE_REGISTER => write_single_register(store, req),
        pdu::FC_WRITE_MULTIPLE_COILS => write_multiple_coils(store, req),
        pdu::FC_WRITE_MULTIPLE_REGISTERS => write_multiple_registers(store, req),
        _ => pdu::encode_exception(req.function_code, exception::ILLEGAL_FUNCTION).to_vec(),
    }
}

fn resolve(store: &Store, req: &Request) -> Option<Arc<Memory>> {
    store
        .must_get(MemoryId::new(req.port, u16::from(req.unit_id)))
        .ok()
}

fn read_bits(store: &Store, req: &Request, area: Area) -> Vec<u8> {
    let read = match pdu::decode_read_request(&req.payload) {
        Ok(read) => read,
        Err(_) => {
            return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_VALUE)
                .to_vec()
        }
    };

    let Some(memory) = resolve(store, req) else {
        return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_ADDRESS).to_vec();
    };

    let mut data = vec![0u8; bytes_for_bits(read.quantity)];
    if memory
        .read_bits(area, read.address, read.quantity, &mut data)
        .is_err()
    {
        return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_ADDRESS).to_vec();
    }

    pdu::encode_read_response(req.function_code, &data).to_vec()
}

fn read_registers(store: &Store, req: &Request, area: Area) -> Vec<u8> {
    let read = match pdu::decode_read_request(&req.payload) {
        Ok(read) => read,
        Err(_) => {
            return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_VALUE)
                .to_vec()
        }
    };

    let Some(memory) = resolve(store, req) else {
        return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_ADDRESS).to_vec();
    };

    let mut data = vec![0u8; read.quantity as usize * 2];
    if memory
        .read_registers(area, read.address, read.quantity, &mut data)
        .is_err()
    {
        return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_ADDRESS).to_vec();
    }

    pdu::encode_read_response(req.function_code, &data).to_vec()
}

fn write_single_coil(store: &Store, req: &Request) -> Vec<u8> {
    let write = match pdu::decode_write_single(&req.payload) {
        Ok(write) => write,
        Err(_) => {
            return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_VALUE)
                .to_vec()
        }
    };

    // 0xFF00 = on, 0x0000 = off; any other value is invalid.
    let bit = match write.value {
        pdu::COIL_ON => 1u8,
        0x0000 => 0u8,
        _ => {
            return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_VALUE)
                .to_vec()
        }
    };

    let Some(memory) = resolve(store, req) else {
        return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_ADDRESS).to_vec();
    };

    if memory
        .write_bits(Area::Coils, write.address, 1, &[bit])
        .is_err()
    {
        return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_ADDRESS).to_vec();
    }

    pdu::encode_write_single_response(req.function_code, write.address, write.value).to_vec()
}

fn write_single_register(store: &Store, req: &Request) -> Vec<u8> {
    let write = match pdu::decode_write_single(&req.payload) {
        Ok(write) => write,
        Err(_) => {
            return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_VALUE)
                .to_vec()
        }
    };

    let Some(memory) = resolve(store, req) else {
        return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_ADDRESS).to_vec();
    };

    if memory
        .write_registers(
            Area::HoldingRegisters,
            write.address,
            1,
            &write.value.to_be_bytes(),
        )
        .is_err()
    {
        return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_ADDRESS).to_vec();
    }

    pdu::encode_write_single_response(req.function_code, write.address, write.value).to_vec()
}

fn write_multiple_coils(store: &Store, req: &Request) -> Vec<u8> {
    let write = match pdu::decode_write_multiple_coils(&req.payload) {
        Ok(write) => write,
        Err(_) => {
            return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_VALUE)
                .to_vec()
        }
    };

    let Some(memory) = resolve(store, req) else {
        return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_ADDRESS).to_vec();
    };

    if memory
        .write_bits(Area::Coils, write.address, write.quantity, &write.data)
        .is_err()
    {
        return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_ADDRESS).to_vec();
    }

    pdu::encode_write_multiple_response(req.function_code, write.address, write.quantity).to_vec()
}

fn write_multiple_registers(store: &Store, req: &Request) -> Vec<u8> {
    let write = match pdu::decode_write_multiple_registers(&req.payload) {
        Ok(write) => write,
        Err(_) => {
            return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_VALUE)
                .to_vec()
        }
    };

    let Some(memory) = resolve(store, req) else {
        return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_ADDRESS).to_vec();
    };

    if memory
        .write_registers(
            Area::HoldingRegisters,
            write.address,
            write.quantity,
            &write.data,
        )
        .is_err()
    {
        return pdu::encode_exception(req.function_code, exception::ILLEGAL_DATA_ADDRESS).to_vec();
    }

    pdu::encode_write_multiple_response(req.function_code, write.address, write.quantity).to_vec()
}
