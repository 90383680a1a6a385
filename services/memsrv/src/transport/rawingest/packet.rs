//! Raw ingest v1 header: definition, parsing, encoding.
//!
//! Parsing performs structural validation only — magic, version, known area
//! kind, non-zero count — and never touches memory or reads payload bytes.

use memcore::{Area, MemoryId};

use crate::error::{MemSrvError, Result};

/// Frame magic
pub const RAW_MAGIC: u16 = 0xA55A;

/// Protocol version
pub const RAW_VERSION: u8 = 0x01;

/// Fixed header size in bytes
pub const RAW_HEADER_LEN: usize = 14;

/// Per-frame status byte: write applied
pub const STATUS_OK: u8 = 0x00;

/// Per-frame status byte: frame rejected, connection terminates
pub const STATUS_REJECTED: u8 = 0x01;

/// Raw ingest v1 header.
///
/// Layout (14 bytes, big-endian):
/// `[ magic(2) ][ version(1) ][ flags(1) ][ area(1) ][ reserved(1) ]`
/// `[ unit_id(2) ][ port(2) ][ address(2) ][ count(2) ]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestHeader {
    pub flags: u8,
    pub area: Area,
    pub unit_id: u16,
    pub port: u16,
    pub address: u16,
    pub count: u16,
}

impl IngestHeader {
    /// Parse and structurally validate a v1 header.
    pub fn parse(buf: &[u8; RAW_HEADER_LEN]) -> Result<Self> {
        let magic = u16::from_be_bytes([buf[0], buf[1]]);
        if magic != RAW_MAGIC {
            return Err(MemSrvError::ProtocolError("bad magic".into()));
        }

        if buf[2] != RAW_VERSION {
            return Err(MemSrvError::ProtocolError("bad version".into()));
        }

        let area = Area::try_from(buf[4])
            .map_err(|_| MemSrvError::ProtocolError("unknown area".into()))?;

        let count = u16::from_be_bytes([buf[12], buf[13]]);
        if count == 0 {
            return Err(MemSrvError::ProtocolError("count is zero".into()));
        }

        Ok(Self {
            flags: buf[3],
            area,
            unit_id: u16::from_be_bytes([buf[6], buf[7]]),
            port: u16::from_be_bytes([buf[8], buf[9]]),
            address: u16::from_be_bytes([buf[10], buf[11]]),
            count,
        })
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> [u8; RAW_HEADER_LEN] {
        let mut out = [0u8; RAW_HEADER_LEN];
        out[0..2].copy_from_slice(&RAW_MAGIC.to_be_bytes());
        out[2] = RAW_VERSION;
        out[3] = self.flags;
        out[4] = self.area as u8;
        out[5] = 0; // reserved
        out[6..8].copy_from_slice(&self.unit_id.to_be_bytes());
        out[8..10].copy_from_slice(&self.port.to_be_bytes());
        out[10..12].copy_from_slice(&self.address.to_be_bytes());
        out[12..14].copy_from_slice(&self.count.to_be_bytes());
        out
    }

    /// Payload size implied by the area kind and count: `ceil(count/8)`
    /// bytes for bit areas, `count * 2` for register areas.
    pub fn payload_len(&self) -> usize {
        self.area.payload_len(self.count)
    }

    /// Target memory identity carried in the frame.
    pub fn memory_id(&self) -> MemoryId {
        MemoryId::new(self.port, self.unit_id)
    }
}
