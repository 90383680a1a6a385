//! Memory instances: per-area layouts plus exactly-sized backing storage.

use parking_lot::RwLock;

use crate::area::Area;
use crate::bits::{bytes_for_bits, copy_bits, write_bits};
use crate::error::{MemoryError, Result};
use crate::layout::AreaLayout;

/// Identity of one memory instance.
///
/// Both fields derive from protocol/transport context: the listening TCP port
/// and the protocol unit identifier. Configuration labels are never identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryId {
    pub port: u16,
    pub unit_id: u16,
}

impl MemoryId {
    pub fn new(port: u16, unit_id: u16) -> Self {
        Self { port, unit_id }
    }

    /// Zero is invalid for both fields.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(MemoryError::PortZero);
        }
        if self.unit_id == 0 {
            return Err(MemoryError::UnitIdZero);
        }
        Ok(())
    }
}

impl std::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "port={} unit={}", self.port, self.unit_id)
    }
}

/// Location of the state-sealing flag bit.
///
/// Metadata only: the flag aliases an existing addressable coil, it has no
/// storage of its own. Semantics: 0 = sealed, 1 = unsealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSealingDef {
    pub area: Area,
    pub address: u16,
}

/// Optional layout per area kind, consumed by [`Memory::new`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryLayouts {
    pub coils: Option<AreaLayout>,
    pub discrete_inputs: Option<AreaLayout>,
    pub holding_registers: Option<AreaLayout>,
    pub input_registers: Option<AreaLayout>,
}

/// Backing storage for all four areas, guarded by one reader/writer lock.
#[derive(Debug, Default)]
struct Cells {
    coil_bits: Vec<u8>,
    discrete_input_bits: Vec<u8>,
    holding_words: Vec<u16>,
    input_words: Vec<u16>,
}

/// One addressable memory instance.
///
/// Layouts are fixed at construction and never resized. All reads and writes
/// are bounds-checked against the layout before the lock is taken; the lock
/// is held for the duration of the copy only, never across I/O.
#[derive(Debug)]
pub struct Memory {
    coils_layout: Option<AreaLayout>,
    discrete_inputs_layout: Option<AreaLayout>,
    holding_layout: Option<AreaLayout>,
    input_layout: Option<AreaLayout>,

    state_sealing: Option<StateSealingDef>,

    cells: RwLock<Cells>,
}

impl Memory {
    /// Build a memory from the given layouts, sizing each backing buffer
    /// exactly to its layout. Absent layouts leave the area disabled.
    pub fn new(layouts: MemoryLayouts) -> Result<Self> {
        let mut cells = Cells::default();

        if let Some(layout) = &layouts.coils {
            layout.validate()?;
            cells.coil_bits = vec![0u8; bytes_for_bits(layout.size)];
        }
        if let Some(layout) = &layouts.discrete_inputs {
            layout.validate()?;
            cells.discrete_input_bits = vec![0u8; bytes_for_bits(layout.size)];
        }
        if let Some(layout) = &layouts.holding_registers {
            layout.validate()?;
            cells.holding_words = vec![0u16; layout.size as usize];
        }
        if let Some(layout) = &layouts.input_registers {
            layout.validate()?;
            cells.input_words = vec![0u16; layout.size as usize];
        }

        Ok(Self {
            coils_layout: layouts.coils,
            discrete_inputs_layout: layouts.discrete_inputs,
            holding_layout: layouts.holding_registers,
            input_layout: layouts.input_registers,
            state_sealing: None,
            cells: RwLock::new(cells),
        })
    }

    /// Attach a state-sealing definition. Metadata only; the referenced bit
    /// must already be addressable in the coils area.
    pub fn set_state_sealing(&mut self, def: StateSealingDef) {
        self.state_sealing = Some(def);
    }

    /// The sealing definition, if one is configured.
    pub fn state_sealing(&self) -> Option<&StateSealingDef> {
        self.state_sealing.as_ref()
    }

    /// Layout of `area`, if defined on this memory.
    pub fn layout(&self, area: Area) -> Option<&AreaLayout> {
        match area {
            Area::Coils => self.coils_layout.as_ref(),
            Area::DiscreteInputs => self.discrete_inputs_layout.as_ref(),
            Area::HoldingRegisters => self.holding_layout.as_ref(),
            Area::InputRegisters => self.input_layout.as_ref(),
        }
    }

    fn bit_layout(&self, area: Area) -> Result<AreaLayout> {
        let layout = match area {
            Area::Coils => self.coils_layout,
            Area::DiscreteInputs => self.discrete_inputs_layout,
            _ => return Err(MemoryError::InvalidArea),
        };
        layout.ok_or(MemoryError::AreaNotDefined)
    }

    fn register_layout(&self, area: Area) -> Result<AreaLayout> {
        let layout = match area {
            Area::HoldingRegisters => self.holding_layout,
            Area::InputRegisters => self.input_layout,
            _ => return Err(MemoryError::InvalidArea),
        };
        layout.ok_or(MemoryError::AreaNotDefined)
    }

    /// Read `count` bits from a bit area into `dst`, packed LSB-first.
    /// `dst` must hold at least `ceil(count/8)` bytes.
    pub fn read_bits(&self, area: Area, address: u16, count: u16, dst: &mut [u8]) -> Result<()> {
        if count == 0 {
            return Err(MemoryError::CountZero);
        }

        let layout = self.bit_layout(area)?;
        if !layout.contains(address, count) {
            return Err(MemoryError::OutOfBounds);
        }

        let want = bytes_for_bits(count);
        if dst.len() < want {
            return Err(MemoryError::DstTooSmall);
        }

        let off = layout.offset(address);

        let cells = self.cells.read();
        let backing = match area {
            Area::Coils => &cells.coil_bits,
            _ => &cells.discrete_input_bits,
        };
        copy_bits(&mut dst[..want], backing, off, count);

        Ok(())
    }

    /// Write `count` bits from `src` (packed LSB-first) into a bit area.
    /// `src` must hold at least `ceil(count/8)` bytes.
    pub fn write_bits(&self, area: Area, address: u16, count: u16, src: &[u8]) -> Result<()> {
        if count == 0 {
            return Err(MemoryError::CountZero);
        }

        let layout = self.bit_layout(area)?;
        if !layout.contains(address, count) {
            return Err(MemoryError::OutOfBounds);
        }

        let want = bytes_for_bits(count);
        if src.len() < want {
            return Err(MemoryError::SrcTooSmall);
        }

        let off = layout.offset(address);

        let mut cells = self.cells.write();
        let backing = match area {
            Area::Coils => &mut cells.coil_bits,
            _ => &mut cells.discrete_input_bits,
        };
        write_bits(backing, off, count, &src[..want]);

        Ok(())
    }

    /// Read `count` registers from a register area into `dst` as big-endian
    /// 16-bit words. `dst` must hold at least `count * 2` bytes.
    pub fn read_registers(
        &self,
        area: Area,
        address: u16,
        count: u16,
        dst: &mut [u8],
    ) -> Result<()> {
        if count == 0 {
            return Err(MemoryError::CountZero);
        }

        let want = count as usize * 2;
        if dst.len() < want {
            return Err(MemoryError::DstTooSmall);
        }

        let layout = self.register_layout(area)?;
        if !layout.contains(address, count) {
            return Err(MemoryError::OutOfBounds);
        }

        let off = layout.offset(address) as usize;

        let cells = self.cells.read();
        let backing = match area {
            Area::HoldingRegisters => &cells.holding_words,
            _ => &cells.input_words,
        };
        for i in 0..count as usize {
            dst[i * 2..i * 2 + 2].copy_from_slice(&backing[off + i].to_be_bytes());
        }

        Ok(())
    }

    /// Write `count` registers into a register area from `src`, interpreted
    /// as big-endian 16-bit words. `src` must hold at least `count * 2` bytes.
    pub fn write_registers(&self, area: Area, address: u16, count: u16, src: &[u8]) -> Result<()> {
        if count == 0 {
            return Err(MemoryError::CountZero);
        }

        let want = count as usize * 2;
        if src.len() < want {
            return Err(MemoryError::SrcTooSmall);
        }

        let layout = self.register_layout(area)?;
        if !layout.contains(address, count) {
            return Err(MemoryError::OutOfBounds);
        }

        let off = layout.offset(address) as usize;

        let mut cells = self.cells.write();
        let backing = match area {
            Area::HoldingRegisters => &mut cells.holding_words,
            _ => &mut cells.input_words,
        };
        for i in 0..count as usize {
            backing[off + i] = u16::from_be_bytes([src[i * 2], src[i * 2 + 1]]);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_with_all_areas() -> Memory {
        Memory::new(MemoryLayouts {
            coils: Some(AreaLayout::new(0, 64)),
            discrete_inputs: Some(AreaLayout::new(16, 32)),
            holding_registers: Some(AreaLayout::new(100, 20)),
            input_registers: Some(AreaLayout::new(0, 10)),
        })
        .unwrap()
    }

    #[test]
    fn test_memory_id_validation() {
        assert!(MemoryId::new(502, 1).validate().is_ok());
        assert_eq!(
            MemoryId::new(0, 1).validate(),
            Err(MemoryError::PortZero)
        );
        assert_eq!(
            MemoryId::new(502, 0).validate(),
            Err(MemoryError::UnitIdZero)
        );
    }

    #[test]
    fn test_bit_round_trip() {
        let mem = memory_with_all_areas();

        let pattern = [0b1011_0101u8, 0b0000_0110];
        mem.write_bits(Area::Coils, 3, 11, &pattern).unwrap();

        let mut out = [0u8; 2];
        mem.read_bits(Area::Coils, 3, 11, &mut out).unwrap();
        assert_eq!(out[0], pattern[0]);
        assert_eq!(out[1] & 0b0000_0111, pattern[1] & 0b0000_0111);
    }

    #[test]
    fn test_register_round_trip() {
        let mem = memory_with_all_areas();

        let words = [0x1234u16, 0xABCD, 0x00FF];
        let mut src = Vec::new();
        for w in words {
            src.extend_from_slice(&w.to_be_bytes());
        }
        mem.write_registers(Area::HoldingRegisters, 105, 3, &src)
            .unwrap();

        let mut out = [0u8; 6];
        mem.read_registers(Area::HoldingRegisters, 105, 3, &mut out)
            .unwrap();
        assert_eq!(out, src.as_slice());
    }

    #[test]
    fn test_out_of_bounds_rejected_and_storage_untouched() {
        let mem = memory_with_all_areas();

        let src = vec![0xFFu8; 20 * 2];
        mem.write_registers(Area::HoldingRegisters, 100, 20, &vec![0u8; 40])
            .unwrap();

        // Window runs one register past the layout end.
        assert_eq!(
            mem.write_registers(Area::HoldingRegisters, 101, 20, &src),
            Err(MemoryError::OutOfBounds)
        );

        let mut out = [0u8; 40];
        mem.read_registers(Area::HoldingRegisters, 100, 20, &mut out)
            .unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_count_zero_rejected() {
        let mem = memory_with_all_areas();
        let mut buf = [0u8; 4];
        assert_eq!(
            mem.read_bits(Area::Coils, 0, 0, &mut buf),
            Err(MemoryError::CountZero)
        );
        assert_eq!(
            mem.read_registers(Area::InputRegisters, 0, 0, &mut buf),
            Err(MemoryError::CountZero)
        );
    }

    #[test]
    fn test_undefined_area_rejected() {
        let mem = Memory::new(MemoryLayouts {
            coils: Some(AreaLayout::new(0, 8)),
            ..Default::default()
        })
        .unwrap();

        let mut buf = [0u8; 2];
        assert_eq!(
            mem.read_registers(Area::HoldingRegisters, 0, 1, &mut buf),
            Err(MemoryError::AreaNotDefined)
        );
        assert_eq!(
            mem.read_bits(Area::DiscreteInputs, 0, 1, &mut buf),
            Err(MemoryError::AreaNotDefined)
        );
    }

    #[test]
    fn test_wrong_area_kind_rejected() {
        let mem = memory_with_all_areas();
        let mut buf = [0u8; 2];
        assert_eq!(
            mem.read_bits(Area::HoldingRegisters, 100, 1, &mut buf),
            Err(MemoryError::InvalidArea)
        );
        assert_eq!(
            mem.read_registers(Area::Coils, 0, 1, &mut buf),
            Err(MemoryError::InvalidArea)
        );
    }

    #[test]
    fn test_buffer_sizing_rejected() {
        let mem = memory_with_all_areas();

        let mut small = [0u8; 1];
        assert_eq!(
            mem.read_bits(Area::Coils, 0, 9, &mut small),
            Err(MemoryError::DstTooSmall)
        );
        assert_eq!(
            mem.read_registers(Area::HoldingRegisters, 100, 1, &mut small),
            Err(MemoryError::DstTooSmall)
        );
        assert_eq!(
            mem.write_bits(Area::Coils, 0, 9, &small),
            Err(MemoryError::SrcTooSmall)
        );
        assert_eq!(
            mem.write_registers(Area::HoldingRegisters, 100, 1, &small),
            Err(MemoryError::SrcTooSmall)
        );
    }

    #[test]
    fn test_nonzero_layout_start_offsets() {
        let mem = memory_with_all_areas();

        // discrete inputs start at 16; address 16 maps to backing bit 0.
        mem.write_bits(Area::DiscreteInputs, 16, 1, &[1]).unwrap();
        let mut out = [0u8];
        mem.read_bits(Area::DiscreteInputs, 16, 1, &mut out).unwrap();
        assert_eq!(out[0] & 1, 1);

        assert_eq!(
            mem.read_bits(Area::DiscreteInputs, 15, 1, &mut out),
            Err(MemoryError::OutOfBounds)
        );
    }

    #[test]
    fn test_state_sealing_is_metadata_only() {
        let mut mem = memory_with_all_areas();
        assert!(mem.state_sealing().is_none());

        mem.set_state_sealing(StateSealingDef {
            area: Area::Coils,
            address: 0,
        });
        let def = mem.state_sealing().unwrap();
        assert_eq!(def.area, Area::Coils);
        assert_eq!(def.address, 0);

        // The sealing bit reads through the ordinary coil path.
        mem.write_bits(Area::Coils, 0, 1, &[1]).unwrap();
        let mut flag = [0u8];
        mem.read_bits(def.area, def.address, 1, &mut flag).unwrap();
        assert_eq!(flag[0] & 1, 1);
    }
}
