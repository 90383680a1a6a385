//! Memory area kinds.

use crate::error::MemoryError;

/// One of the four addressable area kinds of a memory instance.
///
/// Coils and discrete inputs are bit areas (one bit per addressable unit,
/// packed LSB-first); holding and input registers are word areas (16-bit
/// big-endian on the wire). The discriminants double as the raw-ingest wire
/// codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Area {
    Coils = 1,
    DiscreteInputs = 2,
    HoldingRegisters = 3,
    InputRegisters = 4,
}

impl Area {
    /// True for the single-bit area kinds.
    pub fn is_bit_area(self) -> bool {
        matches!(self, Area::Coils | Area::DiscreteInputs)
    }

    /// True for the 16-bit word area kinds.
    pub fn is_register_area(self) -> bool {
        matches!(self, Area::HoldingRegisters | Area::InputRegisters)
    }

    /// Bytes needed to carry `count` addressable units of this area kind.
    pub fn payload_len(self, count: u16) -> usize {
        if self.is_bit_area() {
            crate::bits::bytes_for_bits(count)
        } else {
            count as usize * 2
        }
    }
}

impl TryFrom<u8> for Area {
    type Error = MemoryError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Area::Coils),
            2 => Ok(Area::DiscreteInputs),
            3 => Ok(Area::HoldingRegisters),
            4 => Ok(Area::InputRegisters),
            _ => Err(MemoryError::InvalidArea),
        }
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Area::Coils => "coils",
            Area::DiscreteInputs => "discrete_inputs",
            Area::HoldingRegisters => "holding_registers",
            Area::InputRegisters => "input_registers",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_classification() {
        assert!(Area::Coils.is_bit_area());
        assert!(Area::DiscreteInputs.is_bit_area());
        assert!(!Area::HoldingRegisters.is_bit_area());
        assert!(Area::HoldingRegisters.is_register_area());
        assert!(Area::InputRegisters.is_register_area());
        assert!(!Area::Coils.is_register_area());
    }

    #[test]
    fn test_wire_code_round_trip() {
        for code in 1u8..=4 {
            let area = Area::try_from(code).unwrap();
            assert_eq!(area as u8, code);
        }
        assert_eq!(Area::try_from(0), Err(MemoryError::InvalidArea));
        assert_eq!(Area::try_from(5), Err(MemoryError::InvalidArea));
    }

    #[test]
    fn test_payload_len() {
        assert_eq!(Area::Coils.payload_len(1), 1);
        assert_eq!(Area::Coils.payload_len(8), 1);
        assert_eq!(Area::Coils.payload_len(9), 2);
        assert_eq!(Area::HoldingRegisters.payload_len(3), 6);
    }
}
