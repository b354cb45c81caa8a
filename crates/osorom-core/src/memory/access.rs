//! Data access helpers: alignment policy and line/lane placement.

use super::{Line, LINE_BYTES};
use crate::FaultCode;

/// Validates natural alignment of a `width`-byte access at byte address `addr`.
///
/// # Errors
///
/// Returns [`FaultCode::MisalignedAccess`] when `addr` is not a multiple of
/// `width`.
pub const fn validate_alignment(addr: u32, width: u32) -> Result<(), FaultCode> {
    if width == 0 || addr % width == 0 {
        Ok(())
    } else {
        Err(FaultCode::MisalignedAccess)
    }
}

/// Validates that a `width`-byte access at `addr` lies inside a store of
/// `size_bytes` bytes.
///
/// # Errors
///
/// Returns [`FaultCode::AddressOutOfRange`] when any accessed byte is past the
/// end of the store.
pub const fn validate_range(addr: u32, width: u32, size_bytes: usize) -> Result<(), FaultCode> {
    let end = addr as u64 + width as u64;
    if end <= size_bytes as u64 {
        Ok(())
    } else {
        Err(FaultCode::AddressOutOfRange)
    }
}

/// Line index holding byte address `addr`.
#[must_use]
pub const fn line_index(addr: u32) -> u32 {
    addr / LINE_BYTES as u32
}

/// Byte-enable mask covering a `width`-byte access at `addr`.
#[must_use]
pub const fn byte_enable_mask(addr: u32, width: u32) -> u16 {
    let offset = addr % LINE_BYTES as u32;
    let bits = ((1u32 << width) - 1) << offset;
    (bits & 0xFFFF) as u16
}

/// Places the low `width` bytes of `value` at `addr` within an otherwise zero line.
#[must_use]
pub const fn place_in_line(addr: u32, width: u32, value: u32) -> Line {
    let offset = addr % LINE_BYTES as u32;
    let mut line = [0u32; 4];
    let mut index = 0;
    while index < width {
        let byte = (value >> (8 * index)) & 0xFF;
        let position = offset + index;
        line[(position / 4) as usize] |= byte << (8 * (position % 4));
        index += 1;
    }
    line
}

/// Extracts a zero-extended `width`-byte value at `addr` from `line`.
#[must_use]
pub const fn extract_from_line(line: &Line, addr: u32, width: u32) -> u32 {
    let offset = addr % LINE_BYTES as u32;
    let mut value = 0;
    let mut index = 0;
    while index < width {
        let position = offset + index;
        let byte = (line[(position / 4) as usize] >> (8 * (position % 4))) & 0xFF;
        value |= byte << (8 * index);
        index += 1;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::{
        byte_enable_mask, extract_from_line, line_index, place_in_line, validate_alignment,
        validate_range,
    };
    use crate::FaultCode;
    use rstest::rstest;

    #[rstest]
    #[case(0x101, 1, true)]
    #[case(0x102, 2, true)]
    #[case(0x103, 2, false)]
    #[case(0x104, 4, true)]
    #[case(0x106, 4, false)]
    fn natural_alignment(#[case] addr: u32, #[case] width: u32, #[case] aligned: bool) {
        let expected = if aligned {
            Ok(())
        } else {
            Err(FaultCode::MisalignedAccess)
        };
        assert_eq!(validate_alignment(addr, width), expected);
    }

    #[rstest]
    #[case(0x3FC, 4, true)]
    #[case(0x3FD, 4, false)]
    #[case(0x3FF, 1, true)]
    #[case(0x400, 1, false)]
    #[case(u32::MAX, 4, false)]
    fn range_covers_every_accessed_byte(
        #[case] addr: u32,
        #[case] width: u32,
        #[case] inside: bool,
    ) {
        let expected = if inside {
            Ok(())
        } else {
            Err(FaultCode::AddressOutOfRange)
        };
        assert_eq!(validate_range(addr, width, 0x400), expected);
    }

    #[test]
    fn placement_matches_byte_enables() {
        assert_eq!(line_index(0x35), 3);
        assert_eq!(byte_enable_mask(0x36, 2), 0b0000_0000_0100_0000 | 0b1000_0000);
        assert_eq!(byte_enable_mask(0x3C, 4), 0xF000);
        let line = place_in_line(0x36, 2, 0xBEEF);
        assert_eq!(line, [0, 0xBEEF_0000, 0, 0]);
        assert_eq!(extract_from_line(&line, 0x36, 2), 0xBEEF);
        assert_eq!(extract_from_line(&line, 0x37, 1), 0xBE);
    }
}
