//! The two variable-length integer encodings of WOFF2.
//!
//! See <https://www.w3.org/TR/WOFF2/#DataTypes>.

use crate::stream::{Readable, Reader};
use crate::Result;

/// `UIntBase128`: a `u32` stored in 1 to 5 bytes, seven bits at a time,
/// most significant group first.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UIntBase128(pub u32);

impl Readable<'_> for UIntBase128 {
    fn read(r: &mut Reader) -> Result<Self> {
        let mut accum = 0u32;

        for i in 0..5 {
            let byte = r.read::<u8>()?;

            // No leading zeros.
            if i == 0 && byte == 0x80 {
                return Err(r.invalid("UIntBase128 has a leading zero"));
            }

            // If any of the top seven bits are set, shifting would overflow.
            if accum & 0xFE00_0000 != 0 {
                return Err(r.invalid("UIntBase128 overflows 32 bits"));
            }

            accum = (accum << 7) | u32::from(byte & 0x7F);

            if byte & 0x80 == 0 {
                return Ok(Self(accum));
            }
        }

        Err(r.invalid("UIntBase128 is longer than 5 bytes"))
    }
}

/// `255UInt16`: a `u16` stored in 1 to 3 bytes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct U16Packed(pub u16);

const ONE_MORE_BYTE_CODE1: u8 = 255;
const ONE_MORE_BYTE_CODE2: u8 = 254;
const WORD_CODE: u8 = 253;
const LOWEST_UCODE: u16 = 253;

impl Readable<'_> for U16Packed {
    fn read(r: &mut Reader) -> Result<Self> {
        let value = match r.read::<u8>()? {
            WORD_CODE => r.read::<u16>()?,
            ONE_MORE_BYTE_CODE1 => u16::from(r.read::<u8>()?) + LOWEST_UCODE,
            ONE_MORE_BYTE_CODE2 => u16::from(r.read::<u8>()?) + LOWEST_UCODE * 2,
            code => u16::from(code),
        };

        Ok(Self(value))
    }
}

/// Read a `UIntBase128` from the start of `data`, returning the value and
/// the number of bytes it occupied.
pub fn read_base128(data: &[u8]) -> Result<(u32, usize)> {
    let mut r = Reader::named(data, "UIntBase128");
    let UIntBase128(value) = r.read()?;
    Ok((value, r.offset()))
}

/// Read a `255UInt16` from the start of `data`, returning the value and the
/// number of bytes it occupied.
pub fn read_255_u16(data: &[u8]) -> Result<(u16, usize)> {
    let mut r = Reader::named(data, "255UInt16");
    let U16Packed(value) = r.read()?;
    Ok((value, r.offset()))
}
