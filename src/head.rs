//! The `head` table mostly contains information that can be reused from the
//! old table, except for the `loca` format: the subsetted font always uses
//! long offsets. The checksum will be recalculated in the very end.

use super::*;
use crate::error::FormatError;

/// Offset of `unitsPerEm`.
pub(crate) const UNITS_PER_EM_OFFSET: usize = 18;
/// Offset of `indexToLocFormat`.
pub(crate) const INDEX_TO_LOC_FORMAT_OFFSET: usize = 50;

/// Read `unitsPerEm`.
pub(crate) fn units_per_em(head: &[u8]) -> Result<u16> {
    let units_per_em = u16::read_at(head, UNITS_PER_EM_OFFSET)
        .map_err(|_| FormatError::Truncated("head table"))?;
    if units_per_em == 0 {
        return Err(Error::invalid("head table", "unitsPerEm is zero"));
    }
    Ok(units_per_em)
}

pub(crate) fn subset(ctx: &mut Context) -> Result<()> {
    let mut head = ctx.expect_table(Tag::HEAD)?.to_vec();
    let index_to_loc = head
        .get_mut(INDEX_TO_LOC_FORMAT_OFFSET..INDEX_TO_LOC_FORMAT_OFFSET + 2)
        .ok_or(FormatError::Truncated("head table"))?;
    index_to_loc.copy_from_slice(&1i16.to_be_bytes());
    ctx.push(Tag::HEAD, head);
    Ok(())
}
