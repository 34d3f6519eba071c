//! Reconstruction of the transformed `hmtx` table.
//!
//! The transform drops left side bearings that equal the glyph's `xMin`,
//! which is the case for most fonts. They are restored from the bounding
//! boxes of the rebuilt `glyf` table.
//!
//! See <https://www.w3.org/TR/WOFF2/#hmtx_table_format>.

use crate::stream::{Reader, Writer};
use crate::{Error, Result};

/// The `lsb` array of proportional glyphs is absent.
const PROPORTIONAL_LSBS_ABSENT: u8 = 1 << 0;
/// The `leftSideBearing` array of monospaced glyphs is absent.
const MONOSPACE_LSBS_ABSENT: u8 = 1 << 1;
const RESERVED: u8 = !(PROPORTIONAL_LSBS_ABSENT | MONOSPACE_LSBS_ABSENT);

/// Rebuild `hmtx`.
///
/// `num_h_metrics` comes from `hhea`, the glyph count and the `xMin` of
/// each glyph from the reconstructed `glyf` table.
pub fn reconstruct(data: &[u8], num_h_metrics: u16, x_mins: &[i16]) -> Result<Vec<u8>> {
    let num_glyphs = x_mins.len();
    let num_h_metrics = usize::from(num_h_metrics);

    let mut r = Reader::named(data, "transformed hmtx table");
    let flags = r.read::<u8>()?;
    if flags & RESERVED != 0 {
        return Err(r.invalid("reserved flags are set"));
    }

    if flags == 0 {
        return Err(r.invalid("table is transformed without dropping any data"));
    }

    if flags == PROPORTIONAL_LSBS_ABSENT | MONOSPACE_LSBS_ABSENT {
        return Err(r.invalid("both side bearing arrays are dropped"));
    }

    if num_h_metrics < 1 || num_h_metrics > num_glyphs {
        return Err(Error::invalid("hhea table", "numberOfHMetrics is out of range"));
    }

    let advances = r.read_vector::<u16>(num_h_metrics)?;

    let mut lsbs = Vec::with_capacity(num_glyphs);
    for (gid, &x_min) in x_mins.iter().enumerate() {
        let absent = if gid < num_h_metrics {
            flags & PROPORTIONAL_LSBS_ABSENT != 0
        } else {
            flags & MONOSPACE_LSBS_ABSENT != 0
        };

        lsbs.push(if absent { x_min } else { r.read::<i16>()? });
    }

    let mut w = Writer::with_capacity(2 * num_h_metrics + 2 * num_glyphs);
    for (gid, lsb) in lsbs.into_iter().enumerate() {
        if let Some(&advance) = advances.get(gid) {
            w.write::<u16>(advance);
        }
        w.write::<i16>(lsb);
    }

    Ok(w.finish())
}
