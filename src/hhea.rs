use super::*;
use crate::error::FormatError;

/// Offset of `numberOfHMetrics`.
pub(crate) const NUM_H_METRICS_OFFSET: usize = 34;

/// The vertical font-wide metrics and the number of long horizontal
/// metrics.
pub(crate) struct Hhea {
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub num_h_metrics: u16,
}

impl Readable<'_> for Hhea {
    fn read(r: &mut Reader) -> Result<Self> {
        r.skip(4)?; // version
        let ascender = r.read::<i16>()?;
        let descender = r.read::<i16>()?;
        let line_gap = r.read::<i16>()?;
        r.skip(NUM_H_METRICS_OFFSET - 10)?;
        let num_h_metrics = r.read::<u16>()?;
        Ok(Hhea { ascender, descender, line_gap, num_h_metrics })
    }
}

impl Hhea {
    pub(crate) fn parse(data: &[u8]) -> Result<Self> {
        Reader::named(data, "hhea table").read()
    }
}

pub(crate) fn subset(ctx: &mut Context) -> Result<()> {
    let num_h_metrics = ctx.num_h_metrics.ok_or(Error::missing(Tag::HMTX))?;

    let mut hhea = ctx.expect_table(Tag::HHEA)?.to_vec();
    hhea.get_mut(NUM_H_METRICS_OFFSET..NUM_H_METRICS_OFFSET + 2)
        .ok_or(FormatError::Truncated("hhea table"))?
        .copy_from_slice(&num_h_metrics.to_be_bytes());

    ctx.push(Tag::HHEA, hhea);
    Ok(())
}
