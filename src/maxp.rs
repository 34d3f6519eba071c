use super::*;
use crate::error::FormatError;

/// Read `numGlyphs`, the authoritative glyph count of the font.
pub(crate) fn num_glyphs(maxp: &[u8]) -> Result<u16> {
    u16::read_at(maxp, 4).map_err(|_| FormatError::Truncated("maxp table").into())
}

pub(crate) fn subset(ctx: &mut Context) -> Result<()> {
    let maxp = ctx.expect_table(Tag::MAXP)?;
    let mut r = Reader::named(maxp, "maxp table");
    let version = r.read::<u32>()?;
    r.read::<u16>()?; // num glyphs

    let mut sub_maxp = Writer::new();
    sub_maxp.write::<u32>(version);
    sub_maxp.write::<u16>(ctx.mapper.num_gids());

    if version == 0x00010000 {
        sub_maxp.extend(r.tail());
    }

    ctx.push(Tag::MAXP, sub_maxp.finish());
    Ok(())
}
