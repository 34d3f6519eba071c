//! Subset the `post` table. The `post` table contains name information for glyphs
//! needed for some PostScript printers. Glyph names are of no use in a PDF, so
//! instead of subsetting the name list, the table is reduced to its header and
//! turned into a version 3.0 table, which has no names.

use super::*;
use crate::error::FormatError;

/// Size of the `post` header shared by all versions.
const HEADER_SIZE: usize = 32;

/// Version 3.0: no glyph names.
const VERSION_3: u32 = 0x00030000;

pub(crate) fn subset(ctx: &mut Context) -> Result<()> {
    let post = ctx.expect_table(Tag::POST)?;
    let header = post.get(..HEADER_SIZE).ok_or(FormatError::Truncated("post table"))?;

    let mut sub_post = Writer::with_capacity(HEADER_SIZE);
    sub_post.write::<u32>(VERSION_3);
    sub_post.extend(&header[4..]);

    ctx.push(Tag::POST, sub_post.finish());
    Ok(())
}
