//! Reading the character to glyph mapping and writing the (empty) mapping of
//! subsetted fonts.
//!
//! Exactly one subtable is used for lookups. It is picked by a fixed
//! preference order, see [`CmapIndex::parse`].

use crate::cmap::subtable12::Subtable12;
use crate::cmap::subtable4::Subtable4;
use crate::error::FormatError;
use crate::stream::{Readable, Reader, Writeable, Writer};
use crate::{Context, Result, Tag};
use rustc_hash::FxHashMap;

mod subtable12;
mod subtable4;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct EncodingRecord {
    platform_id: u16,
    encoding_id: u16,
    subtable_offset: u32,
}

impl Readable<'_> for EncodingRecord {
    fn read(r: &mut Reader) -> Result<Self> {
        let platform_id = r.read::<u16>()?;
        let encoding_id = r.read::<u16>()?;
        let subtable_offset = r.read::<u32>()?;

        Ok(EncodingRecord { platform_id, encoding_id, subtable_offset })
    }
}

impl Writeable for EncodingRecord {
    fn write(&self, w: &mut Writer) {
        w.write::<u16>(self.platform_id);
        w.write::<u16>(self.encoding_id);
        w.write::<u32>(self.subtable_offset);
    }
}

/// How much a subtable is preferred, lower is better. `None` if it can't be
/// used at all.
fn preference(platform_id: u16, encoding_id: u16, format: u16) -> Option<u8> {
    match (platform_id, encoding_id, format) {
        (0, _, 12) => Some(0),
        (0, _, 4) => Some(1),
        (3, 10, 12) => Some(2),
        (3, 10, 4) => Some(3),
        (3, 1, 12) => Some(4),
        (3, 1, 4) => Some(5),
        (_, _, 4) => Some(6),
        _ => None,
    }
}

/// A map from Unicode code points to glyph IDs.
///
/// Only mappings to existing glyphs other than `.notdef` are kept.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CmapIndex {
    map: FxHashMap<u32, u16>,
}

impl CmapIndex {
    /// Build the index from a `cmap` table.
    ///
    /// The subtable is selected in this order: Unicode platform format 12,
    /// then format 4; Windows Unicode full repertoire (encoding 10), then
    /// Unicode BMP (encoding 1), with format 12 preferred over format 4
    /// within each; else any format 4 subtable.
    pub fn parse(cmap: &[u8], num_glyphs: u16) -> Result<Self> {
        let mut r = Reader::named(cmap, "cmap table");
        r.read::<u16>()?; // version
        let num_tables = r.read::<u16>()?;
        let records = r.read_vector::<EncodingRecord>(usize::from(num_tables))?;

        let mut best: Option<(u8, EncodingRecord, u16)> = None;
        for record in records {
            let Ok(format) = u16::read_at(cmap, record.subtable_offset as usize) else {
                log::warn!("cmap subtable offset {} is out of bounds", record.subtable_offset);
                continue;
            };

            let Some(rank) = preference(record.platform_id, record.encoding_id, format) else {
                continue;
            };

            if best.map_or(true, |(best_rank, ..)| rank < best_rank) {
                best = Some((rank, record, format));
            }
        }

        let Some((_, record, format)) = best else {
            return Err(FormatError::NoUnicodeCmap.into());
        };

        log::debug!(
            "using cmap subtable format {} (platform {}, encoding {})",
            format,
            record.platform_id,
            record.encoding_id,
        );

        let mut map = FxHashMap::default();
        let mut dropped = 0usize;
        let mut insert = |code_point: u32, glyph_id: u16| {
            if glyph_id < num_glyphs {
                map.insert(code_point, glyph_id);
            } else {
                dropped += 1;
            }
        };

        let mut r = Reader::new_at(cmap, record.subtable_offset as usize, "cmap subtable");
        if format == 12 {
            r.read::<Subtable12>()?.mappings(num_glyphs, &mut insert);
        } else {
            r.read::<Subtable4>()?.mappings(&mut insert);
        }

        if dropped > 0 {
            log::warn!("dropped {dropped} cmap mappings to glyphs past the last one");
        }

        Ok(CmapIndex { map })
    }

    /// Map a code point to a glyph.
    pub fn glyph_index(&self, code_point: u32) -> Option<u16> {
        self.map.get(&code_point).copied()
    }

    /// The number of mapped code points.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over all pairs of code point and glyph, in no particular
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        self.map.iter().map(|(&c, &g)| (c, g))
    }
}

/// Write the `cmap` of the subsetted font.
///
/// PDF readers map codes to glyphs directly, so the table keeps no mappings.
/// It consists of a single Windows Unicode BMP subtable with only the
/// mandatory final segment.
pub(crate) fn subset(ctx: &mut Context) -> Result<()> {
    let mut sub_cmap = Writer::new();
    sub_cmap.write::<u16>(0); // version
    sub_cmap.write::<u16>(1); // number of subtables
    sub_cmap.write(EncodingRecord { platform_id: 3, encoding_id: 1, subtable_offset: 12 });
    sub_cmap.write(Subtable4::empty());

    ctx.push(Tag::CMAP, sub_cmap.finish());
    Ok(())
}
