use crate::stream::{Readable, Reader};
use crate::Result;

/// The highest Unicode code point.
const MAX_CODE_POINT: u32 = 0x10FFFF;

#[derive(Debug, Clone, Eq, PartialEq)]
struct SequentialMapGroupRecord {
    start_char_code: u32,
    end_char_code: u32,
    start_glyph_id: u32,
}

impl Readable<'_> for SequentialMapGroupRecord {
    fn read(r: &mut Reader<'_>) -> Result<Self> {
        let start_char_code = r.read::<u32>()?;
        let end_char_code = r.read::<u32>()?;
        let start_glyph_id = r.read::<u32>()?;

        Ok(Self { start_char_code, end_char_code, start_glyph_id })
    }
}

/// A format 12 subtable: segmented coverage.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Subtable12 {
    groups: Vec<SequentialMapGroupRecord>,
}

impl Subtable12 {
    /// Returns a glyph index for a code point.
    #[cfg(test)]
    fn glyph_index(&self, code_point: u32) -> Option<u16> {
        let mut found = None;
        self.mappings(u16::MAX, |c, g| {
            if c == code_point && found.is_none() {
                found = Some(g);
            }
        });
        found
    }

    /// Calls `f` for each mapping defined in this table whose glyph is below
    /// `num_glyphs`.
    ///
    /// Code points beyond Unicode and glyph IDs beyond 16 bit are ignored.
    /// Where groups overlap, the one that starts first wins. Each code point
    /// is visited at most once.
    pub fn mappings(&self, num_glyphs: u16, mut f: impl FnMut(u32, u16)) {
        let last_glyph = u32::from(num_glyphs.saturating_sub(1));

        let mut groups: Vec<_> = self.groups.iter().collect();
        groups.sort_by_key(|group| group.start_char_code);

        // The first code point no group has covered yet.
        let mut next = 0;

        for group in groups {
            let start = group.start_char_code.max(next);
            let mut end = group.end_char_code.min(MAX_CODE_POINT);
            if start > end {
                if group.start_char_code < next {
                    log::warn!("cmap group {:#X} overlaps its predecessor", group.start_char_code);
                }
                continue;
            }

            // Glyph IDs only grow within a group.
            let Some(room) = last_glyph.checked_sub(group.start_glyph_id) else {
                log::warn!("cmap group {:#X} maps past the last glyph", group.start_char_code);
                continue;
            };

            let last_mapped = group.start_char_code.saturating_add(room);
            if last_mapped < end {
                log::warn!(
                    "cmap group {:#X}..={:#X} maps past the last glyph",
                    group.start_char_code,
                    group.end_char_code,
                );
                end = last_mapped;
                if start > end {
                    continue;
                }
            }

            for code_point in start..=end {
                // Bounded by `last_glyph`, so within 16 bit.
                let glyph_id = group.start_glyph_id + (code_point - group.start_char_code);
                if glyph_id != 0 {
                    f(code_point, glyph_id as u16);
                }
            }

            next = end + 1;
        }
    }
}

impl Readable<'_> for Subtable12 {
    fn read(r: &mut Reader<'_>) -> Result<Self> {
        r.read::<u16>()?; // format
        r.read::<u16>()?; // reserved
        r.read::<u32>()?; // length
        r.read::<u32>()?; // language
        let num_groups = r.read::<u32>()?;

        let groups = r.read_vector::<SequentialMapGroupRecord>(num_groups as usize)?;
        Ok(Self { groups })
    }
}
