use crate::sfnt::search_params;
use crate::stream::{Readable, Reader, Writeable, Writer};
use crate::Result;

/// A format 4 subtable: segment mapping to delta values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Subtable4<'a> {
    language: u16,
    end_codes: Vec<u16>,
    start_codes: Vec<u16>,
    id_deltas: Vec<i16>,
    id_range_offsets: Vec<u16>,
    /// The data starting at the `idRangeOffset` array, which the offsets are
    /// relative to.
    glyph_id_array: &'a [u8],
}

impl<'a> Subtable4<'a> {
    /// A table that maps nothing. It only has the mandatory final segment.
    pub fn empty() -> Self {
        Subtable4 {
            language: 0,
            end_codes: vec![0xFFFF],
            start_codes: vec![0xFFFF],
            id_deltas: vec![1],
            id_range_offsets: vec![0],
            glyph_id_array: &[],
        }
    }

    /// Returns a glyph index for a code point.
    #[cfg(test)]
    pub fn glyph_index(&self, code_point: u32) -> Option<u16> {
        // This subtable supports code points only in a u16 range.
        let code_point = u16::try_from(code_point).ok()?;

        // A custom binary search.
        let mut start = 0;
        let mut end = self.start_codes.len();
        while end > start {
            let index = (start + end) / 2;
            let end_value = *self.end_codes.get(index)?;
            if end_value >= code_point {
                let start_value = *self.start_codes.get(index)?;
                if start_value > code_point {
                    end = index;
                } else {
                    return self.segment_glyph(index, code_point);
                }
            } else {
                start = index + 1;
            }
        }

        None
    }

    /// Map a code point that lies in the segment at `index`.
    fn segment_glyph(&self, index: usize, code_point: u16) -> Option<u16> {
        let start_value = *self.start_codes.get(index)?;
        let id_range_offset = *self.id_range_offsets.get(index)?;
        let id_delta = *self.id_deltas.get(index)? as u16;

        let glyph_id = if id_range_offset == 0 {
            code_point.wrapping_add(id_delta)
        } else if id_range_offset == 0xFFFF {
            // Some malformed fonts have 0xFFFF as the last offset,
            // which is invalid and should be ignored.
            return None;
        } else {
            let delta = (u32::from(code_point) - u32::from(start_value)) * 2;
            let pos = (index * 2) as u32 + delta + u32::from(id_range_offset);
            let glyph_array_value = u16::read_at(self.glyph_id_array, pos as usize).ok()?;

            // 0 indicates missing glyph.
            if glyph_array_value == 0 {
                return None;
            }

            glyph_array_value.wrapping_add(id_delta)
        };

        // The result wraps around modulo 65536, 0 is .notdef.
        (glyph_id != 0).then_some(glyph_id)
    }

    /// Calls `f` for each mapping defined in this table.
    ///
    /// Where segments overlap, the one that starts first wins. Each code
    /// point is visited at most once.
    pub fn mappings(&self, mut f: impl FnMut(u32, u16)) {
        let mut segments: Vec<_> = self
            .start_codes
            .iter()
            .zip(&self.end_codes)
            .map(|(&start, &end)| (start, end))
            .enumerate()
            .collect();
        segments.sort_by_key(|&(_, (start, _))| start);

        // The first code point no segment has covered yet.
        let mut next = 0u32;

        for (index, (start, end)) in segments {
            // OxFFFF value is special and indicates codes end.
            if start == end && start == 0xFFFF {
                break;
            }

            let start = u32::from(start).max(next);
            for code_point in start..=u32::from(end) {
                // Below 0x10000, as `end` is.
                if let Some(glyph_id) = self.segment_glyph(index, code_point as u16) {
                    f(code_point, glyph_id);
                }
            }

            next = next.max(u32::from(end) + 1);
        }
    }
}

impl<'a> Readable<'a> for Subtable4<'a> {
    fn read(r: &mut Reader<'a>) -> Result<Self> {
        r.skip(4)?; // format + length
        let language = r.read::<u16>()?;
        let seg_count_x2 = r.read::<u16>()?;

        if seg_count_x2 < 2 {
            return Err(r.invalid("no segments"));
        }

        let seg_count = usize::from(seg_count_x2 / 2);
        r.skip(6)?; // search range + entry selector + range shift
        let end_codes = r.read_vector::<u16>(seg_count)?;
        r.skip(2)?; // reserved pad
        let start_codes = r.read_vector::<u16>(seg_count)?;
        let id_deltas = r.read_vector::<i16>(seg_count)?;

        let glyph_id_array = r.tail();
        let id_range_offsets = r.read_vector::<u16>(seg_count)?;

        Ok(Subtable4 {
            language,
            end_codes,
            start_codes,
            id_deltas,
            id_range_offsets,
            glyph_id_array,
        })
    }
}

impl Writeable for Subtable4<'_> {
    /// Writes the segments with zero range offsets, i.e. without a glyph
    /// ID array.
    fn write(&self, w: &mut Writer) {
        let seg_count = self.end_codes.len() as u16;

        w.write::<u16>(4); // format

        // (format + length + language + seg_count_x2 + search_range +
        // entry_selector + range_shift + reserved_pad) + seg_count *
        // (end_code + start_code + id_delta + id_range_offsets)
        let length = 2 * 8 + 2 * seg_count * 4;
        w.write::<u16>(length);
        w.write::<u16>(self.language);

        let (search_range, entry_selector, range_shift) = search_params(seg_count, 2);
        w.write::<u16>(2 * seg_count);
        w.write::<u16>(search_range);
        w.write::<u16>(entry_selector);
        w.write::<u16>(range_shift);

        w.write_vector(&self.end_codes);
        w.write::<u16>(0); // reserved pad
        w.write_vector(&self.start_codes);
        w.write_vector(&self.id_deltas);
        w.write_vector(&self.id_range_offsets);
    }
}
