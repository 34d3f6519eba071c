//! Reconstruction of the transformed `glyf` and `loca` tables.
//!
//! The transform splits the glyph data into seven streams that compress
//! better than the interleaved original: contour counts, point counts, point
//! flags, coordinate triplets, composite records, bounding boxes and
//! instructions. Glyphs are rebuilt one by one by pulling from all of them in
//! lockstep.
//!
//! See <https://www.w3.org/TR/WOFF2/#glyf_table_format>.

use crate::glyf::{Component, WE_HAVE_INSTRUCTIONS};
use crate::stream::{Readable, Reader, Writeable, Writer};
use crate::varint::U16Packed;
use crate::{Error, Result};

/// Bit 0 of the option flags: an overlap bitmap follows the streams.
const HAS_OVERLAP_BITMAP: u16 = 1 << 0;

// Flags of simple glyph points.
const ON_CURVE_POINT: u8 = 1 << 0;
const X_SHORT_VECTOR: u8 = 1 << 1;
const Y_SHORT_VECTOR: u8 = 1 << 2;
const REPEAT_FLAG: u8 = 1 << 3;
const X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR: u8 = 1 << 4;
const Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR: u8 = 1 << 5;
const OVERLAP_SIMPLE: u8 = 1 << 6;

/// Contour count that marks a composite glyph.
const COMPOSITE: u16 = 0xFFFF;

/// The rebuilt `glyf` and `loca` tables.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GlyfReconstruction {
    /// The standard `glyf` table.
    pub glyf: Vec<u8>,
    /// The standard `loca` table.
    pub loca: Vec<u8>,
    /// The number of glyphs.
    pub num_glyphs: u16,
    /// The `loca` format: 0 for short offsets, 1 for long ones.
    pub index_format: u16,
    /// The `xMin` of each glyph, 0 for empty glyphs. Needed to rebuild
    /// left side bearings in `hmtx`.
    pub x_mins: Vec<i16>,
}

/// A glyph bounding box.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
struct BBox {
    x_min: i16,
    y_min: i16,
    x_max: i16,
    y_max: i16,
}

impl BBox {
    /// The smallest box containing all points.
    fn of(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };

        let mut bbox = BBox { x_min: first.x, y_min: first.y, x_max: first.x, y_max: first.y };
        for point in &points[1..] {
            bbox.x_min = bbox.x_min.min(point.x);
            bbox.y_min = bbox.y_min.min(point.y);
            bbox.x_max = bbox.x_max.max(point.x);
            bbox.y_max = bbox.y_max.max(point.y);
        }
        bbox
    }
}

impl Readable<'_> for BBox {
    fn read(r: &mut Reader) -> Result<Self> {
        Ok(BBox {
            x_min: r.read::<i16>()?,
            y_min: r.read::<i16>()?,
            x_max: r.read::<i16>()?,
            y_max: r.read::<i16>()?,
        })
    }
}

impl Writeable for BBox {
    fn write(&self, w: &mut Writer) {
        w.write::<i16>(self.x_min);
        w.write::<i16>(self.y_min);
        w.write::<i16>(self.x_max);
        w.write::<i16>(self.y_max);
    }
}

/// An absolute point of a simple glyph.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Point {
    x: i16,
    y: i16,
    on_curve: bool,
}

/// The substreams of the transformed table.
struct Streams<'a> {
    n_contour: Reader<'a>,
    n_points: Reader<'a>,
    flags: Reader<'a>,
    glyphs: Reader<'a>,
    composites: Reader<'a>,
    bboxes: Reader<'a>,
    instructions: Reader<'a>,
    bbox_bitmap: &'a [u8],
    overlap_bitmap: Option<&'a [u8]>,
}

/// Rebuild `glyf` and `loca` from the transformed `glyf` data.
///
/// The `loca_length` is the original length the table directory declares
/// for `loca`, which has to agree with the glyph count and index format.
pub fn reconstruct(data: &[u8], loca_length: u32) -> Result<GlyfReconstruction> {
    let mut r = Reader::named(data, "transformed glyf table");
    r.skip(2)?; // version
    let option_flags = r.read::<u16>()?;
    let num_glyphs = r.read::<u16>()?;
    let index_format = r.read::<u16>()?;

    if index_format > 1 {
        return Err(r.invalid("unknown index format"));
    }

    let offset_size = if index_format == 0 { 2 } else { 4 };
    if u64::from(loca_length) != (u64::from(num_glyphs) + 1) * offset_size {
        return Err(Error::invalid("loca table", "length doesn't match the glyph count"));
    }

    let mut sizes = [0u32; 7];
    for size in &mut sizes {
        *size = r.read::<u32>()?;
    }

    let [n_contour, n_points, flags, glyphs, composites, bboxes, instructions] = sizes;
    let n_contour = substream(&mut r, n_contour, "nContour stream")?;
    let n_points = substream(&mut r, n_points, "nPoints stream")?;
    let flags = substream(&mut r, flags, "flag stream")?;
    let glyphs = substream(&mut r, glyphs, "glyph stream")?;
    let composites = substream(&mut r, composites, "composite stream")?;
    let mut bboxes = substream(&mut r, bboxes, "bbox stream")?;
    let instructions = substream(&mut r, instructions, "instruction stream")?;

    let bitmap_len = ((usize::from(num_glyphs) + 31) >> 5) << 2;
    let bbox_bitmap = bboxes.read_bytes(bitmap_len)?;

    let overlap_bitmap = if option_flags & HAS_OVERLAP_BITMAP != 0 {
        Some(r.read_bytes((usize::from(num_glyphs) + 7) >> 3)?)
    } else {
        None
    };

    let mut s = Streams {
        n_contour,
        n_points,
        flags,
        glyphs,
        composites,
        bboxes,
        instructions,
        bbox_bitmap,
        overlap_bitmap,
    };

    let mut glyf = Writer::with_capacity(data.len() * 2);
    let mut offsets = Vec::with_capacity(usize::from(num_glyphs) + 1);
    let mut x_mins = vec![0; usize::from(num_glyphs)];

    for i in 0..usize::from(num_glyphs) {
        offsets.push(glyf.len());

        let has_bbox = bit_set(s.bbox_bitmap, i);
        let x_min = match s.n_contour.read::<u16>()? {
            COMPOSITE => Some(reconstruct_composite(&mut s, has_bbox, &mut glyf)?),
            0 if has_bbox => {
                return Err(Error::invalid("transformed glyf table", "empty glyph has a bbox"));
            }
            0 => None,
            n if n > i16::MAX as u16 => {
                return Err(Error::invalid("transformed glyf table", "negative contour count"));
            }
            n => {
                let overlap = s.overlap_bitmap.is_some_and(|bitmap| bit_set(bitmap, i));
                Some(reconstruct_simple(&mut s, n, has_bbox, overlap, &mut glyf)?)
            }
        };

        if let Some(x_min) = x_min {
            x_mins[i] = x_min;
        }

        glyf.align(4);
    }

    offsets.push(glyf.len());

    let loca = write_loca(&offsets, index_format)?;
    log::trace!(
        "reconstructed {} glyphs into {} bytes of glyf data",
        num_glyphs,
        glyf.len()
    );

    Ok(GlyfReconstruction { glyf: glyf.finish(), loca, num_glyphs, index_format, x_mins })
}

/// Split off a substream of the given size.
fn substream<'a>(r: &mut Reader<'a>, size: u32, context: &'static str) -> Result<Reader<'a>> {
    let data = r.read_bytes(size as usize)?;
    Ok(Reader::named(data, context))
}

/// Whether bit `i` is set in a most-significant-bit-first bitmap.
fn bit_set(bitmap: &[u8], i: usize) -> bool {
    bitmap.get(i >> 3).is_some_and(|byte| byte & (0x80 >> (i & 7)) != 0)
}

/// Rebuild a composite glyph. Returns its `xMin`.
fn reconstruct_composite(s: &mut Streams, has_bbox: bool, w: &mut Writer) -> Result<i16> {
    if !has_bbox {
        return Err(Error::invalid("transformed glyf table", "composite glyph without bbox"));
    }

    let bbox = s.bboxes.read::<BBox>()?;
    w.write::<i16>(-1);
    w.write(bbox);

    let mut have_instructions = false;
    loop {
        let component = s.composites.read::<Component>()?;
        have_instructions |= component.flags & WE_HAVE_INSTRUCTIONS != 0;
        w.write(&component);
        if !component.has_more() {
            break;
        }
    }

    if have_instructions {
        let U16Packed(len) = s.glyphs.read()?;
        w.write::<u16>(len);
        w.extend(s.instructions.read_bytes(usize::from(len))?);
    }

    Ok(bbox.x_min)
}

/// Rebuild a simple glyph with `n_contours` contours. Returns its `xMin`.
fn reconstruct_simple(
    s: &mut Streams,
    n_contours: u16,
    has_bbox: bool,
    overlap: bool,
    w: &mut Writer,
) -> Result<i16> {
    let mut end_points = Vec::with_capacity(usize::from(n_contours));
    let mut end_point = -1i32;
    for _ in 0..n_contours {
        let U16Packed(n_points) = s.n_points.read()?;
        end_point += i32::from(n_points);
        if end_point > i32::from(u16::MAX) {
            return Err(Error::invalid("transformed glyf table", "too many points"));
        }
        // A leading contour without points wraps around, as it did in the
        // original font.
        end_points.push(end_point as u16);
    }

    let num_points = usize::try_from(end_point + 1).unwrap_or(0);
    let flags = s.flags.read_bytes(num_points)?;
    let points = decode_triplets(flags, &mut s.glyphs)?;
    let U16Packed(instruction_len) = s.glyphs.read()?;

    let bbox = if has_bbox { s.bboxes.read::<BBox>()? } else { BBox::of(&points) };

    w.write::<u16>(n_contours);
    w.write(bbox);
    w.write_vector(&end_points);
    w.write::<u16>(instruction_len);
    w.extend(s.instructions.read_bytes(usize::from(instruction_len))?);
    encode_points(&points, overlap, w);

    Ok(bbox.x_min)
}

/// Decode the coordinate triplets of all points, one flag byte each.
fn decode_triplets(flags: &[u8], glyphs: &mut Reader) -> Result<Vec<Point>> {
    fn with_sign(flag: u8, base: i32) -> i32 {
        // Bit 0 set means positive.
        if flag & 1 != 0 {
            base
        } else {
            -base
        }
    }

    let mut points = Vec::with_capacity(flags.len());
    let (mut x, mut y) = (0i32, 0i32);

    for &flag in flags {
        let on_curve = flag & 0x80 == 0;
        let flag = flag & 0x7F;
        let code = i32::from(flag);

        let (dx, dy) = match flag {
            0..=9 => {
                let b0 = i32::from(glyphs.read::<u8>()?);
                (0, with_sign(flag, ((code & 14) << 7) + b0))
            }
            10..=19 => {
                let b0 = i32::from(glyphs.read::<u8>()?);
                (with_sign(flag, (((code - 10) & 14) << 7) + b0), 0)
            }
            20..=83 => {
                let b0 = code - 20;
                let b1 = i32::from(glyphs.read::<u8>()?);
                (
                    with_sign(flag, 1 + (b0 & 0x30) + (b1 >> 4)),
                    with_sign(flag >> 1, 1 + ((b0 & 0x0C) << 2) + (b1 & 0x0F)),
                )
            }
            84..=119 => {
                let b0 = code - 84;
                let [b1, b2] = glyphs.read::<[u8; 2]>()?.map(i32::from);
                (
                    with_sign(flag, 1 + ((b0 / 12) << 8) + b1),
                    with_sign(flag >> 1, 1 + (((b0 % 12) >> 2) << 8) + b2),
                )
            }
            120..=123 => {
                let [b1, b2, b3] = glyphs.read::<[u8; 3]>()?.map(i32::from);
                (
                    with_sign(flag, (b1 << 4) + (b2 >> 4)),
                    with_sign(flag >> 1, ((b2 & 0x0F) << 8) + b3),
                )
            }
            _ => {
                let [b1, b2, b3, b4] = glyphs.read::<[u8; 4]>()?.map(i32::from);
                (with_sign(flag, (b1 << 8) + b2), with_sign(flag >> 1, (b3 << 8) + b4))
            }
        };

        x += dx;
        y += dy;

        let (Ok(px), Ok(py)) = (i16::try_from(x), i16::try_from(y)) else {
            return Err(Error::invalid("transformed glyf table", "coordinate out of range"));
        };

        points.push(Point { x: px, y: py, on_curve });
    }

    Ok(points)
}

/// Write the flags and coordinates of a simple glyph in the standard
/// TrueType encoding.
///
/// The flags are run-length compressed and coordinates use the short forms
/// wherever possible.
fn encode_points(points: &[Point], overlap: bool, w: &mut Writer) {
    let mut flags = Vec::with_capacity(points.len());
    let mut xs = Writer::with_capacity(points.len() * 2);
    let mut ys = Writer::with_capacity(points.len() * 2);

    let mut last_flag = None;
    let mut repeat = 0u8;
    let (mut last_x, mut last_y) = (0i32, 0i32);

    for (i, point) in points.iter().enumerate() {
        let mut flag = if point.on_curve { ON_CURVE_POINT } else { 0 };
        if overlap && i == 0 {
            flag |= OVERLAP_SIMPLE;
        }

        let dx = i32::from(point.x) - last_x;
        let dy = i32::from(point.y) - last_y;
        flag |= encode_delta(dx, X_SHORT_VECTOR, X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR, &mut xs);
        flag |= encode_delta(dy, Y_SHORT_VECTOR, Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR, &mut ys);

        if last_flag == Some(flag) && repeat != u8::MAX {
            // The run's flag byte is still the last one written, the count
            // follows once the run ends.
            if let Some(prev) = flags.last_mut() {
                *prev |= REPEAT_FLAG;
            }
            repeat += 1;
        } else {
            if repeat != 0 {
                flags.push(repeat);
                repeat = 0;
            }
            flags.push(flag);
        }

        last_flag = Some(flag);
        last_x = i32::from(point.x);
        last_y = i32::from(point.y);
    }

    if repeat != 0 {
        flags.push(repeat);
    }

    w.extend(&flags);
    w.extend(&xs.finish());
    w.extend(&ys.finish());
}

/// Write one coordinate delta and return the flag bits describing it.
fn encode_delta(delta: i32, short: u8, same_or_positive: u8, w: &mut Writer) -> u8 {
    if delta == 0 {
        same_or_positive
    } else if (-255..=255).contains(&delta) {
        w.write::<u8>(delta.unsigned_abs() as u8);
        short | if delta > 0 { same_or_positive } else { 0 }
    } else {
        // Deltas between i16 coordinates wrap like they do in the format.
        w.write::<i16>(delta as i16);
        0
    }
}

/// Write the `loca` table for the glyph offsets.
fn write_loca(offsets: &[usize], index_format: u16) -> Result<Vec<u8>> {
    let mut w = Writer::with_capacity(offsets.len() * 4);
    for &offset in offsets {
        if index_format == 0 {
            let half = u16::try_from(offset / 2)
                .map_err(|_| Error::invalid("loca table", "offset too large for short format"))?;
            w.write::<u16>(half);
        } else {
            let offset = u32::try_from(offset)
                .map_err(|_| Error::invalid("loca table", "offset too large"))?;
            w.write::<u32>(offset);
        }
    }
    Ok(w.finish())
}
