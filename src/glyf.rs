//! The `glyf` table contains the main description of the glyphs. In order to
//! subset it, there are 4 things we need to do:
//! 1. We need to form the glyph closure. Glyphs can reference other glyphs, meaning that
//!    if a user for example requests the glyph 1, and this glyph references the glyph 2, then
//!    we need to include both of them in our subset.
//! 2. We need to remove glyph descriptions that are not needed for the subset, and reorder
//!    the existing glyph descriptions to match the order defined by the remapper.
//! 3. For component glyphs, we need to rewrite their description so that they reference
//!    the new glyph ID of the glyphs they reference.
//! 4. We need to write the `loca` table with the new offsets. The subsetted font
//!    always uses the long format.

use super::*;
use crate::error::{ClosureError, FormatError};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

// Flags of composite glyph components.
pub(crate) const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
pub(crate) const WE_HAVE_A_SCALE: u16 = 0x0008;
pub(crate) const MORE_COMPONENTS: u16 = 0x0020;
pub(crate) const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
pub(crate) const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
pub(crate) const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;

/// Size of the glyph header: contour count and bounding box.
const GLYPH_HEADER_SIZE: usize = 10;

pub(crate) fn subset(ctx: &mut Context) -> Result<()> {
    let table = Table::new(&ctx.face, ctx.num_glyphs)?;

    let mut sub_glyf = Writer::new();
    let mut sub_loca = Writer::new();

    for old_gid in ctx.mapper.remapped_gids() {
        sub_loca.write::<u32>(loca_offset(sub_glyf.len())?);

        // Glyphs that are only there to keep glyph IDs stable stay empty.
        let Some(old_gid) = old_gid else { continue };

        let data = table.glyph_data(old_gid)?;
        if is_composite(data)? {
            sub_glyf.extend(&remap_components(data, &ctx.mapper)?);
        } else {
            sub_glyf.extend(data);
        }

        sub_glyf.align(4);
    }

    // Write the final offset.
    sub_loca.write::<u32>(loca_offset(sub_glyf.len())?);

    ctx.push(Tag::LOCA, sub_loca.finish());
    ctx.push(Tag::GLYF, sub_glyf.finish());

    Ok(())
}

fn loca_offset(offset: usize) -> Result<u32> {
    u32::try_from(offset).map_err(|_| Error::invalid("glyf table", "subset is too large"))
}

/// A glyf + loca table.
pub(crate) struct Table<'a> {
    loca: &'a [u8],
    glyf: &'a [u8],
    long: bool,
    num_glyphs: u16,
}

impl<'a> Table<'a> {
    /// Look up `glyf` and `loca` with the `loca` format from `head`.
    pub(crate) fn new(face: &Face<'a>, num_glyphs: u16) -> Result<Self> {
        let head = face.expect_table(Tag::HEAD)?;
        let format = i16::read_at(head, head::INDEX_TO_LOC_FORMAT_OFFSET)
            .map_err(|_| FormatError::Truncated("head table"))?;

        let long = match format {
            0 => false,
            1 => true,
            _ => return Err(Error::invalid("head table", "unknown indexToLocFormat")),
        };

        let loca = face.expect_table(Tag::LOCA)?;
        let glyf = face.expect_table(Tag::GLYF)?;

        let offset_size = if long { 4 } else { 2 };
        if loca.len() < (usize::from(num_glyphs) + 1) * offset_size {
            return Err(FormatError::Truncated("loca table").into());
        }

        Ok(Table { loca, glyf, long, num_glyphs })
    }

    /// The number of glyphs in the font.
    pub(crate) fn num_glyphs(&self) -> u16 {
        self.num_glyphs
    }

    /// The description of a glyph, empty for glyphs without outlines.
    pub(crate) fn glyph_data(&self, id: u16) -> Result<&'a [u8]> {
        let read_offset = |n| -> Result<usize> {
            Ok(if self.long {
                u32::read_at(self.loca, n * 4)? as usize
            } else {
                2 * u16::read_at(self.loca, n * 2)? as usize
            })
        };

        let from = read_offset(usize::from(id))?;
        let to = read_offset(usize::from(id) + 1)?;
        if to < from {
            return Err(Error::invalid("loca table", "offsets are not monotonic"));
        }

        self.glyf.get(from..to).ok_or(FormatError::Truncated("glyf table").into())
    }

    /// The glyphs a glyph is composed of.
    fn components(&self, id: u16) -> Result<Vec<u16>> {
        let data = self.glyph_data(id)?;
        if !is_composite(data)? {
            return Ok(vec![]);
        }

        let mut components = vec![];
        for_each_component(data, |component| {
            components.push(component.glyph_id);
            Ok(())
        })?;
        Ok(components)
    }
}

/// Whether a glyph description is a composite glyph.
fn is_composite(data: &[u8]) -> Result<bool> {
    if data.is_empty() {
        return Ok(false);
    }

    let num_contours =
        i16::read_at(data, 0).map_err(|_| FormatError::Truncated("glyph description"))?;
    Ok(num_contours < 0)
}

/// Call `f` for each component of a composite glyph.
fn for_each_component<'a>(
    data: &'a [u8],
    mut f: impl FnMut(&Component<'a>) -> Result<()>,
) -> Result<Reader<'a>> {
    let mut r = Reader::new_at(data, GLYPH_HEADER_SIZE, "composite glyph");
    loop {
        let component = r.read::<Component>()?;
        f(&component)?;
        if !component.has_more() {
            return Ok(r);
        }
    }
}

/// Rewrite a composite glyph so that its components point to the new glyph
/// IDs.
fn remap_components(data: &[u8], mapper: &GlyphRemapper) -> Result<Vec<u8>> {
    let mut w = Writer::with_capacity(data.len());
    w.extend(data.get(..GLYPH_HEADER_SIZE).ok_or(FormatError::Truncated("composite glyph"))?);

    let r = for_each_component(data, |component| {
        let glyph_id = mapper
            .get(component.glyph_id)
            .ok_or(Error::invalid("composite glyph", "component is not in the subset"))?;
        w.write(Component { glyph_id, ..*component });
        Ok(())
    })?;

    // Instructions, if any.
    w.extend(r.tail());

    Ok(w.finish())
}

/// A component of a composite glyph.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct Component<'a> {
    /// The component flags.
    pub flags: u16,
    /// The referenced glyph.
    pub glyph_id: u16,
    /// The offset arguments and the transform, as stored.
    pub args: &'a [u8],
}

impl Component<'_> {
    /// Whether another component follows this one.
    pub(crate) fn has_more(&self) -> bool {
        self.flags & MORE_COMPONENTS != 0
    }
}

impl<'a> Readable<'a> for Component<'a> {
    fn read(r: &mut Reader<'a>) -> Result<Self> {
        let flags = r.read::<u16>()?;
        let glyph_id = r.read::<u16>()?;

        let mut len = if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
        if flags & WE_HAVE_A_SCALE != 0 {
            len += 2;
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            len += 4;
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            len += 8;
        }

        let args = r.read_bytes(len)?;
        Ok(Component { flags, glyph_id, args })
    }
}

impl Writeable for Component<'_> {
    fn write(&self, w: &mut Writer) {
        w.write::<u16>(self.flags);
        w.write::<u16>(self.glyph_id);
        w.extend(self.args);
    }
}

/// The state of a glyph during the closure walk.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Visit {
    /// The glyph is on the current path of the walk.
    InProgress,
    /// The glyph and everything it references have been visited.
    Done,
}

/// Compute the set of glyphs needed to render the requested ones: the
/// requested glyphs, `.notdef` and everything they reference through
/// composite components, transitively.
pub(crate) fn closure(table: &Table, requested: &[u16]) -> Result<BTreeSet<u16>> {
    let num_glyphs = table.num_glyphs();
    let mut state = FxHashMap::default();

    // We always include the .notdef glyph.
    for &root in std::iter::once(&0).chain(requested) {
        if root >= num_glyphs {
            return Err(ClosureError::GlyphOutOfRange { glyph: root, num_glyphs }.into());
        }

        if state.contains_key(&root) {
            continue;
        }

        state.insert(root, Visit::InProgress);
        let mut stack = vec![(root, table.components(root)?, 0)];

        while let Some((gid, components, next)) = stack.last_mut() {
            let Some(&component) = components.get(*next) else {
                state.insert(*gid, Visit::Done);
                stack.pop();
                continue;
            };

            *next += 1;

            if component >= num_glyphs {
                return Err(ClosureError::ComponentOutOfRange { glyph: *gid, component }.into());
            }

            match state.get(&component) {
                Some(Visit::InProgress) => return Err(ClosureError::Cycle(component).into()),
                Some(Visit::Done) => {}
                None => {
                    state.insert(component, Visit::InProgress);
                    let components = table.components(component)?;
                    stack.push((component, components, 0));
                }
            }
        }
    }

    Ok(state.into_keys().collect())
}
