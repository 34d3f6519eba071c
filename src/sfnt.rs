//! Reading and writing the SFNT container: the offset table, table records
//! and the checksums that tie them together.

use crate::error::{Error, FormatError, Unsupported};
use crate::stream::{Readable, Reader, Writeable, Writer};
use crate::{Result, Tag};

/// Magic number of the `head` table checksum adjustment.
const CHECKSUM_MAGIC: u32 = 0xB1B0AFBA;

/// Offset of `checksumAdjustment` in the `head` table.
pub(crate) const CHECKSUM_ADJUSTMENT_OFFSET: usize = 8;

/// A font face with OpenType tables.
#[derive(Debug, Clone)]
pub struct Face<'a> {
    data: &'a [u8],
    kind: FontKind,
    records: Vec<TableRecord>,
}

impl<'a> Face<'a> {
    /// Parse a font face from OpenType data.
    ///
    /// The `index` is only relevant if the data contains a font collection
    /// (`.ttc` file). Otherwise, it should be 0.
    pub fn parse(data: &'a [u8], index: u32) -> Result<Self> {
        let mut r = Reader::named(data, "table directory");
        let mut kind = r.read::<FontKind>()?;

        // Parse font collection header if necessary.
        if kind == FontKind::Collection {
            let num_fonts = u32::read_at(data, 8)?;
            if index >= num_fonts {
                return Err(Error::invalid("font collection", "face index out of range"));
            }

            let offset = u32::read_at(data, 12 + 4 * (index as usize))?;
            r = Reader::new_at(data, offset as usize, "table directory");
            kind = r.read::<FontKind>()?;
            if kind == FontKind::Collection {
                return Err(Error::invalid("font collection", "nested collection"));
            }
        }

        // Read number of table records.
        let count = r.read::<u16>()?;
        r.skip(6)?; // search range + entry selector + range shift

        let records = r.read_vector::<TableRecord>(count as usize)?;
        if records.windows(2).any(|w| w[0].tag >= w[1].tag) {
            log::warn!("table directory is not sorted by tag");
        }

        Ok(Face { data, kind, records })
    }

    /// The outline flavor of the face.
    pub fn kind(&self) -> FontKind {
        self.kind
    }

    /// Look up a table's data.
    pub fn table(&self, tag: Tag) -> Option<&'a [u8]> {
        let record = self.records.iter().find(|record| record.tag == tag)?;
        let start = record.offset as usize;
        let end = start.checked_add(record.length as usize)?;
        self.data.get(start..end)
    }

    /// Look up a table that must be present.
    pub fn expect_table(&self, tag: Tag) -> Result<&'a [u8]> {
        self.table(tag).ok_or(Error::missing(tag))
    }

    /// The tags of all tables in the face, in directory order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.records.iter().map(|record| record.tag)
    }

    /// Whether the face has CFF or CFF2 outlines.
    pub fn has_cff(&self) -> bool {
        self.kind == FontKind::Cff
            || self.table(Tag::CFF).is_some()
            || self.table(Tag::CFF2).is_some()
    }

    /// Fail with an unsupported-feature error if the face has CFF outlines.
    pub(crate) fn expect_truetype(&self) -> Result<()> {
        if self.has_cff() {
            return Err(Unsupported::CffOutlines.into());
        }
        Ok(())
    }
}

/// What kind of contents the font has.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FontKind {
    /// TrueType outlines.
    TrueType,
    /// CFF outlines
    Cff,
    /// A font collection.
    Collection,
}

impl FontKind {
    /// Classify an SFNT version tag, e.g. a WOFF2 flavor.
    pub fn from_flavor(flavor: u32) -> Option<Self> {
        match flavor {
            0x00010000 | 0x74727565 => Some(FontKind::TrueType),
            0x4F54544F => Some(FontKind::Cff),
            0x74746366 => Some(FontKind::Collection),
            _ => None,
        }
    }
}

impl Readable<'_> for FontKind {
    fn read(r: &mut Reader) -> Result<Self> {
        let flavor = r.read::<u32>()?;
        Self::from_flavor(flavor).ok_or(FormatError::BadSignature(flavor).into())
    }
}

/// Locates a table in the font file.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TableRecord {
    /// The table's tag.
    pub tag: Tag,
    /// The checksum of the table data.
    pub checksum: u32,
    /// Offset of the table from the start of the file.
    pub offset: u32,
    /// Length of the table without padding.
    pub length: u32,
}

impl Readable<'_> for TableRecord {
    fn read(r: &mut Reader) -> Result<Self> {
        Ok(TableRecord {
            tag: r.read::<Tag>()?,
            checksum: r.read::<u32>()?,
            offset: r.read::<u32>()?,
            length: r.read::<u32>()?,
        })
    }
}

impl Writeable for TableRecord {
    fn write(&self, w: &mut Writer) {
        w.write::<Tag>(self.tag);
        w.write::<u32>(self.checksum);
        w.write::<u32>(self.offset);
        w.write::<u32>(self.length);
    }
}

/// A finalized table, placed in the font file.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SfntTable {
    /// Where the table is placed.
    pub record: TableRecord,
    /// The unpadded table data.
    pub data: Vec<u8>,
}

/// Compute the binary search header for a directory with `count` entries of
/// `size` bytes: `(searchRange, entrySelector, rangeShift)`.
pub(crate) fn search_params(count: u16, size: u16) -> (u16, u16, u16) {
    if count == 0 {
        return (0, 0, 0);
    }

    let entry_selector = (u16::BITS - 1 - count.leading_zeros()) as u16;
    let search_range = (1u16 << entry_selector).wrapping_mul(size);
    let range_shift = count.wrapping_mul(size).wrapping_sub(search_range);
    (search_range, entry_selector, range_shift)
}

/// Lay out tables into a brand new font.
///
/// The tables are sorted by tag, each one is checksummed and 4-byte aligned,
/// and the `head` table's checksum adjustment is computed over the whole
/// file.
pub fn assemble(flavor: u32, mut tables: Vec<(Tag, Vec<u8>)>) -> Result<Vec<u8>> {
    // Tables shall be sorted by tag.
    tables.sort_by_key(|&(tag, _)| tag);
    if tables.windows(2).any(|w| w[0].0 == w[1].0) {
        return Err(Error::invalid("table directory", "duplicate table"));
    }

    let count = u16::try_from(tables.len())
        .map_err(|_| Error::invalid("table directory", "too many tables"))?;

    // This variable will hold the offset to the checksum adjustment field
    // in the head table, which we'll have to write in the end (after
    // checksumming the whole font).
    let mut checksum_adjustment_offset = None;

    let mut placed = Vec::with_capacity(tables.len());
    let mut offset = 12 + tables.len() * 16;
    for (tag, mut data) in tables {
        if tag == Tag::HEAD {
            let field = data
                .get_mut(CHECKSUM_ADJUSTMENT_OFFSET..CHECKSUM_ADJUSTMENT_OFFSET + 4)
                .ok_or(FormatError::Truncated("head table"))?;
            field.fill(0);
            checksum_adjustment_offset = Some(offset + CHECKSUM_ADJUSTMENT_OFFSET);
        }

        let length = u32::try_from(data.len())
            .map_err(|_| Error::invalid("table directory", "table too large"))?;
        let record = TableRecord {
            tag,
            checksum: checksum(&data),
            offset: u32::try_from(offset)
                .map_err(|_| Error::invalid("table directory", "font too large"))?,
            length,
        };

        log::trace!("placing {} table at {} ({} bytes)", tag, offset, data.len());

        // Increase offset, plus padding zeros to align to 4 bytes.
        offset += data.len();
        offset = offset.next_multiple_of(4);
        placed.push(SfntTable { record, data });
    }

    let mut w = Writer::with_capacity(offset);
    w.write::<u32>(flavor);

    // Write table directory.
    let (search_range, entry_selector, range_shift) = search_params(count, 16);
    w.write(count);
    w.write(search_range);
    w.write(entry_selector);
    w.write(range_shift);

    for table in &placed {
        w.write(table.record);
    }

    // Write tables.
    for table in &placed {
        // Write data plus padding zeros to align to 4 bytes.
        w.extend(&table.data);
        w.align(4);
    }

    // Write checksum adjustment field in head table.
    let mut data = w.finish();
    if let Some(i) = checksum_adjustment_offset {
        let sum = checksum(&data);
        let val = CHECKSUM_MAGIC.wrapping_sub(sum);
        data[i..i + 4].copy_from_slice(&val.to_be_bytes());
    }

    Ok(data)
}

/// Calculate a checksum over the sliced data as a sum of u32s. If the data
/// length is not a multiple of four, it is treated as if padded with zero to a
/// length that is a multiple of four.
pub fn checksum(data: &[u8]) -> u32 {
    let mut sum = 0u32;
    for chunk in data.chunks(4) {
        let mut bytes = [0; 4];
        bytes[..chunk.len()].copy_from_slice(chunk);
        sum = sum.wrapping_add(u32::from_be_bytes(bytes));
    }
    sum
}
