//! The WOFF2 header and table directory.

use super::KNOWN_TAGS;
use crate::decompress::Decompressor;
use crate::error::{Error, FormatError, Unsupported};
use crate::sfnt::FontKind;
use crate::stream::{Readable, Reader};
use crate::varint::UIntBase128;
use crate::{Result, Tag};

/// The WOFF2 signature, `wOF2`.
pub const MAGIC: u32 = 0x774F4632;

/// The largest accepted ratio of uncompressed table data to file size.
const MAX_COMPRESSION_RATIO: u64 = 100;

/// Transform version of `glyf` and `loca` that means "not transformed".
const NULL_TRANSFORM_GLYF: u8 = 3;

/// A parsed WOFF2 header with its table directory.
///
/// Everything here has been checked against the size of the file, so the
/// ranges can be sliced out of the data the header was parsed from.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Header {
    /// The SFNT version of the wrapped font.
    pub flavor: u32,
    /// The total size of the file.
    pub length: u32,
    /// The size the encoder claims the uncompressed font has. Advisory.
    pub total_sfnt_size: u32,
    /// Offset of the compressed table data.
    pub compressed_offset: usize,
    /// Length of the compressed table data.
    pub compressed_length: u32,
    /// The size of the decompressed table data: the sum of the transformed
    /// lengths of all tables.
    pub uncompressed_size: u32,
    /// Major and minor version of the font, not of the WOFF2 format.
    pub version: (u16, u16),
    /// The extended metadata block, if any.
    pub metadata: Option<MetadataBlock>,
    /// The private data block, if any.
    pub private_data: Option<Block>,
    /// The table directory, in file order.
    pub entries: Vec<TableDirectoryEntry>,
}

/// A range of the WOFF2 file.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Block {
    /// Offset from the start of the file.
    pub offset: u32,
    /// Length in bytes.
    pub length: u32,
}

/// The compressed extended metadata block.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MetadataBlock {
    /// Where the compressed metadata lives.
    pub block: Block,
    /// Its uncompressed length.
    pub orig_length: u32,
}

/// An entry in the WOFF2 table directory.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TableDirectoryEntry {
    /// The table's tag.
    pub tag: Tag,
    /// The transform version from the flag byte.
    pub transform_version: u8,
    /// Offset of the table in the decompressed data.
    pub src_offset: u32,
    /// Length of the table in the decompressed data.
    pub src_length: u32,
    /// Length of the table as it was in the original font.
    pub dst_length: u32,
}

impl TableDirectoryEntry {
    /// Whether the stored data is transformed and has to be reconstructed.
    ///
    /// For `glyf` and `loca`, version 0 is the transform and 3 is the null
    /// transform. For every other table it's the other way around.
    pub fn is_transformed(&self) -> bool {
        match self.tag {
            Tag::GLYF | Tag::LOCA => self.transform_version != NULL_TRANSFORM_GLYF,
            _ => self.transform_version != 0,
        }
    }
}

impl Readable<'_> for TableDirectoryEntry {
    fn read(r: &mut Reader) -> Result<Self> {
        let flags = r.read::<u8>()?;
        let tag = match flags & 0x3F {
            0x3F => r.read::<Tag>()?,
            index => KNOWN_TAGS[usize::from(index)],
        };

        let transform_version = flags >> 6;
        if matches!(tag, Tag::GLYF | Tag::LOCA)
            && !matches!(transform_version, 0 | NULL_TRANSFORM_GLYF)
        {
            return Err(Unsupported::TransformVersion { tag, version: transform_version }.into());
        }

        let UIntBase128(dst_length) = r.read()?;
        let mut entry = TableDirectoryEntry {
            tag,
            transform_version,
            src_offset: 0,
            src_length: dst_length,
            dst_length,
        };

        if entry.is_transformed() {
            let UIntBase128(transform_length) = r.read()?;
            if tag == Tag::LOCA && transform_length != 0 {
                return Err(r.invalid("transformed loca table must be empty"));
            }
            entry.src_length = transform_length;
        }

        Ok(entry)
    }
}

impl Header {
    /// Parse and validate the header and table directory of a WOFF2 file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = Reader::named(data, "WOFF2 header");

        let signature = r.read::<u32>()?;
        if signature != MAGIC {
            return Err(FormatError::BadSignature(signature).into());
        }

        let flavor = r.read::<u32>()?;
        if FontKind::from_flavor(flavor) == Some(FontKind::Collection) {
            return Err(Unsupported::Collection.into());
        }

        let length = r.read::<u32>()?;
        if length as usize != data.len() {
            return Err(r.invalid("length doesn't match the file size"));
        }

        let num_tables = r.read::<u16>()?;
        if num_tables == 0 {
            return Err(r.invalid("font has no tables"));
        }

        if r.read::<u16>()? != 0 {
            return Err(r.invalid("reserved field is not zero"));
        }

        let total_sfnt_size = r.read::<u32>()?;
        let compressed_length = r.read::<u32>()?;
        let version = (r.read::<u16>()?, r.read::<u16>()?);

        let meta_offset = r.read::<u32>()?;
        let meta_length = r.read::<u32>()?;
        let meta_orig_length = r.read::<u32>()?;
        let priv_offset = r.read::<u32>()?;
        let priv_length = r.read::<u32>()?;

        // Read the table directory, assigning each table its place in the
        // decompressed data.
        let mut r = Reader::new_at(data, r.offset(), "WOFF2 table directory");
        let mut entries = Vec::with_capacity(usize::from(num_tables));
        let mut src_offset = 0u32;
        for _ in 0..num_tables {
            let mut entry = r.read::<TableDirectoryEntry>()?;
            entry.src_offset = src_offset;
            src_offset = src_offset
                .checked_add(entry.src_length)
                .ok_or_else(|| r.invalid("table data is too large"))?;
            entries.push(entry);
        }

        let uncompressed_size = src_offset;
        if uncompressed_size == 0 {
            return Err(r.invalid("font has no table data"));
        }

        // Guard against decompression bombs.
        if u64::from(uncompressed_size) > MAX_COMPRESSION_RATIO * u64::from(length) {
            return Err(r.invalid("compression ratio is implausibly high"));
        }

        let compressed_offset = r.offset();
        let compressed_end = compressed_offset
            .checked_add(compressed_length as usize)
            .filter(|&end| end <= data.len())
            .ok_or(FormatError::Truncated("compressed table data"))?;

        let metadata = match meta_offset {
            0 => None,
            _ => {
                let block = check_block(data, meta_offset, meta_length, "metadata block")?;
                if meta_orig_length == 0 {
                    return Err(Error::invalid("metadata block", "original length is zero"));
                }
                Some(MetadataBlock { block, orig_length: meta_orig_length })
            }
        };

        let private_data = match priv_offset {
            0 => None,
            _ => {
                let block = check_block(data, priv_offset, priv_length, "private block")?;
                if priv_length == 0 {
                    return Err(Error::invalid("private block", "length is zero"));
                }
                Some(block)
            }
        };

        // The blocks follow each other in a fixed order, each 4-byte aligned.
        let mut end = compressed_end.next_multiple_of(4);
        for (block, context) in [
            (metadata.map(|meta| meta.block), "metadata block"),
            (private_data, "private block"),
        ] {
            if let Some(block) = block {
                if block.offset as usize != end {
                    return Err(Error::invalid(context, "block is not where expected"));
                }
                end = (block.offset as usize + block.length as usize).next_multiple_of(4);
            }
        }

        if end != data.len().next_multiple_of(4) {
            return Err(Error::invalid("WOFF2 header", "unexpected data after the last block"));
        }

        log::debug!(
            "WOFF2 header: {} tables, {} compressed bytes, {} uncompressed",
            num_tables,
            compressed_length,
            uncompressed_size,
        );

        Ok(Header {
            flavor,
            length,
            total_sfnt_size,
            compressed_offset,
            compressed_length,
            uncompressed_size,
            version,
            metadata,
            private_data,
            entries,
        })
    }

    /// The compressed table data.
    pub fn compressed_data<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        let end = self.compressed_offset + self.compressed_length as usize;
        data.get(self.compressed_offset..end)
            .ok_or(FormatError::Truncated("compressed table data").into())
    }

    /// Find the directory entry for a table.
    pub fn entry(&self, tag: Tag) -> Option<&TableDirectoryEntry> {
        self.entries.iter().find(|entry| entry.tag == tag)
    }

    /// Slice a table's stored data out of the decompressed block.
    pub fn table_data<'a>(
        &self,
        block: &'a [u8],
        entry: &TableDirectoryEntry,
    ) -> Result<&'a [u8]> {
        let start = entry.src_offset as usize;
        let end = start + entry.src_length as usize;
        block.get(start..end).ok_or(FormatError::Truncated("table data").into())
    }

    /// Decompress the extended metadata, an XML document.
    pub fn extended_metadata(
        &self,
        data: &[u8],
        decompressor: &(impl Decompressor + ?Sized),
    ) -> Result<Option<String>> {
        let Some(meta) = self.metadata else {
            return Ok(None);
        };

        let start = meta.block.offset as usize;
        let end = start + meta.block.length as usize;
        let compressed =
            data.get(start..end).ok_or(FormatError::Truncated("metadata block"))?;

        let expected = meta.orig_length as usize;
        let xml = decompressor.decompress(compressed, expected)?;
        if xml.len() != expected {
            return Err(FormatError::SizeMismatch { expected, actual: xml.len() }.into());
        }

        String::from_utf8(xml)
            .map(Some)
            .map_err(|_| Error::invalid("metadata block", "metadata is not UTF-8"))
    }
}

/// Check that a block lies within the file.
fn check_block(data: &[u8], offset: u32, length: u32, context: &'static str) -> Result<Block> {
    let offset_usize = offset as usize;
    if offset_usize >= data.len() || data.len() - offset_usize < length as usize {
        return Err(FormatError::Truncated(context).into());
    }
    Ok(Block { offset, length })
}
