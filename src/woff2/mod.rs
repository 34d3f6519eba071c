//! Decoding of WOFF2 files into standard SFNT fonts.
//!
//! Decoding happens in a single pass: the header and table directory are
//! parsed and validated, the table data is decompressed in one go, transformed
//! tables are rebuilt and the result is assembled into a new font with fresh
//! checksums.

mod glyf;
mod header;
mod hmtx;

pub use self::glyf::GlyfReconstruction;
pub use self::header::{Block, Header, MetadataBlock, TableDirectoryEntry, MAGIC};

use crate::decompress::Decompressor;
use crate::error::{Error, FormatError, Unsupported};
use crate::sfnt::{self, FontKind, CHECKSUM_ADJUSTMENT_OFFSET};
use crate::stream::Readable;
use crate::{Result, Tag};

/// The tags that can be encoded with a table directory flag byte, by index.
pub(crate) const KNOWN_TAGS: [Tag; 63] = [
    Tag::new(b"cmap"),
    Tag::new(b"head"),
    Tag::new(b"hhea"),
    Tag::new(b"hmtx"),
    Tag::new(b"maxp"),
    Tag::new(b"name"),
    Tag::new(b"OS/2"),
    Tag::new(b"post"),
    Tag::new(b"cvt "),
    Tag::new(b"fpgm"),
    Tag::new(b"glyf"),
    Tag::new(b"loca"),
    Tag::new(b"prep"),
    Tag::new(b"CFF "),
    Tag::new(b"VORG"),
    Tag::new(b"EBDT"),
    Tag::new(b"EBLC"),
    Tag::new(b"gasp"),
    Tag::new(b"hdmx"),
    Tag::new(b"kern"),
    Tag::new(b"LTSH"),
    Tag::new(b"PCLT"),
    Tag::new(b"VDMX"),
    Tag::new(b"vhea"),
    Tag::new(b"vmtx"),
    Tag::new(b"BASE"),
    Tag::new(b"GDEF"),
    Tag::new(b"GPOS"),
    Tag::new(b"GSUB"),
    Tag::new(b"EBSC"),
    Tag::new(b"JSTF"),
    Tag::new(b"MATH"),
    Tag::new(b"CBDT"),
    Tag::new(b"CBLC"),
    Tag::new(b"COLR"),
    Tag::new(b"CPAL"),
    Tag::new(b"SVG "),
    Tag::new(b"sbix"),
    Tag::new(b"acnt"),
    Tag::new(b"avar"),
    Tag::new(b"bdat"),
    Tag::new(b"bloc"),
    Tag::new(b"bsln"),
    Tag::new(b"cvar"),
    Tag::new(b"fdsc"),
    Tag::new(b"feat"),
    Tag::new(b"fmtx"),
    Tag::new(b"fvar"),
    Tag::new(b"gvar"),
    Tag::new(b"hsty"),
    Tag::new(b"just"),
    Tag::new(b"lcar"),
    Tag::new(b"mort"),
    Tag::new(b"morx"),
    Tag::new(b"opbd"),
    Tag::new(b"prop"),
    Tag::new(b"trak"),
    Tag::new(b"Zapf"),
    Tag::new(b"Silf"),
    Tag::new(b"Glat"),
    Tag::new(b"Gloc"),
    Tag::new(b"Feat"),
    Tag::new(b"Sill"),
];

/// Offset of `numberOfHMetrics` in the `hhea` table.
const NUM_H_METRICS_OFFSET: usize = 34;

/// Decode a WOFF2 file into an SFNT font, decompressing with brotli.
#[cfg(feature = "brotli")]
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    decode_with(data, &crate::decompress::Brotli)
}

/// Decode a WOFF2 file into an SFNT font with a custom decompressor.
pub fn decode_with(data: &[u8], decompressor: &(impl Decompressor + ?Sized)) -> Result<Vec<u8>> {
    let header = Header::parse(data)?;

    match FontKind::from_flavor(header.flavor) {
        Some(FontKind::TrueType) => {}
        Some(FontKind::Cff) => return Err(Unsupported::CffOutlines.into()),
        Some(FontKind::Collection) => return Err(Unsupported::Collection.into()),
        None => return Err(FormatError::BadSignature(header.flavor).into()),
    }

    let expected = header.uncompressed_size as usize;
    let block = decompressor.decompress(header.compressed_data(data)?, expected)?;
    if block.len() != expected {
        return Err(FormatError::SizeMismatch { expected, actual: block.len() }.into());
    }

    let tables = reconstruct_tables(&header, &block)?;
    log::debug!("decoded {} tables from WOFF2", tables.len());

    sfnt::assemble(header.flavor, tables)
}

/// Turn the decompressed table data into standard tables.
fn reconstruct_tables(header: &Header, block: &[u8]) -> Result<Vec<(Tag, Vec<u8>)>> {
    let glyf = header.entry(Tag::GLYF);
    let loca = header.entry(Tag::LOCA);
    let loca = match (glyf, loca) {
        (None, None) => None,
        (Some(glyf), Some(loca)) if glyf.is_transformed() == loca.is_transformed() => Some(loca),
        (Some(_), Some(_)) => {
            return Err(Error::invalid(
                "WOFF2 table directory",
                "glyf and loca must be transformed together",
            ));
        }
        _ => {
            return Err(Error::invalid("WOFF2 table directory", "glyf and loca must come together"));
        }
    };

    let mut tables = Vec::with_capacity(header.entries.len());
    let mut x_mins = None;
    let mut transformed_hmtx = None;

    for entry in &header.entries {
        let data = header.table_data(block, entry)?;
        log::trace!(
            "{} table: {} stored bytes, transform version {}",
            entry.tag,
            data.len(),
            entry.transform_version,
        );

        if !entry.is_transformed() {
            let mut table = data.to_vec();
            if entry.tag == Tag::HEAD {
                // The adjustment is recomputed for the assembled font.
                table
                    .get_mut(CHECKSUM_ADJUSTMENT_OFFSET..CHECKSUM_ADJUSTMENT_OFFSET + 4)
                    .ok_or(FormatError::Truncated("head table"))?
                    .fill(0);
            }
            tables.push((entry.tag, table));
            continue;
        }

        match entry.tag {
            Tag::GLYF => {
                let loca_length = loca.map_or(0, |loca| loca.dst_length);
                let rec = glyf::reconstruct(data, loca_length)?;
                tables.push((Tag::GLYF, rec.glyf));
                tables.push((Tag::LOCA, rec.loca));
                x_mins = Some(rec.x_mins);
            }
            // Rebuilt together with glyf.
            Tag::LOCA => {}
            // Needs the glyph bounding boxes, which might come later.
            Tag::HMTX if entry.transform_version == 1 => transformed_hmtx = Some((entry, data)),
            tag => {
                return Err(Unsupported::TransformVersion {
                    tag,
                    version: entry.transform_version,
                }
                .into());
            }
        }
    }

    if let Some((entry, data)) = transformed_hmtx {
        let x_mins = x_mins.ok_or(Error::invalid(
            "transformed hmtx table",
            "glyf table is not transformed",
        ))?;

        let hhea = header.entry(Tag::HHEA).ok_or(Error::missing(Tag::HHEA))?;
        let hhea = header.table_data(block, hhea)?;
        let num_h_metrics = u16::read_at(hhea, NUM_H_METRICS_OFFSET)
            .map_err(|_| FormatError::Truncated("hhea table"))?;

        let hmtx = hmtx::reconstruct(data, num_h_metrics, &x_mins)?;
        if hmtx.len() != entry.dst_length as usize {
            log::debug!(
                "reconstructed hmtx has {} bytes, the directory declares {}",
                hmtx.len(),
                entry.dst_length,
            );
            return Err(Error::invalid(
                "transformed hmtx table",
                "length doesn't match the table directory",
            ));
        }

        tables.push((Tag::HMTX, hmtx));
    }

    Ok(tables)
}
