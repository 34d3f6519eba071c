//! The layout-facing view of a font: font-wide metrics, per-glyph horizontal
//! metrics and the Unicode character map.

use crate::cmap::CmapIndex;
use crate::decompress::Decompressor;
use crate::hhea::Hhea;
use crate::pdf::PdfFontSubset;
use crate::remapper::GlyphEncoding;
use crate::sfnt::Face;
use crate::{head, hmtx, maxp, name, woff2, Result, Tag};

/// Font-wide metrics, in font units.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FontMetrics {
    /// The number of font units per em. Never zero.
    pub units_per_em: u16,
    /// The typographic ascender from `hhea`.
    pub ascender: i16,
    /// The typographic descender from `hhea`, usually negative.
    pub descender: i16,
    /// The line gap from `hhea`.
    pub line_gap: i16,
    /// The number of long horizontal metrics, clamped to the glyph count.
    pub number_of_h_metrics: u16,
}

/// Horizontal metrics of a single glyph, in font units.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct GlyphMetrics {
    /// How far the pen advances after the glyph.
    pub advance_width: u16,
    /// The distance from the pen position to the left edge of the glyph.
    pub left_side_bearing: i16,
}

/// A parsed SFNT font.
///
/// All tables the layout needs are read once up front, so lookups are cheap
/// and infallible. The font owns its data and can be shared across threads.
#[derive(Debug, Clone)]
pub struct Font {
    data: Vec<u8>,
    index: u32,
    metrics: FontMetrics,
    glyph_metrics: Vec<GlyphMetrics>,
    cmap: CmapIndex,
    postscript_name: Option<String>,
}

impl Font {
    /// Parse an SFNT font (`.ttf` or `.otf`).
    pub fn new(data: Vec<u8>) -> Result<Self> {
        Self::from_collection(data, 0)
    }

    /// Parse the face at `index` of a font collection. For single fonts, the
    /// index must be 0.
    pub fn from_collection(data: Vec<u8>, index: u32) -> Result<Self> {
        let face = Face::parse(&data, index)?;

        let num_glyphs = maxp::num_glyphs(face.expect_table(Tag::MAXP)?)?;
        let units_per_em = head::units_per_em(face.expect_table(Tag::HEAD)?)?;
        let hhea = Hhea::parse(face.expect_table(Tag::HHEA)?)?;
        let glyph_metrics =
            hmtx::parse(face.expect_table(Tag::HMTX)?, hhea.num_h_metrics, num_glyphs)?;
        let cmap = CmapIndex::parse(face.expect_table(Tag::CMAP)?, num_glyphs)?;
        let postscript_name = face.table(Tag::NAME).and_then(name::postscript_name);

        if postscript_name.is_none() {
            log::debug!("font has no usable PostScript name");
        }

        log::debug!(
            "parsed font with {} glyphs and {} mapped code points",
            num_glyphs,
            cmap.len(),
        );

        let metrics = FontMetrics {
            units_per_em,
            ascender: hhea.ascender,
            descender: hhea.descender,
            line_gap: hhea.line_gap,
            number_of_h_metrics: hhea.num_h_metrics.min(num_glyphs),
        };

        Ok(Font { data, index, metrics, glyph_metrics, cmap, postscript_name })
    }

    /// Decode a WOFF2 font and parse the result.
    #[cfg(feature = "brotli")]
    pub fn from_woff2(data: &[u8]) -> Result<Self> {
        Self::new(woff2::decode(data)?)
    }

    /// Decode a WOFF2 font with a custom decompressor and parse the result.
    pub fn from_woff2_with(
        data: &[u8],
        decompressor: &(impl Decompressor + ?Sized),
    ) -> Result<Self> {
        Self::new(woff2::decode_with(data, decompressor)?)
    }

    /// The number of glyphs, as given by `maxp`.
    pub fn glyph_count(&self) -> u16 {
        // There are exactly `numGlyphs` metrics.
        self.glyph_metrics.len() as u16
    }

    /// The horizontal metrics of a glyph. Glyphs past the long metrics share
    /// the advance of the last one.
    pub fn glyph_metrics(&self, glyph_id: u16) -> Option<GlyphMetrics> {
        self.glyph_metrics.get(usize::from(glyph_id)).copied()
    }

    /// Look up the glyph for a Unicode code point.
    pub fn map_code_point(&self, code_point: u32) -> Option<u16> {
        self.cmap.glyph_index(code_point)
    }

    /// The font-wide metrics.
    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    /// The SFNT data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The index of the face in a collection.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The Unicode character map.
    pub fn cmap(&self) -> &CmapIndex {
        &self.cmap
    }

    /// The PostScript name, if the font has one.
    pub fn postscript_name(&self) -> Option<&str> {
        self.postscript_name.as_deref()
    }

    /// Subset the font to `glyphs` for embedding in a PDF.
    ///
    /// Fails for fonts with CFF outlines.
    pub fn pdf_subset(&self, glyphs: &[u16], encoding: GlyphEncoding) -> Result<PdfFontSubset> {
        let (font_file, remapper) = crate::subset(&self.data, self.index, glyphs, encoding)?;
        Ok(PdfFontSubset::new(self, font_file, remapper))
    }
}
