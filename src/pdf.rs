//! Everything a PDF writer needs to embed a subsetted font as a CID-keyed
//! `Type0` font: the subset name, glyph widths, the `ToUnicode` CMap and the
//! font file itself.
//!
//! The character codes written to content streams are the glyph IDs of the
//! subsetted font, as two bytes each. With [`GlyphEncoding::Identity`] these
//! are the original glyph IDs.
//!
//! [`GlyphEncoding::Identity`]: crate::GlyphEncoding::Identity

use crate::metrics::Font;
use crate::remapper::GlyphRemapper;
use rustc_hash::FxHasher;
use std::hash::Hasher;

/// The PDF-facing result of subsetting a font.
#[derive(Debug, Clone)]
pub struct PdfFontSubset {
    name: String,
    widths: Vec<u32>,
    to_unicode: String,
    font_file: Vec<u8>,
    remapper: GlyphRemapper,
}

impl PdfFontSubset {
    pub(crate) fn new(font: &Font, font_file: Vec<u8>, remapper: GlyphRemapper) -> Self {
        let tag = subset_tag(remapper.glyph_ids());
        let name = format!("{}+{}", tag, font.postscript_name().unwrap_or("Font"));

        let units_per_em = f64::from(font.metrics().units_per_em);
        let widths = remapper
            .remapped_gids()
            .map(|old_gid| {
                let advance = old_gid
                    .and_then(|gid| font.glyph_metrics(gid))
                    .map_or(0, |m| m.advance_width);
                (f64::from(advance) / units_per_em * 1000.0).round() as u32
            })
            .collect();

        let mut mappings: Vec<(u16, u32)> = font
            .cmap()
            .iter()
            .filter_map(|(code_point, gid)| Some((remapper.get(gid)?, code_point)))
            .collect();
        mappings.sort_unstable();
        let to_unicode = to_unicode_cmap(&mappings);

        log::debug!(
            "pdf subset {} with {} glyphs and {} unicode mappings",
            name,
            remapper.num_gids(),
            mappings.len(),
        );

        Self { name, widths, to_unicode, font_file, remapper }
    }

    /// The `BaseFont` name: a six-letter tag identifying the glyph set, a
    /// plus sign and the PostScript name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The first character code, always 0.
    pub fn first_char(&self) -> u16 {
        0
    }

    /// The last character code.
    pub fn last_char(&self) -> u16 {
        self.remapper.num_gids().saturating_sub(1)
    }

    /// The advance widths in thousandths of an em for every code from
    /// [`first_char`](Self::first_char) to [`last_char`](Self::last_char).
    /// Codes without a glyph have width 0.
    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    /// The width of the glyph with the given code.
    pub fn width(&self, code: u16) -> Option<u32> {
        self.widths.get(usize::from(code)).copied()
    }

    /// The `ToUnicode` CMap, mapping codes back to the code points of the
    /// font's character map.
    pub fn to_unicode_cmap(&self) -> &str {
        &self.to_unicode
    }

    /// The subsetted TrueType font, for a `FontFile2` stream.
    pub fn font_file(&self) -> &[u8] {
        &self.font_file
    }

    /// The mapping between original glyph IDs and codes.
    pub fn remapper(&self) -> &GlyphRemapper {
        &self.remapper
    }

    /// The original IDs of all glyphs in the subset, in ascending order.
    pub fn glyph_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.remapper.glyph_ids()
    }

    /// The character code of an original glyph, if it is part of the subset.
    pub fn encode_glyph(&self, glyph_id: u16) -> Option<u16> {
        self.remapper.get(glyph_id)
    }

    /// Encode a run of original glyphs as a PDF hex string, e.g. `<0003001F>`.
    /// Returns `None` if any glyph is not part of the subset.
    pub fn encode_hex(&self, glyph_ids: &[u16]) -> Option<String> {
        let mut hex = String::with_capacity(2 + 4 * glyph_ids.len());
        hex.push('<');
        for &glyph_id in glyph_ids {
            let code = self.encode_glyph(glyph_id)?;
            hex.push_str(&format!("{code:04X}"));
        }
        hex.push('>');
        Some(hex)
    }

    /// The `W` array of a CID font, listing the widths of all codes that have
    /// a glyph, grouped into runs of consecutive codes.
    pub fn cid_widths(&self) -> String {
        let codes: Vec<u16> = self.remapper.iter().map(|(_, new)| new).collect();
        cid_widths_array(&codes, |code| self.width(code).unwrap_or(0))
    }
}

/// Derive a six-letter subset tag from a glyph set. The same glyphs always
/// yield the same tag.
fn subset_tag(glyph_ids: impl Iterator<Item = u16>) -> String {
    let mut hasher = FxHasher::default();
    for glyph_id in glyph_ids {
        hasher.write_u16(glyph_id);
    }

    let mut hash = hasher.finish();
    let mut tag = String::with_capacity(6);
    for _ in 0..6 {
        tag.push(char::from(b'A' + (hash % 26) as u8));
        hash /= 26;
    }
    tag
}

/// Write a `ToUnicode` CMap for sorted pairs of code and code point.
fn to_unicode_cmap(mappings: &[(u16, u32)]) -> String {
    let mut cmap = String::new();

    cmap.push_str("/CIDInit /ProcSet findresource begin\n");
    cmap.push_str("12 dict begin\n");
    cmap.push_str("begincmap\n");
    cmap.push_str("/CIDSystemInfo <<\n");
    cmap.push_str("  /Registry (Adobe)\n");
    cmap.push_str("  /Ordering (UCS)\n");
    cmap.push_str("  /Supplement 0\n");
    cmap.push_str(">> def\n");
    cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
    cmap.push_str("/CMapType 2 def\n");
    cmap.push_str("1 begincodespacerange\n");
    cmap.push_str("<0000> <FFFF>\n");
    cmap.push_str("endcodespacerange\n");

    // At most 100 entries per section.
    for chunk in mappings.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for &(code, code_point) in chunk {
            cmap.push_str(&format!("<{code:04X}> <{}>\n", utf16_hex(code_point)));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\n");
    cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
    cmap.push_str("end\n");
    cmap.push_str("end\n");

    cmap
}

/// A code point as UTF-16BE hex digits, with a surrogate pair past the BMP.
fn utf16_hex(code_point: u32) -> String {
    if code_point <= 0xFFFF {
        format!("{code_point:04X}")
    } else {
        let high = ((code_point - 0x10000) >> 10) + 0xD800;
        let low = ((code_point - 0x10000) & 0x3FF) + 0xDC00;
        format!("{high:04X}{low:04X}")
    }
}

/// Write a `W` array for sorted codes.
fn cid_widths_array(codes: &[u16], width: impl Fn(u16) -> u32) -> String {
    let mut array = String::from("[");

    let mut i = 0;
    while i < codes.len() {
        let start = codes[i];
        let mut widths = vec![width(start)];

        while i + 1 < codes.len() && codes[i + 1] == codes[i].wrapping_add(1) {
            i += 1;
            widths.push(width(codes[i]));
        }

        if array.len() > 1 {
            array.push(' ');
        }

        let widths: Vec<String> = widths.iter().map(u32::to_string).collect();
        array.push_str(&format!("{start} [{}]", widths.join(" ")));

        i += 1;
    }

    array.push(']');
    array
}
