/*!
Decodes WOFF2 web fonts and subsets TrueType fonts for embedding in PDF files.

The crate covers the path a font takes from a web page to a PDF: a WOFF2 file
is decompressed and its transformed tables are rebuilt into a standard SFNT
binary. The layout engine queries that binary for metrics and character
mappings, and once a document is laid out, the font is reduced to the glyphs
the document uses.

# Example
```no_run
use fontembed::{Font, GlyphEncoding};

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let woff2 = std::fs::read("fonts/NotoSans-Regular.woff2")?;
let font = Font::from_woff2(&woff2)?;

// Shape some text into glyphs.
let glyphs: Vec<u16> = "Hello"
    .chars()
    .filter_map(|c| font.map_code_point(c as u32))
    .collect();

// Keep only those glyphs (and the ones they are composed of).
let subset = font.pdf_subset(&glyphs, GlyphEncoding::Identity)?;
println!("{} has {} bytes", subset.name(), subset.font_file().len());
# Ok(())
# }
```

Only fonts with TrueType outlines can be subsetted. WOFF2 collections and
fonts with CFF outlines are rejected with [`Error::Unsupported`].
*/

#![deny(unsafe_code)]
#![deny(missing_docs)]

mod cmap;
mod decompress;
mod error;
mod glyf;
mod head;
mod hhea;
mod hmtx;
mod maxp;
mod metrics;
mod name;
mod pdf;
mod post;
mod remapper;
pub mod sfnt;
mod stream;
pub mod varint;
pub mod woff2;

pub use crate::cmap::CmapIndex;
#[cfg(feature = "brotli")]
pub use crate::decompress::Brotli;
pub use crate::decompress::Decompressor;
pub use crate::error::{ClosureError, Error, FormatError, Result, Unsupported};
pub use crate::metrics::{Font, FontMetrics, GlyphMetrics};
pub use crate::pdf::PdfFontSubset;
pub use crate::remapper::{GlyphEncoding, GlyphRemapper};

use crate::sfnt::Face;
use crate::stream::{Readable, Reader, Writeable, Writer};
use std::fmt::{self, Debug, Display, Formatter};

/// Subset a font face to the given glyphs and the glyphs they are composed of.
///
/// - The `data` must be in the OpenType font format, with TrueType outlines.
/// - The `index` is only relevant if the data contains a font collection
///   (`.ttc` file). Otherwise, it should be 0.
///
/// The `.notdef` glyph is always part of the subset. Returns the new font
/// together with the mapping from old to new glyph IDs.
pub fn subset(
    data: &[u8],
    index: u32,
    glyphs: &[u16],
    encoding: GlyphEncoding,
) -> Result<(Vec<u8>, GlyphRemapper)> {
    let face = Face::parse(data, index)?;
    face.expect_truetype()?;

    let num_glyphs = maxp::num_glyphs(face.expect_table(Tag::MAXP)?)?;
    let table = glyf::Table::new(&face, num_glyphs)?;
    let closure = glyf::closure(&table, glyphs)?;
    let mapper = GlyphRemapper::new(encoding, &closure);

    log::debug!(
        "subsetting {} of {} glyphs ({} requested, {:?} encoding)",
        closure.len(),
        num_glyphs,
        glyphs.len(),
        encoding,
    );

    let mut ctx = Context {
        face,
        num_glyphs,
        mapper,
        num_h_metrics: None,
        tables: vec![],
    };

    // See here for the required tables:
    // https://learn.microsoft.com/en-us/typography/opentype/spec/otff#required-tables
    // some of those are not strictly needed according to the PDF standard,
    // but it's still better to include them.
    ctx.process(Tag::GLYF)?;
    // LOCA will be handled by GLYF
    ctx.process(Tag::CVT)?; // won't be subsetted.
    ctx.process(Tag::FPGM)?; // won't be subsetted.
    ctx.process(Tag::PREP)?; // won't be subsetted.
    ctx.process(Tag::GASP)?; // won't be subsetted.

    // Required tables. HMTX goes before HHEA, which needs its metric count.
    ctx.process(Tag::CMAP)?;
    ctx.process(Tag::HEAD)?;
    ctx.process(Tag::HMTX)?;
    ctx.process(Tag::HHEA)?;
    ctx.process(Tag::MAXP)?;
    ctx.process(Tag::NAME)?;
    ctx.process(Tag::OS2)?;
    ctx.process(Tag::POST)?;

    let data = sfnt::assemble(TRUETYPE_FLAVOR, ctx.tables)?;
    log::debug!("subsetted font has {} bytes", data.len());

    Ok((data, ctx.mapper))
}

/// The SFNT version of fonts with TrueType outlines.
const TRUETYPE_FLAVOR: u32 = 0x00010000;

/// Subsetting context.
struct Context<'a> {
    /// Original face.
    face: Face<'a>,
    /// The number of glyphs in the original face.
    num_glyphs: u16,
    /// The mapping from original to subsetted glyph IDs. Covers the whole
    /// closure of the requested glyphs.
    mapper: GlyphRemapper,
    /// The number of long metrics in the subsetted `hmtx` table, known once
    /// it has been written.
    num_h_metrics: Option<u16>,
    /// Subsetted tables.
    tables: Vec<(Tag, Vec<u8>)>,
}

impl<'a> Context<'a> {
    /// Expect a table.
    fn expect_table(&self, tag: Tag) -> Result<&'a [u8]> {
        self.face.expect_table(tag)
    }

    /// Process a table.
    fn process(&mut self, tag: Tag) -> Result<()> {
        let data = match self.face.table(tag) {
            Some(data) => data,
            None => {
                log::trace!("font has no {tag} table");
                return Ok(());
            }
        };

        match tag {
            Tag::GLYF => glyf::subset(self)?,
            Tag::CMAP => cmap::subset(self)?,
            Tag::HEAD => head::subset(self)?,
            Tag::HHEA => hhea::subset(self)?,
            Tag::HMTX => hmtx::subset(self)?,
            Tag::MAXP => maxp::subset(self)?,
            Tag::POST => post::subset(self)?,
            _ => self.push(tag, data.to_vec()),
        }

        Ok(())
    }

    /// Push a subsetted table.
    fn push(&mut self, tag: Tag, table: Vec<u8>) {
        debug_assert!(
            !self.tables.iter().any(|&(prev, _)| prev == tag),
            "duplicate {tag} table"
        );
        self.tables.push((tag, table));
    }
}

/// A 4-byte OpenType tag.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Tag(pub [u8; 4]);

#[allow(unused)]
impl Tag {
    // General tables.
    const CMAP: Self = Self(*b"cmap");
    const HEAD: Self = Self(*b"head");
    const HHEA: Self = Self(*b"hhea");
    const HMTX: Self = Self(*b"hmtx");
    const MAXP: Self = Self(*b"maxp");
    const NAME: Self = Self(*b"name");
    const OS2: Self = Self(*b"OS/2");
    const POST: Self = Self(*b"post");

    // TrueType.
    const GLYF: Self = Self(*b"glyf");
    const LOCA: Self = Self(*b"loca");
    const PREP: Self = Self(*b"prep");
    const FPGM: Self = Self(*b"fpgm");
    const CVT: Self = Self(*b"cvt ");
    const GASP: Self = Self(*b"gasp");

    // CFF.
    const CFF: Self = Self(*b"CFF ");
    const CFF2: Self = Self(*b"CFF2");

    /// Create a tag from its four bytes.
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }
}

impl Readable<'_> for Tag {
    fn read(r: &mut Reader) -> Result<Self> {
        r.read::<[u8; 4]>().map(Self)
    }
}

impl Writeable for Tag {
    fn write(&self, w: &mut Writer) {
        w.write::<[u8; 4]>(self.0)
    }
}

impl Debug for Tag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.pad(std::str::from_utf8(&self.0).unwrap_or("..."))
    }
}
