//! Error types.
//!
//! Every failure aborts the current decode or subset call. There is no
//! partial output: a font that is only half right is worse than no font.

use crate::Tag;

/// The result type for everything.
pub type Result<T> = std::result::Result<T, Error>;

/// Decoding or subsetting a font failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The font data is malformed.
    #[error("malformed font: {0}")]
    Format(#[from] FormatError),
    /// The font relies on a feature this crate doesn't handle.
    #[error("unsupported font: {0}")]
    Unsupported(#[from] Unsupported),
    /// The requested glyph set cannot be closed over composite references.
    #[error("invalid glyph closure: {0}")]
    Closure(#[from] ClosureError),
}

/// The font data violates the WOFF2 or OpenType format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The data ended while reading a structure.
    #[error("unexpected end of {0}")]
    Truncated(&'static str),
    /// The file doesn't start with a known signature.
    #[error("unknown signature {0:#010x}")]
    BadSignature(u32),
    /// A structure contains values that contradict each other or the format.
    #[error("invalid {context}: {reason}")]
    Invalid {
        /// The structure that was being read.
        context: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// A table the operation depends on is missing.
    #[error("missing {0} table")]
    MissingTable(Tag),
    /// The `cmap` table has no Unicode subtable in a supported format.
    #[error("no supported unicode cmap subtable")]
    NoUnicodeCmap,
    /// The compressed table data could not be decompressed.
    #[error("decompression failed")]
    Decompression,
    /// The decompressed table data doesn't have the declared size.
    #[error("decompressed {actual} bytes, expected {expected}")]
    SizeMismatch {
        /// The uncompressed size declared by the table directory.
        expected: usize,
        /// The size the decompressor produced.
        actual: usize,
    },
}

/// A font feature outside the supported subset of OpenType.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unsupported {
    /// CFF or CFF2 outlines.
    #[error("CFF outlines")]
    CffOutlines,
    /// A font collection where a single font was expected.
    #[error("font collections")]
    Collection,
    /// A table transform that is not defined for this table.
    #[error("transform version {version} for {tag} table")]
    TransformVersion {
        /// The transformed table.
        tag: Tag,
        /// The transform version from the table directory.
        version: u8,
    },
}

/// A glyph set that cannot be closed over its composite references.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClosureError {
    /// A requested glyph doesn't exist in the font.
    #[error("glyph {glyph} is out of range, font has {num_glyphs} glyphs")]
    GlyphOutOfRange {
        /// The requested glyph.
        glyph: u16,
        /// The number of glyphs in the font.
        num_glyphs: u16,
    },
    /// A composite glyph references a glyph that doesn't exist.
    #[error("glyph {glyph} references component {component} which is out of range")]
    ComponentOutOfRange {
        /// The composite glyph.
        glyph: u16,
        /// The referenced component glyph.
        component: u16,
    },
    /// A composite glyph references itself, directly or indirectly.
    #[error("composite glyph {0} references itself")]
    Cycle(u16),
}

impl Error {
    /// Shorthand for [`FormatError::Invalid`].
    pub(crate) fn invalid(context: &'static str, reason: &'static str) -> Self {
        FormatError::Invalid { context, reason }.into()
    }

    /// Shorthand for [`FormatError::MissingTable`].
    pub(crate) fn missing(tag: Tag) -> Self {
        FormatError::MissingTable(tag).into()
    }
}
