use std::collections::{BTreeMap, BTreeSet};

/// How glyphs are numbered in a subsetted font.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum GlyphEncoding {
    /// Every glyph keeps its ID. The subsetted font has as many glyphs as
    /// the highest used ID plus one and unused glyphs are left empty.
    ///
    /// This is what PDF's `Identity-H` encoding with a `CIDToGIDMap` of
    /// `Identity` expects.
    #[default]
    Identity,
    /// The used glyphs are renumbered densely, in ascending order of their
    /// original IDs. The `.notdef` glyph stays at 0.
    Sequential,
}

/// A remapper that allows to assign a new ordering to a subset of glyphs.
/// For example, let's say that we want to subset a font that only contains the
/// glyphs 4, 9 and 16. With sequential encoding, the remapper yields a remapping
/// that assigns the following glyph IDs:
/// 0 -> 0 (The .notdef glyph will always be included)
/// 4 -> 1
/// 9 -> 2
/// 16 -> 3
/// With identity encoding, each glyph maps to itself, and the new font has
/// 17 glyphs of which 13 are empty.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GlyphRemapper {
    encoding: GlyphEncoding,
    /// The map that maps glyphs from their old ID to their new ID.
    forward: BTreeMap<u16, u16>,
    /// The "reverse" mapping, i.e. given a new ID, it allows to map back to
    /// the old one. Gaps of the identity encoding are `None`.
    backward: Vec<Option<u16>>,
}

impl GlyphRemapper {
    /// Create a remapper for a closed set of glyphs. The set must contain
    /// the `.notdef` glyph.
    pub(crate) fn new(encoding: GlyphEncoding, glyphs: &BTreeSet<u16>) -> Self {
        debug_assert!(glyphs.contains(&0), ".notdef is always a part of a subset");

        let mut forward = BTreeMap::new();
        let mut backward = vec![];

        match encoding {
            GlyphEncoding::Identity => {
                let max = glyphs.last().copied().unwrap_or(0);
                backward.resize(usize::from(max) + 1, None);
                for &glyph in glyphs {
                    forward.insert(glyph, glyph);
                    backward[usize::from(glyph)] = Some(glyph);
                }
            }
            GlyphEncoding::Sequential => {
                // The set is sorted, so the mapping is monotonically increasing.
                for (new, &old) in (0u16..).zip(glyphs) {
                    forward.insert(old, new);
                    backward.push(Some(old));
                }
            }
        }

        Self { encoding, forward, backward }
    }

    /// The encoding this remapper implements.
    pub fn encoding(&self) -> GlyphEncoding {
        self.encoding
    }

    /// Return whether the current mapper is an identity mapper.
    pub fn is_identity(&self) -> bool {
        self.encoding == GlyphEncoding::Identity
    }

    /// Get the number of glyphs in the subsetted font.
    pub fn num_gids(&self) -> u16 {
        // At most 65535 glyphs since the original IDs are below `numGlyphs`.
        self.backward.len() as u16
    }

    /// Get the new ID of a glyph, if it is part of the subset.
    pub fn get(&self, old: u16) -> Option<u16> {
        self.forward.get(&old).copied()
    }

    /// Get the original ID of a glyph in the subsetted font. Returns `None`
    /// for the empty placeholders of the identity encoding.
    pub fn old_gid(&self, new: u16) -> Option<u16> {
        self.backward.get(usize::from(new)).copied().flatten()
    }

    /// The original IDs of all glyphs in the subset, in ascending order.
    pub fn glyph_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.forward.keys().copied()
    }

    /// Pairs of original and new glyph IDs, ordered by original ID.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.forward.iter().map(|(&old, &new)| (old, new))
    }

    /// Return an iterator that yields the old glyph of each new glyph ID, in
    /// order. Placeholders of the identity encoding yield `None`.
    pub(crate) fn remapped_gids(&self) -> impl Iterator<Item = Option<u16>> + '_ {
        self.backward.iter().copied()
    }
}
