//! Reading the PostScript name from the `name` table.

use crate::stream::{Readable, Reader};
use crate::Result;

/// The name ID of the PostScript name.
const POSTSCRIPT_NAME_ID: u16 = 6;

#[derive(Clone, Copy, Debug)]
struct NameRecord {
    platform_id: u16,
    encoding_id: u16,
    name_id: u16,
    length: u16,
    string_offset: u16,
}

impl NameRecord {
    /// How much this record is preferred, lower is better.
    fn preference(&self) -> Option<u8> {
        match (self.platform_id, self.encoding_id) {
            (3, 1 | 0 | 10) => Some(0),
            (1, 0) => Some(1),
            (0, _) => Some(2),
            _ => None,
        }
    }

    fn decode(&self, bytes: &[u8]) -> String {
        if self.platform_id == 1 {
            // Mac Roman. PostScript names are ASCII, so the upper half is
            // dropped.
            return bytes.iter().filter(|b| b.is_ascii()).map(|&b| b as char).collect();
        }

        let units = bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
        char::decode_utf16(units).filter_map(|c| c.ok()).collect()
    }
}

impl Readable<'_> for NameRecord {
    fn read(r: &mut Reader<'_>) -> Result<Self> {
        let platform_id = r.read::<u16>()?;
        let encoding_id = r.read::<u16>()?;
        r.read::<u16>()?; // language id
        let name_id = r.read::<u16>()?;
        let length = r.read::<u16>()?;
        let string_offset = r.read::<u16>()?;

        Ok(Self { platform_id, encoding_id, name_id, length, string_offset })
    }
}

/// Read the PostScript name (name ID 6), restricted to the characters that
/// may appear in a PDF name without escaping.
///
/// Windows Unicode records are preferred over Macintosh Roman ones, which in
/// turn are preferred over the Unicode platform. Returns `None` if there is
/// no usable record or it is empty after sanitizing.
pub(crate) fn postscript_name(name: &[u8]) -> Option<String> {
    let mut r = Reader::named(name, "name table");
    r.read::<u16>().ok()?; // version
    let count = r.read::<u16>().ok()?;
    let storage_offset = r.read::<u16>().ok()?;
    let records = r.read_vector::<NameRecord>(usize::from(count)).ok()?;

    let mut candidates: Vec<(u8, NameRecord)> = records
        .into_iter()
        .filter(|record| record.name_id == POSTSCRIPT_NAME_ID)
        .filter_map(|record| Some((record.preference()?, record)))
        .collect();
    candidates.sort_by_key(|&(rank, _)| rank);

    candidates.into_iter().find_map(|(_, record)| {
        let start = usize::from(storage_offset) + usize::from(record.string_offset);
        let bytes = name.get(start..start + usize::from(record.length))?;
        let name = sanitize(&record.decode(bytes));
        (!name.is_empty()).then_some(name)
    })
}

/// Keep printable ASCII without whitespace and PDF delimiters.
fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_graphic())
        .filter(|c| !matches!(c, '(' | ')' | '<' | '>' | '[' | ']' | '{' | '}' | '/' | '%' | '#'))
        .collect()
}
