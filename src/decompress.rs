//! The decompression collaborator of the WOFF2 decoder.

use crate::Result;

/// Decompresses the WOFF2 table data block.
///
/// The decoder hands over the compressed stream together with the size the
/// table directory declares for it. Implementations may use `expected_len` to
/// bound their output; the decoder rejects any result of a different length.
pub trait Decompressor {
    /// Decompress `compressed`.
    fn decompress(&self, compressed: &[u8], expected_len: usize) -> Result<Vec<u8>>;
}

impl<F> Decompressor for F
where
    F: Fn(&[u8], usize) -> Result<Vec<u8>>,
{
    fn decompress(&self, compressed: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        self(compressed, expected_len)
    }
}

/// Brotli decompression, as mandated by WOFF2.
#[cfg(feature = "brotli")]
#[derive(Debug, Default, Copy, Clone)]
pub struct Brotli;

#[cfg(feature = "brotli")]
impl Decompressor for Brotli {
    fn decompress(&self, compressed: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        use crate::error::FormatError;
        use std::io::{Cursor, Read};

        // This is the default size of the buffer in the brotli crate.
        const BUFFER_SIZE: usize = 4096;

        let input = brotli_decompressor::Decompressor::new(Cursor::new(compressed), BUFFER_SIZE);

        // Read one byte past the expected size so that oversized streams are
        // noticed without decompressing all of them.
        let mut output = Vec::with_capacity(expected_len);
        input
            .take(expected_len as u64 + 1)
            .read_to_end(&mut output)
            .map_err(|err| {
                log::debug!("brotli stream is invalid: {err}");
                FormatError::Decompression
            })?;

        Ok(output)
    }
}
