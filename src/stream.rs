use crate::error::{Error, FormatError};
use crate::Result;

/// A readable, bounds-checked stream of binary data.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    /// The underlying data of the reader.
    data: &'a [u8],
    /// The current offset in bytes. Is not guaranteed to be in range.
    offset: usize,
    /// What the data represents, used in error messages.
    context: &'static str,
}

impl<'a> Reader<'a> {
    /// Create a new readable stream of binary data.
    #[cfg(test)]
    pub fn new(data: &'a [u8]) -> Self {
        Self::named(data, "font data")
    }

    /// Create a new readable stream whose errors name the structure being read.
    #[inline]
    pub fn named(data: &'a [u8], context: &'static str) -> Self {
        Self { data, offset: 0, context }
    }

    /// Create a new readable stream of binary data at a specific position.
    #[inline]
    pub fn new_at(data: &'a [u8], offset: usize, context: &'static str) -> Self {
        Self { data, offset, context }
    }

    /// The remaining data from the current offset.
    #[inline]
    pub fn tail(&self) -> &'a [u8] {
        self.data.get(self.offset..).unwrap_or_default()
    }

    /// Returns the current offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The number of bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    /// Check whether the reader is at the end of the buffer.
    #[cfg(test)]
    pub fn at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Try to read `T` from the data.
    #[inline]
    pub fn read<T: Readable<'a>>(&mut self) -> Result<T> {
        T::read(self)
    }

    /// Read a certain number of bytes.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).ok_or_else(|| self.truncated())?;
        let v = self.data.get(self.offset..end).ok_or_else(|| self.truncated())?;
        self.offset = end;
        Ok(v)
    }

    /// Skip the next `n` bytes from the stream.
    #[inline]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Try to read a vector of `T` from the data.
    pub fn read_vector<T: Readable<'a>>(&mut self, count: usize) -> Result<Vec<T>> {
        // Don't trust the count for the allocation, the data might be short.
        let mut res = Vec::with_capacity(count.min(self.remaining()));

        for _ in 0..count {
            res.push(self.read::<T>()?);
        }

        Ok(res)
    }

    /// The error to report when the data ends prematurely.
    #[inline]
    pub fn truncated(&self) -> Error {
        FormatError::Truncated(self.context).into()
    }

    /// An error describing invalid data in the structure being read.
    #[inline]
    pub fn invalid(&self, reason: &'static str) -> Error {
        FormatError::Invalid { context: self.context, reason }.into()
    }
}

/// Trait for an object that can be read from a byte stream.
pub trait Readable<'a>: Sized {
    fn read(r: &mut Reader<'a>) -> Result<Self>;

    /// Read `Self` at a fixed offset into `data`.
    fn read_at(data: &'a [u8], offset: usize) -> Result<Self> {
        let mut r = Reader::new_at(data, offset, "font data");
        Self::read(&mut r)
    }
}

impl<const N: usize> Readable<'_> for [u8; N] {
    fn read(r: &mut Reader) -> Result<Self> {
        let bytes = r.read_bytes(N)?;
        let mut array = [0; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }
}

impl Readable<'_> for u8 {
    fn read(r: &mut Reader) -> Result<Self> {
        r.read::<[u8; 1]>().map(Self::from_be_bytes)
    }
}

impl Readable<'_> for i8 {
    fn read(r: &mut Reader) -> Result<Self> {
        r.read::<[u8; 1]>().map(Self::from_be_bytes)
    }
}

impl Readable<'_> for u16 {
    fn read(r: &mut Reader) -> Result<Self> {
        r.read::<[u8; 2]>().map(Self::from_be_bytes)
    }
}

impl Readable<'_> for i16 {
    fn read(r: &mut Reader) -> Result<Self> {
        r.read::<[u8; 2]>().map(Self::from_be_bytes)
    }
}

impl Readable<'_> for u32 {
    fn read(r: &mut Reader) -> Result<Self> {
        r.read::<[u8; 4]>().map(Self::from_be_bytes)
    }
}

impl Readable<'_> for i32 {
    fn read(r: &mut Reader) -> Result<Self> {
        r.read::<[u8; 4]>().map(Self::from_be_bytes)
    }
}

/// A writable stream of binary data.
#[derive(Debug, Default)]
pub struct Writer(Vec<u8>);

impl Writer {
    /// Create a new writable stream of binary data.
    #[inline]
    pub fn new() -> Self {
        Self(Vec::with_capacity(1024))
    }

    /// Create a new writable stream of binary data with a capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Write `T` into the data.
    #[inline]
    pub fn write<T: Writeable>(&mut self, data: T) {
        data.write(self);
    }

    /// Write each element of a slice.
    #[inline]
    pub fn write_vector<T: Writeable>(&mut self, data: &[T]) {
        for el in data {
            el.write(self);
        }
    }

    /// Give bytes into the writer.
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    /// Align the contents to a byte boundary.
    #[inline]
    pub fn align(&mut self, to: usize) {
        while self.0.len() % to != 0 {
            self.0.push(0);
        }
    }

    /// Overwrite already written bytes at `offset`.
    #[cfg(test)]
    pub fn patch(&mut self, offset: usize, bytes: &[u8]) {
        self.0[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// The number of written bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return the written bytes.
    #[inline]
    pub fn finish(self) -> Vec<u8> {
        self.0
    }
}

/// Trait for an object that can be written into a byte stream.
pub trait Writeable: Sized {
    fn write(&self, w: &mut Writer);
}

impl<T: Writeable, const N: usize> Writeable for [T; N] {
    fn write(&self, w: &mut Writer) {
        for i in self {
            w.write(i);
        }
    }
}

impl<T> Writeable for &T
where
    T: Writeable,
{
    fn write(&self, w: &mut Writer) {
        T::write(self, w)
    }
}

impl Writeable for u8 {
    fn write(&self, w: &mut Writer) {
        w.extend(&self.to_be_bytes());
    }
}

impl Writeable for i8 {
    fn write(&self, w: &mut Writer) {
        w.extend(&self.to_be_bytes());
    }
}

impl Writeable for u16 {
    fn write(&self, w: &mut Writer) {
        w.extend(&self.to_be_bytes());
    }
}

impl Writeable for i16 {
    fn write(&self, w: &mut Writer) {
        w.extend(&self.to_be_bytes());
    }
}

impl Writeable for u32 {
    fn write(&self, w: &mut Writer) {
        w.extend(&self.to_be_bytes());
    }
}

impl Writeable for i32 {
    fn write(&self, w: &mut Writer) {
        w.extend(&self.to_be_bytes());
    }
}
