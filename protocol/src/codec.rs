//! Little-endian wire codec
//!
//! Every message is built by appending fixed-width scalars to a [`Writer`]
//! and parsed by pulling them back, in layout order, from a [`Reader`].
//! The wire is little-endian unless a field says otherwise (the NetBIOS
//! session prefix is the only big-endian field we handle).
//!
//! ```text
//! Writer ──put::<u16>()──► BytesMut ──freeze()──► Bytes
//! Reader ◄──get::<u16>()── &[u8] (cursor advances by size_of::<T>())
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, Result};

/// A fixed-width integer that can travel on the wire
pub trait Scalar: Copy + Sized {
    /// Encoded width in bytes
    const WIDTH: usize;

    fn put_le(self, dst: &mut BytesMut);
    fn put_be(self, dst: &mut BytesMut);
    /// Caller guarantees `src.len() >= WIDTH`
    fn get_le(src: &mut &[u8]) -> Self;
    /// Caller guarantees `src.len() >= WIDTH`
    fn get_be(src: &mut &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($ty:ty, $put_le:ident, $put_be:ident, $get_le:ident, $get_be:ident) => {
        impl Scalar for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn put_le(self, dst: &mut BytesMut) {
                dst.$put_le(self);
            }

            #[inline]
            fn put_be(self, dst: &mut BytesMut) {
                dst.$put_be(self);
            }

            #[inline]
            fn get_le(src: &mut &[u8]) -> Self {
                src.$get_le()
            }

            #[inline]
            fn get_be(src: &mut &[u8]) -> Self {
                src.$get_be()
            }
        }
    };
}

impl_scalar!(u8, put_u8, put_u8, get_u8, get_u8);
impl_scalar!(i8, put_i8, put_i8, get_i8, get_i8);
impl_scalar!(u16, put_u16_le, put_u16, get_u16_le, get_u16);
impl_scalar!(i16, put_i16_le, put_i16, get_i16_le, get_i16);
impl_scalar!(u32, put_u32_le, put_u32, get_u32_le, get_u32);
impl_scalar!(i32, put_i32_le, put_i32, get_i32_le, get_i32);
impl_scalar!(u64, put_u64_le, put_u64, get_u64_le, get_u64);
impl_scalar!(i64, put_i64_le, put_i64, get_i64_le, get_i64);

/// Append-only message builder
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: BytesMut,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Append a little-endian scalar
    pub fn put<T: Scalar>(&mut self, value: T) -> &mut Self {
        value.put_le(&mut self.buf);
        self
    }

    /// Append a big-endian scalar
    pub fn put_be<T: Scalar>(&mut self, value: T) -> &mut Self {
        value.put_be(&mut self.buf);
        self
    }

    pub fn put_slice(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    pub fn put_zeros(&mut self, count: usize) -> &mut Self {
        self.buf.put_bytes(0, count);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Append `value` little-endian to `buf`
pub fn append_scalar<T: Scalar>(buf: &mut BytesMut, value: T) {
    value.put_le(buf);
}

/// Cursor over a received buffer
///
/// A failed read leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Bytes not yet consumed
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(ProtocolError::Truncated {
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Read a little-endian scalar
    pub fn get<T: Scalar>(&mut self) -> Result<T> {
        self.ensure(T::WIDTH)?;
        let mut src = self.rest();
        let value = T::get_le(&mut src);
        self.pos += T::WIDTH;
        Ok(value)
    }

    /// Read a big-endian scalar
    pub fn get_be<T: Scalar>(&mut self) -> Result<T> {
        self.ensure(T::WIDTH)?;
        let mut src = self.rest();
        let value = T::get_be(&mut src);
        self.pos += T::WIDTH;
        Ok(value)
    }

    /// Borrow the next `count` bytes
    pub fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        self.ensure(count)?;
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }
}

/// Read the next little-endian scalar from `reader`
pub fn read_scalar<T: Scalar>(reader: &mut Reader<'_>) -> Result<T> {
    reader.get()
}

/// A composite record with a fixed field order
pub trait Encode {
    fn encode(&self, w: &mut Writer);

    fn to_bytes(&self) -> Bytes {
        let mut w = Writer::new();
        self.encode(&mut w);
        w.freeze()
    }
}

pub trait Decode: Sized {
    fn decode(r: &mut Reader<'_>) -> Result<Self>;

    /// Decode from the start of `bytes`, ignoring trailing data
    fn decode_from(bytes: &[u8]) -> Result<Self> {
        Self::decode(&mut Reader::new(bytes))
    }
}
