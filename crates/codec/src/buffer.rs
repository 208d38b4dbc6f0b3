//! A growable FIFO of octets with independent read and write cursors.
//!
//! This is the substrate the wire codec encodes into and decodes out of: a
//! single resizable `Vec<u8>` addressed by two cursors, `read_cursor ≤
//! write_cursor`. Reading never shifts bytes; it only advances the read
//! cursor, except when a read exactly drains the buffer, in which case both
//! cursors snap back to zero so the backing storage can be reused from the
//! start.

use crate::Error;

/// Cursor-addressed byte FIFO.
///
/// `max_size` bounds total capacity; `0` means unbounded. All typed integer
/// operations read/write host byte order — callers apply `to_be`/`from_be`
/// themselves when the wire format demands network byte order.
#[derive(Debug, Clone)]
pub struct ByteBuffer {
    data: Vec<u8>,
    max_size: usize,
    read_cursor: usize,
    write_cursor: usize,
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            max_size: 0,
            read_cursor: 0,
            write_cursor: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            max_size: 0,
            read_cursor: 0,
            write_cursor: 0,
        }
    }

    /// Bound total capacity. `0` means unbounded.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::new()
        }
    }

    #[inline]
    pub fn readable(&self) -> usize {
        self.write_cursor - self.read_cursor
    }

    #[inline]
    pub fn writable(&self) -> usize {
        self.data.len() - self.write_cursor
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Reset both cursors without releasing the backing storage.
    pub fn clear(&mut self) {
        self.read_cursor = 0;
        self.write_cursor = 0;
    }

    /// Ensure `writable() >= n`, growing capacity if needed.
    ///
    /// Unlike the original this does not silently clamp to `max_size`: a
    /// request that would push capacity past the bound fails explicitly
    /// rather than reserving a truncated amount.
    pub fn reserve(&mut self, n: usize) -> Result<(), Error> {
        if self.writable() >= n {
            return Ok(());
        }

        let needed = self.write_cursor + n;
        if self.max_size != 0 && needed > self.max_size {
            return Err(Error::CapacityExceeded);
        }

        self.data.resize(needed, 0);
        Ok(())
    }

    pub fn write_bytes(&mut self, src: &[u8]) -> Result<(), Error> {
        if self.writable() < src.len() {
            return Err(Error::UnderWrite);
        }

        let start = self.write_cursor;
        self.data[start..start + src.len()].copy_from_slice(src);
        self.write_cursor += src.len();
        Ok(())
    }

    /// # Test
    ///
    /// ```
    /// use stun_probe_codec::buffer::ByteBuffer;
    ///
    /// let mut buf = ByteBuffer::new();
    /// buf.reserve(3).unwrap();
    /// buf.write_bytes(&[1, 2, 3]).unwrap();
    ///
    /// let mut out = [0u8; 3];
    /// buf.read_bytes(&mut out).unwrap();
    /// assert_eq!(out, [1, 2, 3]);
    ///
    /// // an exact drain snaps both cursors back to zero.
    /// assert_eq!(buf.readable(), 0);
    /// buf.reserve(1).unwrap();
    /// assert_eq!(buf.capacity(), 1);
    /// ```
    pub fn read_bytes(&mut self, dst: &mut [u8]) -> Result<(), Error> {
        let n = dst.len();
        if self.readable() < n {
            return Err(Error::UnderRead);
        }

        let start = self.read_cursor;
        dst.copy_from_slice(&self.data[start..start + n]);

        if self.readable() == n {
            self.clear();
        } else {
            self.read_cursor += n;
        }

        Ok(())
    }

    pub fn peek_bytes(&self, offset: usize, n: usize) -> Result<&[u8], Error> {
        if self.readable() < offset + n {
            return Err(Error::UnderRead);
        }

        let start = self.read_cursor + offset;
        Ok(&self.data[start..start + n])
    }

    /// Overwrite bytes already present at `offset` past the read cursor
    /// without moving either cursor. Used to patch a length field in place
    /// after the rest of a message has been written.
    pub fn update_bytes(&mut self, offset: usize, src: &[u8]) -> Result<(), Error> {
        if self.readable() < offset + src.len() {
            return Err(Error::UnderRead);
        }

        let start = self.read_cursor + offset;
        self.data[start..start + src.len()].copy_from_slice(src);
        Ok(())
    }

    pub fn write_string(&mut self, s: &str) -> Result<(), Error> {
        self.write_bytes(s.as_bytes())
    }

    /// Append `s`, then append `delim` unless the bytes already written end
    /// with `delim` (an exact tail substring match, not a byte-wise scan).
    pub fn write_string_delimited(&mut self, s: &str, delim: &[u8]) -> Result<(), Error> {
        self.write_string(s)?;

        let bytes = s.as_bytes();
        let tail_matches = bytes.len() >= delim.len() && &bytes[bytes.len() - delim.len()..] == delim;

        if !tail_matches {
            self.reserve(delim.len())?;
            self.write_bytes(delim)?;
        }

        Ok(())
    }

    /// Drain every readable byte into a freshly allocated `Vec<u8>`.
    pub fn read_all(&mut self) -> Vec<u8> {
        let mut out = vec![0u8; self.readable()];
        self.read_bytes(&mut out).expect("readable() bytes are always available");
        out
    }

    pub fn read_string(&mut self, n: usize) -> Result<String, Error> {
        let mut raw = vec![0u8; n];
        self.read_bytes(&mut raw)?;
        String::from_utf8(raw).map_err(|_| Error::InvalidUtf8)
    }

    /// Consume up to and including the first byte that matches any byte in
    /// `delim`, returning the bytes read before the delimiter. Fails if no
    /// such byte exists in the readable region.
    pub fn read_string_delimited(&mut self, delim: &[u8]) -> Result<String, Error> {
        let readable = self.readable();
        let window = self.peek_bytes(0, readable)?;
        let pos = window
            .iter()
            .position(|b| delim.contains(b))
            .ok_or(Error::DelimiterNotFound)?;

        let out = self.read_string(pos)?;

        let mut skip = [0u8; 1];
        self.read_bytes(&mut skip)?;

        Ok(out)
    }
}

macro_rules! impl_scalar_ops {
    ($( $ty:ty => $write:ident, $read:ident, $peek:ident, $update:ident );* $(;)?) => {
        impl ByteBuffer {
            $(
                pub fn $write(&mut self, v: $ty) -> Result<(), Error> {
                    self.reserve(std::mem::size_of::<$ty>())?;
                    self.write_bytes(&v.to_ne_bytes())
                }

                pub fn $read(&mut self) -> Result<$ty, Error> {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    self.read_bytes(&mut raw)?;
                    Ok(<$ty>::from_ne_bytes(raw))
                }

                pub fn $peek(&self, offset: usize) -> Result<$ty, Error> {
                    let raw = self.peek_bytes(offset, std::mem::size_of::<$ty>())?;
                    Ok(<$ty>::from_ne_bytes(raw.try_into().unwrap()))
                }

                pub fn $update(&mut self, offset: usize, v: $ty) -> Result<(), Error> {
                    self.update_bytes(offset, &v.to_ne_bytes())
                }
            )*
        }
    };
}

impl_scalar_ops! {
    u8 => write_u8, read_u8, peek_u8, update_u8;
    i8 => write_i8, read_i8, peek_i8, update_i8;
    u16 => write_u16, read_u16, peek_u16, update_u16;
    i16 => write_i16, read_i16, peek_i16, update_i16;
    u32 => write_u32, read_u32, peek_u32, update_u32;
    i32 => write_i32, read_i32, peek_i32, update_i32;
    u64 => write_u64, read_u64, peek_u64, update_u64;
    i64 => write_i64, read_i64, peek_i64, update_i64;
    f32 => write_f32, read_f32, peek_f32, update_f32;
    f64 => write_f64, read_f64, peek_f64, update_f64;
}

impl ByteBuffer {
    pub fn write_bool(&mut self, v: bool) -> Result<(), Error> {
        self.write_u8(v as u8)
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? != 0)
    }

    pub fn peek_bool(&self, offset: usize) -> Result<bool, Error> {
        Ok(self.peek_u8(offset)? != 0)
    }
}
