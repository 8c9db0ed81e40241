//! # Wire Codec
//!
//! Fixed-format little-endian reader/writer over a caller-provided buffer.
//!
//! ## Design
//!
//! - The writer borrows a slice from the tick arena, the reader borrows the
//!   received message; neither allocates
//! - Every field has an explicit size, there are no tags or lengths except
//!   for strings and blobs
//! - Running past either end is an error and leaves the cursor untouched,
//!   nothing is ever truncated
//!
//! ```text
//! bool  1   u8 1   u16 2   i32/u32/f32 4   u64 8   Vec3 12   Color 4
//! str   1 + len (len <= 255)         blob  2 + len (len <= 65535)
//! ```

use crate::error::{CodecError, CodecResult};
use tether_shared::{Color, EntityId, PeerId, Vec3};

/// Encoded size of a [`Vec3`].
pub const VEC3_SIZE: usize = std::mem::size_of::<Vec3>();

/// Writes fields into a fixed buffer.
pub struct Writer<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> Writer<'a> {
    /// Wraps `buffer`, starting at offset zero.
    #[must_use]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.position
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Bytes still available.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Copies raw bytes.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if the bytes do not fit.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let remaining = self.remaining();
        if bytes.len() > remaining {
            return Err(CodecError::WriteOverflow {
                needed: bytes.len(),
                remaining,
            });
        }
        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }

    /// Writes a single byte.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if the buffer is full.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.write_bytes(&[value])
    }

    /// Writes a bool as a full byte.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if the buffer is full.
    #[inline]
    pub fn write_bool(&mut self, value: bool) -> CodecResult<()> {
        self.write_u8(u8::from(value))
    }

    /// Writes a u16.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if it does not fit.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> CodecResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes an i32.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if it does not fit.
    #[inline]
    pub fn write_i32(&mut self, value: i32) -> CodecResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a u32.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if it does not fit.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> CodecResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes an f32 by its raw bits.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if it does not fit.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> CodecResult<()> {
        self.write_u32(value.to_bits())
    }

    /// Writes a u64.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if it does not fit.
    #[inline]
    pub fn write_u64(&mut self, value: u64) -> CodecResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a peer identifier.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if it does not fit.
    #[inline]
    pub fn write_peer(&mut self, peer: PeerId) -> CodecResult<()> {
        self.write_u64(peer.0)
    }

    /// Writes an entity identifier.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if it does not fit.
    #[inline]
    pub fn write_entity(&mut self, id: EntityId) -> CodecResult<()> {
        self.write_u64(id.0)
    }

    /// Writes three floats.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if the vector does not fit. Nothing is
    /// written in that case.
    pub fn write_vec3(&mut self, value: Vec3) -> CodecResult<()> {
        let mut bytes = [0u8; VEC3_SIZE];
        bytes[0..4].copy_from_slice(&value.x.to_bits().to_le_bytes());
        bytes[4..8].copy_from_slice(&value.y.to_bits().to_le_bytes());
        bytes[8..12].copy_from_slice(&value.z.to_bits().to_le_bytes());
        self.write_bytes(&bytes)
    }

    /// Writes a packed color.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if it does not fit.
    #[inline]
    pub fn write_color(&mut self, value: Color) -> CodecResult<()> {
        self.write_u32(value.0)
    }

    /// Writes a string with a one-byte length prefix.
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidString`] if longer than 255 bytes,
    /// [`CodecError::WriteOverflow`] if it does not fit.
    pub fn write_str(&mut self, value: &str) -> CodecResult<()> {
        let len = u8::try_from(value.len()).map_err(|_| CodecError::InvalidString)?;
        let needed = 1 + value.len();
        if needed > self.remaining() {
            return Err(CodecError::WriteOverflow {
                needed,
                remaining: self.remaining(),
            });
        }
        self.write_u8(len)?;
        self.write_bytes(value.as_bytes())
    }

    /// Writes a byte blob with a two-byte length prefix.
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidString`] if longer than 65535 bytes,
    /// [`CodecError::WriteOverflow`] if it does not fit.
    pub fn write_blob(&mut self, value: &[u8]) -> CodecResult<()> {
        let len = u16::try_from(value.len()).map_err(|_| CodecError::InvalidString)?;
        let needed = 2 + value.len();
        if needed > self.remaining() {
            return Err(CodecError::WriteOverflow {
                needed,
                remaining: self.remaining(),
            });
        }
        self.write_u16(len)?;
        self.write_bytes(value)
    }
}

/// Reads fields from a received message.
pub struct Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    /// Wraps `data`, starting at offset zero.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Returns remaining bytes.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns true once every byte has been consumed.
    #[inline]
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Bytes consumed so far.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Takes the next `len` bytes.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] if fewer than `len` bytes remain.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(CodecError::ReadOverflow {
                needed: len,
                remaining,
            });
        }
        let data: &'a [u8] = self.data;
        let bytes = &data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] at the end of the message.
    #[inline]
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a bool stored as a full byte.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] at the end of the message,
    /// [`CodecError::UnknownEnum`] for bytes other than 0 and 1.
    pub fn read_bool(&mut self) -> CodecResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(CodecError::UnknownEnum {
                what: "bool",
                value,
            }),
        }
    }

    /// Reads a u16.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] if truncated.
    #[inline]
    pub fn read_u16(&mut self) -> CodecResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Reads an i32.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] if truncated.
    #[inline]
    pub fn read_i32(&mut self) -> CodecResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Reads a u32.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] if truncated.
    #[inline]
    pub fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Reads an f32 from its raw bits.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] if truncated.
    #[inline]
    pub fn read_f32(&mut self) -> CodecResult<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads a u64.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] if truncated.
    #[inline]
    pub fn read_u64(&mut self) -> CodecResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads a peer identifier.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] if truncated.
    #[inline]
    pub fn read_peer(&mut self) -> CodecResult<PeerId> {
        self.read_u64().map(PeerId)
    }

    /// Reads an entity identifier.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] if truncated.
    #[inline]
    pub fn read_entity(&mut self) -> CodecResult<EntityId> {
        self.read_u64().map(EntityId)
    }

    /// Reads three floats.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] if truncated. The cursor does not move.
    pub fn read_vec3(&mut self) -> CodecResult<Vec3> {
        let bytes: [u8; VEC3_SIZE] = self.read_array()?;
        let component =
            |i: usize| f32::from_bits(u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]));
        Ok(Vec3::new(component(0), component(4), component(8)))
    }

    /// Reads a packed color.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] if truncated.
    #[inline]
    pub fn read_color(&mut self) -> CodecResult<Color> {
        self.read_u32().map(Color)
    }

    /// Reads a string with a one-byte length prefix.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] if truncated,
    /// [`CodecError::InvalidString`] if not UTF-8.
    pub fn read_str(&mut self) -> CodecResult<&'a str> {
        let start = self.position;
        let len = usize::from(self.read_u8()?);
        let bytes = match self.read_bytes(len) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.position = start;
                return Err(err);
            }
        };
        std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidString)
    }

    /// Reads a byte blob with a two-byte length prefix.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] if truncated.
    pub fn read_blob(&mut self) -> CodecResult<&'a [u8]> {
        let start = self.position;
        let len = usize::from(self.read_u16()?);
        let result = self.read_bytes(len);
        if result.is_err() {
            self.position = start;
        }
        result
    }
}
