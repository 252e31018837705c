//! Raw device-memory buffers and the typed constant-buffer view.

use crate::gfx::errors::{Error, Result};

impl_handle!(GpuBufferHandle);
impl_handle!(ConstantBufferHandle);

/// The setup parameters of a raw GPU buffer object.
#[derive(Debug, Copy, Clone)]
pub struct GpuBufferParams {
    /// The size of the buffer storage in bytes. Fixed at creation.
    pub len: usize,
    /// Hint about the intended update strategy of the data.
    pub usage: BufferUsage,
    /// Which CPU-side operations the buffer supports after creation.
    pub access: BufferAccess,
}

impl Default for GpuBufferParams {
    fn default() -> Self {
        GpuBufferParams {
            len: 0,
            usage: BufferUsage::Default,
            access: BufferAccess::WRITE,
        }
    }
}

impl GpuBufferParams {
    /// Checks that `[offset, offset + len)` lies inside the buffer storage.
    /// Out-of-range operations are rejected before any byte is touched.
    pub fn validate_range(&self, offset: usize, len: usize) -> Result<()> {
        let end = offset.checked_add(len).ok_or(Error::OutOfRange {
            offset,
            end: usize::max_value(),
            len: self.len,
        })?;

        if end > self.len {
            return Err(Error::OutOfRange {
                offset,
                end,
                len: self.len,
            });
        }

        Ok(())
    }
}

/// Hint about the intended update strategy of buffer data. This only affects
/// where the driver places the storage, never the logical contents.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum BufferUsage {
    /// The contents are written rarely, ideally once at creation.
    Default,
    /// The contents will be updated by the CPU frequently, but not every
    /// frame.
    Dynamic,
    /// The contents are streamed: written by the CPU roughly once per frame.
    Stream,
}

/// Which CPU-side operations a buffer supports. Stored as a bitmask so a
/// buffer can be created read-write.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct BufferAccess(u8);

impl BufferAccess {
    pub const NONE: BufferAccess = BufferAccess(0);
    pub const WRITE: BufferAccess = BufferAccess(0b01);
    pub const READ: BufferAccess = BufferAccess(0b10);
    pub const READ_WRITE: BufferAccess = BufferAccess(0b11);

    #[inline]
    pub fn writable(self) -> bool {
        self.0 & Self::WRITE.0 != 0
    }

    #[inline]
    pub fn readable(self) -> bool {
        self.0 & Self::READ.0 != 0
    }
}

impl ::std::ops::BitOr for BufferAccess {
    type Output = BufferAccess;

    fn bitor(self, rhs: Self) -> Self {
        BufferAccess(self.0 | rhs.0)
    }
}

/// How a transient write/read mapping of a buffer sub-range is hinted to the
/// driver. The hint changes synchronization behavior only, never the logical
/// result; an `Unsynchronized` write into a range still read by an in-flight
/// draw yields an undefined visible result, not a crash.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MapAccess {
    /// The whole previous contents may be discarded.
    WriteDiscardAll,
    /// Only the mapped range may be discarded.
    WriteDiscardRange,
    /// The driver must not block on in-flight draws reading the buffer.
    WriteUnsynchronized,
    /// Read-only mapping.
    ReadOnly,
}

impl MapAccess {
    #[inline]
    pub fn is_write(self) -> bool {
        self != MapAccess::ReadOnly
    }
}

/// The setup parameters of a constant (uniform) buffer. A constant buffer is
/// a `GpuBuffer` constrained to a fixed stride so whole structures can be
/// addressed by index.
#[derive(Debug, Copy, Clone)]
pub struct ConstantBufferParams {
    /// The size in bytes of one constant block.
    pub stride: usize,
    /// The number of constant blocks.
    pub count: usize,
    /// Hint about the intended update strategy of the data.
    pub usage: BufferUsage,
}

impl ConstantBufferParams {
    /// The derived byte length of the underlying buffer storage.
    #[inline]
    pub fn len(&self) -> usize {
        self.stride * self.count
    }

    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(Error::Allocation(
                "ConstantBuffer",
                "stride must be non-zero".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn range_validation() {
        let params = GpuBufferParams {
            len: 256,
            ..Default::default()
        };

        assert!(params.validate_range(0, 256).is_ok());
        assert!(params.validate_range(255, 1).is_ok());
        assert!(params.validate_range(0, 0).is_ok());
        assert!(params.validate_range(0, 257).is_err());
        assert!(params.validate_range(256, 1).is_err());
        assert!(params.validate_range(usize::max_value(), 2).is_err());
    }

    #[test]
    fn access_flags() {
        assert!(BufferAccess::WRITE.writable());
        assert!(!BufferAccess::WRITE.readable());
        assert!(BufferAccess::READ_WRITE.readable());
        assert_eq!(BufferAccess::READ | BufferAccess::WRITE, BufferAccess::READ_WRITE);
    }
}
