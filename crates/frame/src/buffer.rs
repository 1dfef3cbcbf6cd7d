use crate::format::PixelFormat;
use common::{Result, UvcError};
use std::time::Duration;

/// Geometry and format header carried by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Row stride in bytes, 0 when packed or compressed.
    pub step: u32,
    pub sequence: u32,
    pub timestamp: Duration,
}

impl FrameInfo {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            step: format.packed_step(width),
            ..Default::default()
        }
    }
}

/// Borrowed view of a frame whose storage belongs to someone else, e.g. a
/// memory-mapped driver buffer handed out by a frame source.
#[derive(Debug, Clone, Copy)]
pub struct FrameRef<'a> {
    pub info: FrameInfo,
    pub data: &'a [u8],
    pub metadata: Option<&'a [u8]>,
}

impl<'a> FrameRef<'a> {
    pub fn new(info: FrameInfo, data: &'a [u8]) -> Self {
        Self {
            info,
            data,
            metadata: None,
        }
    }
}

/// Resizable byte buffer tagged with a [`FrameInfo`] header.
///
/// `len()` is the valid payload, `capacity()` the allocated storage. Storage
/// only ever grows, and only when the buffer owns it.
#[derive(Debug)]
pub struct FrameBuffer {
    pub info: FrameInfo,
    data: Vec<u8>,
    len: usize,
    owns_storage: bool,
    metadata: Option<Vec<u8>>,
}

impl FrameBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| UvcError::NoMemory {
                requested: capacity,
            })?;
        data.resize(capacity, 0);
        Ok(Self {
            info: FrameInfo::default(),
            data,
            len: 0,
            owns_storage: true,
            metadata: None,
        })
    }

    /// Wrap caller-supplied storage. The buffer will never reallocate it.
    pub fn from_storage(storage: Vec<u8>, info: FrameInfo) -> Self {
        let len = storage.len();
        Self {
            info,
            data: storage,
            len,
            owns_storage: false,
            metadata: None,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn owns_storage(&self) -> bool {
        self.owns_storage
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    pub fn metadata(&self) -> Option<&[u8]> {
        self.metadata.as_deref().filter(|m| !m.is_empty())
    }

    pub fn set_metadata(&mut self, metadata: Option<&[u8]>) {
        match metadata {
            Some(src) => {
                let buf = self.metadata.get_or_insert_with(Vec::new);
                buf.clear();
                buf.extend_from_slice(src);
            }
            None => {
                if let Some(buf) = self.metadata.as_mut() {
                    buf.clear();
                }
            }
        }
    }

    /// Set the payload length to exactly `bytes`, growing owned storage when
    /// needed. Caller-supplied storage that is too small yields `NoMemory`.
    pub fn ensure_size(&mut self, bytes: usize) -> Result<()> {
        if bytes > self.data.len() {
            if !self.owns_storage {
                return Err(UvcError::NoMemory { requested: bytes });
            }
            let extra = bytes - self.data.len();
            self.data
                .try_reserve_exact(extra)
                .map_err(|_| UvcError::NoMemory { requested: bytes })?;
            self.data.resize(bytes, 0);
        }
        self.len = bytes;
        Ok(())
    }

    /// Duplicate `src` (payload, header and metadata) into this buffer.
    pub fn copy_from(&mut self, src: &FrameRef<'_>) -> Result<()> {
        self.ensure_size(src.data.len())?;
        self.data[..src.data.len()].copy_from_slice(src.data);
        self.info = src.info;
        self.set_metadata(src.metadata);
        Ok(())
    }

    pub fn as_frame_ref(&self) -> FrameRef<'_> {
        FrameRef {
            info: self.info,
            data: self.data(),
            metadata: self.metadata(),
        }
    }
}
