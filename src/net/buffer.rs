//! Frame buffer implementation
//!
//! Accumulates bytes read from a socket and splits them into NUL-delimited
//! XT frames. A partial frame stays buffered until the rest arrives.

use bytes::{Buf, BytesMut};

use crate::error::{ProtocolError, Result};
use crate::protocol::xt::DELIMITER;

/// Maximum frame size (8KB)
pub const MAX_FRAME_SIZE: usize = 8192;

/// Buffer for inbound frames
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    /// Bytes not yet split into frames
    data: BytesMut,
    /// Largest frame accepted
    max_frame: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::with_max_frame(MAX_FRAME_SIZE)
    }

    /// Create a buffer with a custom frame limit
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(max_frame.min(4096)),
            max_frame,
        }
    }

    /// Append bytes read from the socket
    pub fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Number of buffered bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take the next complete frame, skipping empty ones.
    ///
    /// Returns `Ok(None)` when no complete frame is buffered yet and an error
    /// once a frame grows past the limit without a delimiter.
    pub fn next_frame(&mut self) -> Result<Option<String>> {
        loop {
            let Some(end) = self.data.iter().position(|b| *b == DELIMITER) else {
                if self.data.len() > self.max_frame {
                    let size = self.data.len();
                    self.data.clear();
                    return Err(ProtocolError::PacketTooLarge {
                        size,
                        max: self.max_frame,
                    }
                    .into());
                }
                return Ok(None);
            };

            if end > self.max_frame {
                self.data.advance(end + 1);
                return Err(ProtocolError::PacketTooLarge {
                    size: end,
                    max: self.max_frame,
                }
                .into());
            }

            let frame = self.data.split_to(end);
            self.data.advance(1);

            if frame.is_empty() {
                continue;
            }
            return Ok(Some(String::from_utf8_lossy(&frame).into_owned()));
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_frames() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(b"%xt%s%j#js%-1%pingu%\0%xt%s%j#jr%-1%100%\0");

        assert_eq!(
            buffer.next_frame().unwrap().as_deref(),
            Some("%xt%s%j#js%-1%pingu%")
        );
        assert_eq!(
            buffer.next_frame().unwrap().as_deref(),
            Some("%xt%s%j#jr%-1%100%")
        );
        assert_eq!(buffer.next_frame().unwrap(), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_frame() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(b"%xt%s%i#a");
        assert_eq!(buffer.next_frame().unwrap(), None);

        buffer.extend(b"i%-1%413%\0");
        assert_eq!(
            buffer.next_frame().unwrap().as_deref(),
            Some("%xt%s%i#ai%-1%413%")
        );
    }

    #[test]
    fn test_empty_frames_skipped() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(b"\0\0abc\0");
        assert_eq!(buffer.next_frame().unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_oversized_frame() {
        let mut buffer = FrameBuffer::with_max_frame(8);
        buffer.extend(b"0123456789");
        assert!(buffer.next_frame().is_err());
        assert!(buffer.is_empty());

        buffer.extend(b"0123456789\0ok\0");
        assert!(buffer.next_frame().is_err());
        assert_eq!(buffer.next_frame().unwrap().as_deref(), Some("ok"));
    }
}
