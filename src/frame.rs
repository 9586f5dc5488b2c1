//! Decoded frame container.
//!
//! Frames are tightly-packed RGB24 buffers at the source's native resolution.
//! The ingestion layer produces them; detection and redaction consume them.
//! A frame carries its index within the source so alerts and timestamps can
//! reference actual frame positions rather than a compacted sample counter.

use anyhow::{anyhow, Result};

/// One decoded video frame, RGB24, row-major, no padding between rows.
#[derive(Clone, Debug)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// 1-based index within the source video.
    pub index: u64,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, index: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            index,
        })
    }

    /// Byte offset of the pixel at (x, y). Callers must stay in bounds.
    #[inline]
    pub fn pixel_offset(&self, x: u32, y: u32) -> usize {
        ((y as usize * self.width as usize) + x as usize) * 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_pixel_buffers() {
        assert!(Frame::new(vec![0u8; 10], 4, 4, 1).is_err());
        assert!(Frame::new(vec![0u8; 48], 4, 4, 1).is_ok());
    }

    #[test]
    fn pixel_offset_is_row_major_rgb() {
        let frame = Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 1).unwrap();
        assert_eq!(frame.pixel_offset(0, 0), 0);
        assert_eq!(frame.pixel_offset(1, 0), 3);
        assert_eq!(frame.pixel_offset(0, 1), 12);
    }
}
