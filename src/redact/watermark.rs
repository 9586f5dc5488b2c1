//! Privacy watermark overlay.
//!
//! Every redacted frame carries a fixed banner: a semi-transparent dark
//! rectangle in the top-left corner with the text "PRIVACY MODE: ON". The
//! banner is drawn unconditionally, faces found or not, so output footage is
//! always identifiable as processed. Text comes from a small built-in 5x7
//! stencil; this is a fixed overlay, not general text rendering.

use crate::frame::Frame;

const BANNER_X0: u32 = 10;
const BANNER_Y0: u32 = 10;
const BANNER_X1: u32 = 280;
const BANNER_Y1: u32 = 50;
const BANNER_ALPHA: f32 = 0.7;

const TEXT: &str = "PRIVACY MODE: ON";
const TEXT_COLOR: [u8; 3] = [0, 255, 0];
const TEXT_X0: u32 = 20;
const TEXT_Y0: u32 = 23;
const GLYPH_SCALE: u32 = 2;

/// Draw the banner onto the frame in place. Safe on frames smaller than the
/// banner; drawing is clipped to the frame.
pub fn apply_watermark(frame: &mut Frame) {
    let x1 = BANNER_X1.min(frame.width);
    let y1 = BANNER_Y1.min(frame.height);
    for y in BANNER_Y0.min(y1)..y1 {
        for x in BANNER_X0.min(x1)..x1 {
            let offset = frame.pixel_offset(x, y);
            for c in 0..3 {
                let v = f32::from(frame.pixels[offset + c]);
                frame.pixels[offset + c] = (v * (1.0 - BANNER_ALPHA)) as u8;
            }
        }
    }

    let mut pen_x = TEXT_X0;
    for ch in TEXT.chars() {
        draw_glyph(frame, ch, pen_x, TEXT_Y0);
        pen_x += 6 * GLYPH_SCALE;
    }
}

fn draw_glyph(frame: &mut Frame, ch: char, x0: u32, y0: u32) {
    let Some(rows) = glyph(ch) else {
        return;
    };
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..5u32 {
            if bits & (0x10 >> col) == 0 {
                continue;
            }
            for dy in 0..GLYPH_SCALE {
                for dx in 0..GLYPH_SCALE {
                    let x = x0 + col * GLYPH_SCALE + dx;
                    let y = y0 + row as u32 * GLYPH_SCALE + dy;
                    if x >= frame.width || y >= frame.height {
                        continue;
                    }
                    let offset = frame.pixel_offset(x, y);
                    frame.pixels[offset..offset + 3].copy_from_slice(&TEXT_COLOR);
                }
            }
        }
    }
}

/// 5x7 rows, MSB-left in the low 5 bits. Only the characters the banner
/// needs.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'I' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x1F],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        ':' => [0x00, 0x04, 0x00, 0x00, 0x00, 0x04, 0x00],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![255u8; (width * height * 3) as usize], width, height, 1).unwrap()
    }

    #[test]
    fn banner_darkens_its_rectangle() {
        let mut frame = white_frame(640, 480);
        apply_watermark(&mut frame);

        // Inside the banner but away from text rows.
        let inside = frame.pixel_offset(270, 12);
        assert!(frame.pixels[inside] < 100);
        // Outside stays white.
        let outside = frame.pixel_offset(300, 12);
        assert_eq!(frame.pixels[outside], 255);
        let below = frame.pixel_offset(20, 60);
        assert_eq!(frame.pixels[below], 255);
    }

    #[test]
    fn banner_contains_green_text_pixels() {
        let mut frame = white_frame(640, 480);
        apply_watermark(&mut frame);

        let mut green = 0usize;
        for y in BANNER_Y0..BANNER_Y1 {
            for x in BANNER_X0..BANNER_X1 {
                let offset = frame.pixel_offset(x, y);
                if frame.pixels[offset..offset + 3] == TEXT_COLOR {
                    green += 1;
                }
            }
        }
        assert!(green > 100, "expected text pixels, found {green}");
    }

    #[test]
    fn tiny_frames_are_clipped_not_panicked() {
        let mut frame = white_frame(16, 16);
        apply_watermark(&mut frame);
        let corner = frame.pixel_offset(12, 12);
        assert!(frame.pixels[corner] < 255);
    }
}
