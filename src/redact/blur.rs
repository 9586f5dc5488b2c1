//! Region blur.
//!
//! Gaussian blur approximated by three successive box blurs, which is
//! separable and runs in time independent of sigma. Only the requested
//! region is touched; the rest of the frame is left byte-identical.

use crate::detect::BoundingBox;
use crate::frame::Frame;

/// Blur a rectangular region of the frame in place. The region is clamped to
/// the frame bounds; a region entirely outside the frame is a no-op.
pub fn blur_region(frame: &mut Frame, region: &BoundingBox, sigma: f32) {
    let Some((x0, y0, x1, y1)) = clamp_region(region, frame.width, frame.height) else {
        return;
    };
    let region_w = x1 - x0;
    let region_h = y1 - y0;

    // Copy the region out, blur it, write it back. Keeps the pass bounds
    // simple at the cost of one allocation per face.
    let mut patch = vec![0u8; region_w * region_h * 3];
    for row in 0..region_h {
        let src = frame.pixel_offset((x0) as u32, (y0 + row) as u32);
        let dst = row * region_w * 3;
        patch[dst..dst + region_w * 3].copy_from_slice(&frame.pixels[src..src + region_w * 3]);
    }

    let mut scratch = patch.clone();
    for radius in boxes_for_gauss(sigma) {
        box_blur_horizontal(&patch, &mut scratch, region_w, region_h, radius);
        box_blur_vertical(&scratch, &mut patch, region_w, region_h, radius);
    }

    for row in 0..region_h {
        let dst = frame.pixel_offset((x0) as u32, (y0 + row) as u32);
        let src = row * region_w * 3;
        frame.pixels[dst..dst + region_w * 3].copy_from_slice(&patch[src..src + region_w * 3]);
    }
}

fn clamp_region(region: &BoundingBox, width: u32, height: u32) -> Option<(usize, usize, usize, usize)> {
    let x0 = region.x.max(0.0) as usize;
    let y0 = region.y.max(0.0) as usize;
    let x1 = ((region.x + region.w).max(0.0) as usize).min(width as usize);
    let y1 = ((region.y + region.h).max(0.0) as usize).min(height as usize);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0, y0, x1, y1))
}

/// Box radii whose triple application approximates a Gaussian of the given
/// sigma (ideal averaging filter width, Wells 1986).
fn boxes_for_gauss(sigma: f32) -> [usize; 3] {
    let n = 3.0f32;
    let w_ideal = (12.0 * sigma * sigma / n + 1.0).sqrt();
    let mut wl = w_ideal.floor() as i32;
    if wl % 2 == 0 {
        wl -= 1;
    }
    let wl = wl.max(1);
    let wu = wl + 2;
    let m_ideal = (12.0 * sigma * sigma - (n * wl as f32 * wl as f32)
        - 4.0 * n * wl as f32
        - 3.0 * n)
        / (-4.0 * wl as f32 - 4.0);
    let m = m_ideal.round() as i32;

    let mut radii = [0usize; 3];
    for (i, radius) in radii.iter_mut().enumerate() {
        let w = if (i as i32) < m { wl } else { wu };
        *radius = ((w - 1) / 2).max(0) as usize;
    }
    radii
}

/// Sliding-window box blur along rows. Edges are clamped, so the window is
/// always full.
fn box_blur_horizontal(src: &[u8], dst: &mut [u8], width: usize, height: usize, radius: usize) {
    if radius == 0 {
        dst.copy_from_slice(src);
        return;
    }
    let span = (2 * radius + 1) as u32;
    for y in 0..height {
        for c in 0..3 {
            let sample = |x: isize| -> u32 {
                let sx = x.clamp(0, width as isize - 1) as usize;
                u32::from(src[(y * width + sx) * 3 + c])
            };
            let mut sum: u32 = 0;
            for x in -(radius as isize)..=(radius as isize) {
                sum += sample(x);
            }
            for x in 0..width {
                dst[(y * width + x) * 3 + c] = (sum / span) as u8;
                sum += sample(x as isize + radius as isize + 1);
                sum -= sample(x as isize - radius as isize);
            }
        }
    }
}

/// Sliding-window box blur along columns.
fn box_blur_vertical(src: &[u8], dst: &mut [u8], width: usize, height: usize, radius: usize) {
    if radius == 0 {
        dst.copy_from_slice(src);
        return;
    }
    let span = (2 * radius + 1) as u32;
    for x in 0..width {
        for c in 0..3 {
            let sample = |y: isize| -> u32 {
                let sy = y.clamp(0, height as isize - 1) as usize;
                u32::from(src[(sy * width + x) * 3 + c])
            };
            let mut sum: u32 = 0;
            for y in -(radius as isize)..=(radius as isize) {
                sum += sample(y);
            }
            for y in 0..height {
                dst[(y * width + x) * 3 + c] = (sum / span) as u8;
                sum += sample(y as isize + radius as isize + 1);
                sum -= sample(y as isize - radius as isize);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn striped_frame(width: u32, height: u32) -> Frame {
        let mut pixels = vec![0u8; (width * height * 3) as usize];
        for y in 0..height {
            for x in 0..width {
                let v = if x % 2 == 0 { 255 } else { 0 };
                let offset = ((y * width + x) * 3) as usize;
                pixels[offset..offset + 3].copy_from_slice(&[v, v, v]);
            }
        }
        Frame::new(pixels, width, height, 1).unwrap()
    }

    #[test]
    fn pixels_outside_the_region_are_untouched() {
        let mut frame = striped_frame(64, 64);
        let before = frame.pixels.clone();
        blur_region(&mut frame, &BoundingBox::new(16.0, 16.0, 16.0, 16.0), 8.0);

        let outside = frame.pixel_offset(0, 0);
        assert_eq!(frame.pixels[outside], before[outside]);
        let far = frame.pixel_offset(60, 60);
        assert_eq!(frame.pixels[far], before[far]);
    }

    #[test]
    fn blurred_region_loses_contrast() {
        let mut frame = striped_frame(64, 64);
        blur_region(&mut frame, &BoundingBox::new(8.0, 8.0, 32.0, 32.0), 8.0);

        // Alternating 0/255 stripes average toward the middle.
        let inside = frame.pixel_offset(20, 20);
        let v = frame.pixels[inside];
        assert!(v > 40 && v < 220, "expected mid-range after blur, got {v}");
    }

    #[test]
    fn out_of_bounds_region_is_a_no_op() {
        let mut frame = striped_frame(16, 16);
        let before = frame.pixels.clone();
        blur_region(&mut frame, &BoundingBox::new(100.0, 100.0, 50.0, 50.0), 8.0);
        assert_eq!(frame.pixels, before);
    }

    #[test]
    fn negative_origin_is_clamped() {
        let mut frame = striped_frame(32, 32);
        blur_region(&mut frame, &BoundingBox::new(-10.0, -10.0, 20.0, 20.0), 4.0);
        let inside = frame.pixel_offset(4, 4);
        let v = frame.pixels[inside];
        assert!(v > 40 && v < 220);
    }
}
