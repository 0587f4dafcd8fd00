//! Chroma denoise kernel.
//!
//! Luma-preserving noise reduction: the image is split into BT.601 luma and
//! chroma, the chroma planes get a separable box blur whose radius grows
//! with the strength setting, and the planes are recombined. Luma is never
//! touched, so edges stay sharp while color speckle averages out.

use crate::isp::frame::Frame;

const KR: f32 = 0.299;
const KG: f32 = 0.587;
const KB: f32 = 0.114;
const CB_SCALE: f32 = 0.564;
const CR_SCALE: f32 = 0.713;

pub fn chroma_denoise(frame: &mut Frame, strength: f32) {
    if strength <= 0.0 || frame.channels != 3 {
        return;
    }
    let radius = strength.ceil() as usize;
    let (w, h) = (frame.width, frame.height);

    let mut luma = vec![0.0f32; w * h];
    let mut cb = vec![0.0f32; w * h];
    let mut cr = vec![0.0f32; w * h];
    for i in 0..w * h {
        let r = frame.data[i * 3];
        let g = frame.data[i * 3 + 1];
        let b = frame.data[i * 3 + 2];
        let y = KR * r + KG * g + KB * b;
        luma[i] = y;
        cb[i] = (b - y) * CB_SCALE;
        cr[i] = (r - y) * CR_SCALE;
    }

    box_blur(&mut cb, w, h, radius);
    box_blur(&mut cr, w, h, radius);

    for i in 0..w * h {
        let y = luma[i];
        let r = y + cr[i] / CR_SCALE;
        let b = y + cb[i] / CB_SCALE;
        let g = (y - KR * r - KB * b) / KG;
        frame.data[i * 3] = r;
        frame.data[i * 3 + 1] = g;
        frame.data[i * 3 + 2] = b;
    }
}

/// Separable box blur with clamped borders.
fn box_blur(plane: &mut [f32], w: usize, h: usize, radius: usize) {
    let r = radius as i32;
    let mut tmp = vec![0.0f32; plane.len()];

    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0;
            for dx in -r..=r {
                let nx = (x as i32 + dx).clamp(0, w as i32 - 1) as usize;
                sum += plane[y * w + nx];
            }
            tmp[y * w + x] = sum / (2 * r + 1) as f32;
        }
    }
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0;
            for dy in -r..=r {
                let ny = (y as i32 + dy).clamp(0, h as i32 - 1) as usize;
                sum += tmp[ny * w + x];
            }
            plane[y * w + x] = sum / (2 * r + 1) as f32;
        }
    }
}
