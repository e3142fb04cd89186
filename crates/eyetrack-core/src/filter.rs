//! Grayscale filters used to binarize frames before boundary search.
//!
//! All filters read a [`GrayImageView`] and return a fresh [`GrayImage`] of
//! the same size. Borders follow the usual conventions of the classic
//! OpenCV counterparts: erosion ignores out-of-frame neighbours, the
//! Gaussian blur reflects (`reflect101`).

use crate::{GrayImage, GrayImageView};

/// Threshold direction used by [`threshold_u8`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Binarization {
    /// `v > t` → 255, else 0. Bright targets become foreground.
    Direct,
    /// `v > t` → 0, else 255. Dark targets become foreground.
    Inverse,
}

/// 3x3 grayscale erosion (minimum filter).
pub fn erode3x3_u8(src: &GrayImageView<'_>) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let mut out = GrayImage::new_fill(w, h, 0);
    for y in 0..h {
        let y0 = y.saturating_sub(1);
        let y1 = (y + 1).min(h - 1);
        for x in 0..w {
            let x0 = x.saturating_sub(1);
            let x1 = (x + 1).min(w - 1);
            let mut m = u8::MAX;
            for ny in y0..=y1 {
                let row = &src.data[ny * w..(ny + 1) * w];
                for &v in &row[x0..=x1] {
                    m = m.min(v);
                }
            }
            out.data[y * w + x] = m;
        }
    }
    out
}

/// Normalized 1D Gaussian kernel for an odd aperture.
///
/// With `sigma <= 0` the sigma is derived from the aperture as
/// `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel(ksize: usize, sigma: f32) -> Vec<f32> {
    let ksize = odd_aperture(ksize);
    if ksize == 1 {
        return vec![1.0];
    }
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let radius = (ksize / 2) as isize;
    let sigma2 = sigma * sigma;
    let mut g: Vec<f32> = (-radius..=radius)
        .map(|i| {
            let x = i as f32;
            (-(x * x) / (2.0 * sigma2)).exp()
        })
        .collect();
    let sum: f32 = g.iter().sum();
    for gi in &mut g {
        *gi /= sum;
    }
    g
}

/// Separable Gaussian blur with independent horizontal/vertical apertures.
pub fn gaussian_blur_u8(src: &GrayImageView<'_>, kx: usize, ky: usize) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let kernel_x = gaussian_kernel(kx, 0.0);
    let kernel_y = gaussian_kernel(ky, 0.0);
    let rx = (kernel_x.len() / 2) as isize;
    let ry = (kernel_y.len() / 2) as isize;

    let mut tmp = vec![0.0f32; w * h];
    for y in 0..h {
        let row = &src.data[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, &kv) in kernel_x.iter().enumerate() {
                let idx = reflect101(x as isize + k as isize - rx, w);
                acc += row[idx] as f32 * kv;
            }
            tmp[y * w + x] = acc;
        }
    }

    let mut out = GrayImage::new_fill(w, h, 0);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, &kv) in kernel_y.iter().enumerate() {
                let idx = reflect101(y as isize + k as isize - ry, h);
                acc += tmp[idx * w + x] * kv;
            }
            out.data[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Binary threshold producing `{0, 255}`.
pub fn threshold_u8(src: &GrayImageView<'_>, threshold: f64, mode: Binarization) -> GrayImage {
    let (fg, bg) = match mode {
        Binarization::Direct => (255u8, 0u8),
        Binarization::Inverse => (0u8, 255u8),
    };
    let data = src
        .data
        .iter()
        .map(|&v| if v as f64 > threshold { fg } else { bg })
        .collect();
    GrayImage {
        width: src.width,
        height: src.height,
        data,
    }
}

/// Rotate a frame about its center by `angle_deg` (counter-clockwise on
/// screen), nearest-neighbour sampling, uncovered pixels set to 0.
pub fn rotate_nearest_u8(src: &GrayImageView<'_>, angle_deg: f64) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let (sin_t, cos_t) = angle_deg.to_radians().sin_cos();
    let cx = (w / 2) as f64;
    let cy = (h / 2) as f64;
    let mut out = GrayImage::new_fill(w, h, 0);
    for y in 0..h {
        let dy = y as f64 - cy;
        for x in 0..w {
            let dx = x as f64 - cx;
            let sx = (cx + cos_t * dx - sin_t * dy).round() as i64;
            let sy = (cy + sin_t * dx + cos_t * dy).round() as i64;
            if let Some(v) = src.get_checked(sx, sy) {
                out.data[y * w + x] = v;
            }
        }
    }
    out
}

#[inline]
fn odd_aperture(ksize: usize) -> usize {
    ksize.max(1) | 1
}

#[inline]
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * n - 2 - i;
        }
    }
    i as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erosion_grows_dark_speck() {
        let mut img = GrayImage::new_fill(5, 5, 200);
        img.set(2, 2, 10);
        let out = erode3x3_u8(&img.view());
        for y in 1..=3 {
            for x in 1..=3 {
                assert_eq!(out.get(x, y), 10);
            }
        }
        assert_eq!(out.get(0, 0), 200);
        assert_eq!(out.get(4, 4), 200);
    }

    #[test]
    fn gaussian_kernel_is_normalized_and_symmetric() {
        let g = gaussian_kernel(5, 0.0);
        assert_eq!(g.len(), 5);
        let sum: f32 = g.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!((g[0] - g[4]).abs() < 1e-7);
        assert!(g[2] > g[1]);
        assert_eq!(gaussian_kernel(4, 0.0).len(), 5);
    }

    #[test]
    fn blur_preserves_flat_frame() {
        let img = GrayImage::new_fill(7, 6, 123);
        let out = gaussian_blur_u8(&img.view(), 3, 5);
        assert!(out.data.iter().all(|&v| v == 123));
    }

    #[test]
    fn threshold_polarity() {
        let img = GrayImage::from_raw(3, 1, vec![10, 100, 200]).expect("valid");
        let direct = threshold_u8(&img.view(), 100.0, Binarization::Direct);
        assert_eq!(direct.data, vec![0, 0, 255]);
        let inverse = threshold_u8(&img.view(), 100.0, Binarization::Inverse);
        assert_eq!(inverse.data, vec![255, 255, 0]);
    }

    #[test]
    fn zero_rotation_is_identity() {
        let img = GrayImage::from_raw(3, 2, vec![1, 2, 3, 4, 5, 6]).expect("valid");
        let out = rotate_nearest_u8(&img.view(), 0.0);
        assert_eq!(out, img);
    }

    #[test]
    fn reflect101_mirrors_without_repeating_edge() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(6, 5), 2);
        assert_eq!(reflect101(3, 5), 3);
    }
}
