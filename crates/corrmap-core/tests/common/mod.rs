use ndarray::{Array2, Array3};

use corrmap_core::image::{Image2D, Image3D};

/// Tiny xorshift PRNG so fixtures are deterministic without extra deps.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_f64(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Synthetic speckle pattern: Gaussian blobs of width `sigma` scattered at
/// a fixed density.
pub fn speckle_image(width: usize, height: usize, sigma: f64, seed: u64) -> Image2D {
    let mut rng = XorShift::new(seed);
    let mut data = Array2::<f32>::zeros((height, width));
    let blobs = width * height / 40;
    let support = (3.0 * sigma).ceil() as i64;
    for _ in 0..blobs {
        let cx = rng.next_f64() * width as f64;
        let cy = rng.next_f64() * height as f64;
        let amp = 0.5 + 0.5 * rng.next_f64();
        for dy in -support..=support {
            let y = cy as i64 + dy;
            if y < 0 || y >= height as i64 {
                continue;
            }
            for dx in -support..=support {
                let x = cx as i64 + dx;
                if x < 0 || x >= width as i64 {
                    continue;
                }
                let ex = x as f64 - cx;
                let ey = y as f64 - cy;
                data[[y as usize, x as usize]] +=
                    (amp * (-(ex * ex + ey * ey) / (2.0 * sigma * sigma)).exp()) as f32;
            }
        }
    }
    Image2D::new(data)
}

/// Synthetic speckle volume, cubic, side `size`.
pub fn speckle_volume(size: usize, sigma: f64, seed: u64) -> Image3D {
    let mut rng = XorShift::new(seed);
    let mut data = Array3::<f32>::zeros((size, size, size));
    let blobs = size * size * size / 60;
    let support = (3.0 * sigma).ceil() as i64;
    for _ in 0..blobs {
        let cx = rng.next_f64() * size as f64;
        let cy = rng.next_f64() * size as f64;
        let cz = rng.next_f64() * size as f64;
        let amp = 0.5 + 0.5 * rng.next_f64();
        for dz in -support..=support {
            let z = cz as i64 + dz;
            if z < 0 || z >= size as i64 {
                continue;
            }
            for dy in -support..=support {
                let y = cy as i64 + dy;
                if y < 0 || y >= size as i64 {
                    continue;
                }
                for dx in -support..=support {
                    let x = cx as i64 + dx;
                    if x < 0 || x >= size as i64 {
                        continue;
                    }
                    let ex = x as f64 - cx;
                    let ey = y as f64 - cy;
                    let ez = z as f64 - cz;
                    data[[z as usize, y as usize, x as usize]] += (amp
                        * (-(ex * ex + ey * ey + ez * ez) / (2.0 * sigma * sigma)).exp())
                        as f32;
                }
            }
        }
    }
    Image3D::new(data)
}

/// Shift an image by whole pixels: `out(x) = in(x - tx)`, zero outside.
pub fn shift_image_integer(image: &Image2D, tx: i32, ty: i32) -> Image2D {
    let (h, w) = image.data.dim();
    let mut out = Array2::<f32>::zeros((h, w));
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let sx = x - tx;
            let sy = y - ty;
            if sx >= 0 && sy >= 0 && (sx as usize) < w && (sy as usize) < h {
                out[[y as usize, x as usize]] = image.value(sy as usize, sx as usize);
            }
        }
    }
    Image2D::new(out)
}

/// Shift a volume by whole voxels: `out(x) = in(x - t)`, zero outside.
pub fn shift_volume_integer(volume: &Image3D, tx: i32, ty: i32, tz: i32) -> Image3D {
    let (d, h, w) = volume.data.dim();
    let mut out = Array3::<f32>::zeros((d, h, w));
    for z in 0..d as i32 {
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let sx = x - tx;
                let sy = y - ty;
                let sz = z - tz;
                if sx >= 0
                    && sy >= 0
                    && sz >= 0
                    && (sx as usize) < w
                    && (sy as usize) < h
                    && (sz as usize) < d
                {
                    out[[z as usize, y as usize, x as usize]] =
                        volume.value(sz as usize, sy as usize, sx as usize);
                }
            }
        }
    }
    Image3D::new(out)
}

/// Band-limited analytic pattern, smooth enough for cubic B-spline
/// reconstruction to track sub-pixel shifts.
pub fn smooth_pattern(x: f64, y: f64) -> f64 {
    0.5 + 0.2 * (0.55 * x).sin() + 0.2 * (0.5 * y).sin() + 0.1 * (0.3 * x + 0.4 * y).sin()
}

/// Sample [`smooth_pattern`] displaced by `(shift_x, shift_y)`, so the true
/// displacement mapping this image back onto the unshifted one is exactly
/// the shift.
pub fn smooth_image(width: usize, height: usize, shift_x: f64, shift_y: f64) -> Image2D {
    let mut data = Array2::<f32>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            data[[y, x]] = smooth_pattern(x as f64 - shift_x, y as f64 - shift_y) as f32;
        }
    }
    Image2D::new(data)
}
