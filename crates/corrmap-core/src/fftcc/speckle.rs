//! Half-peak speckle-size diagnostic.
//!
//! Autocorrelates a window of the reference image and measures the width
//! of the correlation peak at a configured fractional height. Used to pick
//! subset radii before a run, not inside the correlation loop, so each
//! call makes its own plans.

use num_complex::Complex;
use rustfft::FftPlanner;

use super::scratch::{cross_spectrum, FftPack2D, FftPack3D};
use crate::consts::MIN_SUBSET_NORM;
use crate::image::{Image2D, Image3D};

/// Per-axis full width of the autocorrelation peak, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpeckleSize2D {
    pub x: f64,
    pub y: f64,
}

/// Per-axis full width of the autocorrelation peak, in voxels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpeckleSize3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Measure the speckle size from a `2rx x 2ry` window centered at
/// `(x, y)`. Returns `None` if the window leaves the image or the window
/// is textureless.
pub fn speckle_size_2d(
    image: &Image2D,
    x: i32,
    y: i32,
    radius_x: usize,
    radius_y: usize,
    half_peak_ratio: f64,
) -> Option<SpeckleSize2D> {
    let rx = radius_x as i32;
    let ry = radius_y as i32;
    if x - rx < 0
        || y - ry < 0
        || x + rx > image.width() as i32
        || y + ry > image.height() as i32
    {
        return None;
    }

    let mut planner = FftPlanner::new();
    let mut pack = FftPack2D::new(&mut planner, radius_x, radius_y);
    let w = pack.width;
    let h = pack.height;

    for r in 0..h {
        for c in 0..w {
            pack.ref_buf[r * w + c] = Complex::new(
                image.value((y - ry + r as i32) as usize, (x - rx + c as i32) as usize) as f64,
                0.0,
            );
        }
    }
    let n = (w * h) as f64;
    let mean = pack.ref_buf.iter().map(|v| v.re).sum::<f64>() / n;
    let mut norm = 0.0;
    for v in pack.ref_buf.iter_mut() {
        v.re -= mean;
        norm += v.re * v.re;
    }
    if norm < MIN_SUBSET_NORM {
        return None;
    }

    pack.forward_ref();
    pack.tar_buf.copy_from_slice(&pack.ref_buf);
    cross_spectrum(&mut pack.ref_buf, &pack.tar_buf);
    pack.inverse_ref();

    // The autocorrelation peak sits at index 0; reflected indexing shifts
    // it to the window center.
    let peak = pack.ref_buf[0].re;
    let corr = |dx: i32, dy: i32| -> f64 {
        let c = dx.rem_euclid(w as i32) as usize;
        let r = dy.rem_euclid(h as i32) as usize;
        pack.ref_buf[r * w + c].re / peak
    };

    let right_x = axis_crossing(radius_x, half_peak_ratio, |i| corr(i, 0));
    let left_x = axis_crossing(radius_x, half_peak_ratio, |i| corr(-i, 0));
    let right_y = axis_crossing(radius_y, half_peak_ratio, |i| corr(0, i));
    let left_y = axis_crossing(radius_y, half_peak_ratio, |i| corr(0, -i));

    Some(SpeckleSize2D {
        x: right_x + left_x,
        y: right_y + left_y,
    })
}

/// Measure the speckle size from a `2rx x 2ry x 2rz` window centered at
/// `(x, y, z)`.
#[allow(clippy::too_many_arguments)]
pub fn speckle_size_3d(
    volume: &Image3D,
    x: i32,
    y: i32,
    z: i32,
    radius_x: usize,
    radius_y: usize,
    radius_z: usize,
    half_peak_ratio: f64,
) -> Option<SpeckleSize3D> {
    let rx = radius_x as i32;
    let ry = radius_y as i32;
    let rz = radius_z as i32;
    if x - rx < 0
        || y - ry < 0
        || z - rz < 0
        || x + rx > volume.width() as i32
        || y + ry > volume.height() as i32
        || z + rz > volume.depth() as i32
    {
        return None;
    }

    let mut planner = FftPlanner::new();
    let mut pack = FftPack3D::new(&mut planner, radius_x, radius_y, radius_z);
    let w = pack.width;
    let h = pack.height;
    let d = pack.depth;

    for s in 0..d {
        for r in 0..h {
            for c in 0..w {
                pack.ref_buf[(s * h + r) * w + c] = Complex::new(
                    volume.value(
                        (z - rz + s as i32) as usize,
                        (y - ry + r as i32) as usize,
                        (x - rx + c as i32) as usize,
                    ) as f64,
                    0.0,
                );
            }
        }
    }
    let n = (w * h * d) as f64;
    let mean = pack.ref_buf.iter().map(|v| v.re).sum::<f64>() / n;
    let mut norm = 0.0;
    for v in pack.ref_buf.iter_mut() {
        v.re -= mean;
        norm += v.re * v.re;
    }
    if norm < MIN_SUBSET_NORM {
        return None;
    }

    pack.forward_ref();
    pack.tar_buf.copy_from_slice(&pack.ref_buf);
    cross_spectrum(&mut pack.ref_buf, &pack.tar_buf);
    pack.inverse_ref();

    let peak = pack.ref_buf[0].re;
    let corr = |dx: i32, dy: i32, dz: i32| -> f64 {
        let c = dx.rem_euclid(w as i32) as usize;
        let r = dy.rem_euclid(h as i32) as usize;
        let s = dz.rem_euclid(d as i32) as usize;
        pack.ref_buf[(s * h + r) * w + c].re / peak
    };

    Some(SpeckleSize3D {
        x: axis_crossing(radius_x, half_peak_ratio, |i| corr(i, 0, 0))
            + axis_crossing(radius_x, half_peak_ratio, |i| corr(-i, 0, 0)),
        y: axis_crossing(radius_y, half_peak_ratio, |i| corr(0, i, 0))
            + axis_crossing(radius_y, half_peak_ratio, |i| corr(0, -i, 0)),
        z: axis_crossing(radius_z, half_peak_ratio, |i| corr(0, 0, i))
            + axis_crossing(radius_z, half_peak_ratio, |i| corr(0, 0, -i)),
    })
}

/// Average the diagnostic over a grid of window centers with `step`
/// spacing. Returns `None` when no window yields a measurement.
pub fn mean_speckle_size_2d(
    image: &Image2D,
    radius_x: usize,
    radius_y: usize,
    step: usize,
    half_peak_ratio: f64,
) -> Option<SpeckleSize2D> {
    let step = step.max(1);
    let mut acc = SpeckleSize2D::default();
    let mut count = 0usize;
    let mut y = radius_y;
    while y + radius_y <= image.height() {
        let mut x = radius_x;
        while x + radius_x <= image.width() {
            if let Some(s) =
                speckle_size_2d(image, x as i32, y as i32, radius_x, radius_y, half_peak_ratio)
            {
                acc.x += s.x;
                acc.y += s.y;
                count += 1;
            }
            x += step;
        }
        y += step;
    }
    (count > 0).then(|| SpeckleSize2D {
        x: acc.x / count as f64,
        y: acc.y / count as f64,
    })
}

/// 3D counterpart of [`mean_speckle_size_2d`].
pub fn mean_speckle_size_3d(
    volume: &Image3D,
    radius_x: usize,
    radius_y: usize,
    radius_z: usize,
    step: usize,
    half_peak_ratio: f64,
) -> Option<SpeckleSize3D> {
    let step = step.max(1);
    let mut acc = SpeckleSize3D::default();
    let mut count = 0usize;
    let mut z = radius_z;
    while z + radius_z <= volume.depth() {
        let mut y = radius_y;
        while y + radius_y <= volume.height() {
            let mut x = radius_x;
            while x + radius_x <= volume.width() {
                if let Some(s) = speckle_size_3d(
                    volume,
                    x as i32,
                    y as i32,
                    z as i32,
                    radius_x,
                    radius_y,
                    radius_z,
                    half_peak_ratio,
                ) {
                    acc.x += s.x;
                    acc.y += s.y;
                    acc.z += s.z;
                    count += 1;
                }
                x += step;
            }
            y += step;
        }
        z += step;
    }
    (count > 0).then(|| SpeckleSize3D {
        x: acc.x / count as f64,
        y: acc.y / count as f64,
        z: acc.z / count as f64,
    })
}

/// Scan outward from the peak for the first drop of the normalized
/// correlation below `ratio` and linearly interpolate the fractional
/// crossing. The scan stops one short of the radius so the lookahead
/// sample stays inside the window; if no crossing is found the radius is
/// returned saturated.
fn axis_crossing(radius: usize, ratio: f64, corr: impl Fn(i32) -> f64) -> f64 {
    for i in 0..radius.saturating_sub(1) {
        let a = corr(i as i32);
        let b = corr(i as i32 + 1);
        if a >= ratio && b < ratio {
            return i as f64 + (a - ratio) / (a - b);
        }
    }
    radius as f64
}
