use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Per-worker spectral scratch for 2D correlation: complex ref/tar buffers
/// sized to the even `2r` window plus pre-made plans per axis. The rustfft
/// planner is not shared between threads, so all plans are created on the
/// constructing thread and handed out through these packs.
pub(super) struct FftPack2D {
    pub width: usize,
    pub height: usize,
    pub ref_buf: Vec<Complex<f64>>,
    pub tar_buf: Vec<Complex<f64>>,
    line: Vec<Complex<f64>>,
    fwd_x: Arc<dyn Fft<f64>>,
    fwd_y: Arc<dyn Fft<f64>>,
    inv_x: Arc<dyn Fft<f64>>,
    inv_y: Arc<dyn Fft<f64>>,
}

impl FftPack2D {
    pub fn new(planner: &mut FftPlanner<f64>, radius_x: usize, radius_y: usize) -> Self {
        let width = 2 * radius_x;
        let height = 2 * radius_y;
        Self {
            width,
            height,
            ref_buf: vec![Complex::default(); width * height],
            tar_buf: vec![Complex::default(); width * height],
            line: vec![Complex::default(); height],
            fwd_x: planner.plan_fft_forward(width),
            fwd_y: planner.plan_fft_forward(height),
            inv_x: planner.plan_fft_inverse(width),
            inv_y: planner.plan_fft_inverse(height),
        }
    }

    pub fn forward_ref(&mut self) {
        transform_2d(
            &mut self.ref_buf,
            &mut self.line,
            self.width,
            self.height,
            self.fwd_x.as_ref(),
            self.fwd_y.as_ref(),
        );
    }

    pub fn forward_tar(&mut self) {
        transform_2d(
            &mut self.tar_buf,
            &mut self.line,
            self.width,
            self.height,
            self.fwd_x.as_ref(),
            self.fwd_y.as_ref(),
        );
    }

    /// Inverse-transform the ref buffer in place (unnormalized).
    pub fn inverse_ref(&mut self) {
        transform_2d(
            &mut self.ref_buf,
            &mut self.line,
            self.width,
            self.height,
            self.inv_x.as_ref(),
            self.inv_y.as_ref(),
        );
    }
}

fn transform_2d(
    buf: &mut [Complex<f64>],
    line: &mut [Complex<f64>],
    w: usize,
    h: usize,
    fft_x: &dyn Fft<f64>,
    fft_y: &dyn Fft<f64>,
) {
    for r in 0..h {
        fft_x.process(&mut buf[r * w..(r + 1) * w]);
    }
    for c in 0..w {
        for r in 0..h {
            line[r] = buf[r * w + c];
        }
        fft_y.process(&mut line[..h]);
        for r in 0..h {
            buf[r * w + c] = line[r];
        }
    }
}

/// 3D counterpart of [`FftPack2D`], window `2rx x 2ry x 2rz`.
pub(super) struct FftPack3D {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub ref_buf: Vec<Complex<f64>>,
    pub tar_buf: Vec<Complex<f64>>,
    line: Vec<Complex<f64>>,
    fwd_x: Arc<dyn Fft<f64>>,
    fwd_y: Arc<dyn Fft<f64>>,
    fwd_z: Arc<dyn Fft<f64>>,
    inv_x: Arc<dyn Fft<f64>>,
    inv_y: Arc<dyn Fft<f64>>,
    inv_z: Arc<dyn Fft<f64>>,
}

impl FftPack3D {
    pub fn new(
        planner: &mut FftPlanner<f64>,
        radius_x: usize,
        radius_y: usize,
        radius_z: usize,
    ) -> Self {
        let width = 2 * radius_x;
        let height = 2 * radius_y;
        let depth = 2 * radius_z;
        Self {
            width,
            height,
            depth,
            ref_buf: vec![Complex::default(); width * height * depth],
            tar_buf: vec![Complex::default(); width * height * depth],
            line: vec![Complex::default(); height.max(depth)],
            fwd_x: planner.plan_fft_forward(width),
            fwd_y: planner.plan_fft_forward(height),
            fwd_z: planner.plan_fft_forward(depth),
            inv_x: planner.plan_fft_inverse(width),
            inv_y: planner.plan_fft_inverse(height),
            inv_z: planner.plan_fft_inverse(depth),
        }
    }

    pub fn forward_ref(&mut self) {
        transform_3d(
            &mut self.ref_buf,
            &mut self.line,
            self.width,
            self.height,
            self.depth,
            self.fwd_x.as_ref(),
            self.fwd_y.as_ref(),
            self.fwd_z.as_ref(),
        );
    }

    pub fn forward_tar(&mut self) {
        transform_3d(
            &mut self.tar_buf,
            &mut self.line,
            self.width,
            self.height,
            self.depth,
            self.fwd_x.as_ref(),
            self.fwd_y.as_ref(),
            self.fwd_z.as_ref(),
        );
    }

    pub fn inverse_ref(&mut self) {
        transform_3d(
            &mut self.ref_buf,
            &mut self.line,
            self.width,
            self.height,
            self.depth,
            self.inv_x.as_ref(),
            self.inv_y.as_ref(),
            self.inv_z.as_ref(),
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn transform_3d(
    buf: &mut [Complex<f64>],
    line: &mut [Complex<f64>],
    w: usize,
    h: usize,
    d: usize,
    fft_x: &dyn Fft<f64>,
    fft_y: &dyn Fft<f64>,
    fft_z: &dyn Fft<f64>,
) {
    for s in 0..d {
        for r in 0..h {
            let start = (s * h + r) * w;
            fft_x.process(&mut buf[start..start + w]);
        }
    }
    for s in 0..d {
        for c in 0..w {
            for r in 0..h {
                line[r] = buf[(s * h + r) * w + c];
            }
            fft_y.process(&mut line[..h]);
            for r in 0..h {
                buf[(s * h + r) * w + c] = line[r];
            }
        }
    }
    for r in 0..h {
        for c in 0..w {
            for s in 0..d {
                line[s] = buf[(s * h + r) * w + c];
            }
            fft_z.process(&mut line[..d]);
            for s in 0..d {
                buf[(s * h + r) * w + c] = line[s];
            }
        }
    }
}

/// Cross spectrum `conj(ref) * tar`, written into the ref buffer:
/// `re = r.re*t.re + r.im*t.im`, `im = r.re*t.im - r.im*t.re`. The sign
/// convention makes the correlation peak land at the displacement index
/// directly (verified by the integer-shift tests).
pub(super) fn cross_spectrum(ref_buf: &mut [Complex<f64>], tar_buf: &[Complex<f64>]) {
    for (r, t) in ref_buf.iter_mut().zip(tar_buf) {
        *r = r.conj() * t;
    }
}
