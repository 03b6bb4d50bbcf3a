use std::sync::Mutex;

use num_complex::Complex;
use rayon::prelude::*;
use rustfft::FftPlanner;
use tracing::info;

use super::scratch::{cross_spectrum, FftPack2D};
use super::FftCcConfig2D;
use crate::consts::{MIN_SUBSET_NORM, ZNCC_DEGENERATE, ZNCC_OUT_OF_BOUNDS};
use crate::error::{CorrError, Result};
use crate::image::Image2D;
use crate::poi::Poi2D;

/// Integer-pixel displacement estimator: zero-mean normalized cross
/// correlation evaluated in the frequency domain over an even `2r` window
/// around each POI. Typically chained before Gauss-Newton refinement to
/// provide the initial guess.
pub struct FftCc2D<'a> {
    radius_x: usize,
    radius_y: usize,
    pool: rayon::ThreadPool,
    scratch: Vec<Mutex<FftPack2D>>,
    ref_img: Option<&'a Image2D>,
    tar_img: Option<&'a Image2D>,
}

impl<'a> FftCc2D<'a> {
    pub fn new(config: &FftCcConfig2D) -> Result<Self> {
        if config.subset_radius_x == 0 || config.subset_radius_y == 0 {
            return Err(CorrError::InvalidConfig(
                "subset radii must be positive".into(),
            ));
        }
        if config.thread_number == 0 {
            return Err(CorrError::InvalidConfig(
                "thread_number must be positive".into(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.thread_number)
            .build()?;
        // Plans are created serially here; the planner is not reentrant.
        let mut planner = FftPlanner::new();
        let scratch = (0..config.thread_number)
            .map(|_| {
                Mutex::new(FftPack2D::new(
                    &mut planner,
                    config.subset_radius_x,
                    config.subset_radius_y,
                ))
            })
            .collect();
        Ok(Self {
            radius_x: config.subset_radius_x,
            radius_y: config.subset_radius_y,
            pool,
            scratch,
            ref_img: None,
            tar_img: None,
        })
    }

    /// Borrow the reference and target views for subsequent compute calls.
    pub fn set_images(&mut self, ref_img: &'a Image2D, tar_img: &'a Image2D) {
        self.ref_img = Some(ref_img);
        self.tar_img = Some(tar_img);
    }

    fn images(&self) -> Result<(&'a Image2D, &'a Image2D)> {
        match (self.ref_img, self.tar_img) {
            (Some(r), Some(t)) => Ok((r, t)),
            _ => Err(CorrError::NotPrepared("FftCc2D: set_images before compute")),
        }
    }

    pub fn compute(&self, poi: &mut Poi2D) -> Result<()> {
        self.compute_with_slot(poi, rayon::current_thread_index().unwrap_or(0))
    }

    /// Estimate all POIs in place; result order equals input order.
    pub fn compute_batch(&self, pois: &mut [Poi2D]) -> Result<()> {
        self.images()?;
        info!(pois = pois.len(), "fftcc-2d batch");
        self.pool.install(|| {
            pois.par_iter_mut().try_for_each(|poi| {
                self.compute_with_slot(poi, rayon::current_thread_index().unwrap_or(0))
            })
        })
    }

    fn compute_with_slot(&self, poi: &mut Poi2D, slot: usize) -> Result<()> {
        if slot >= self.scratch.len() {
            return Err(CorrError::ScratchExhausted {
                index: slot,
                pool_size: self.scratch.len(),
            });
        }
        let (ref_img, tar_img) = self.images()?;

        let u0 = poi.deformation.u;
        let v0 = poi.deformation.v;
        if !u0.is_finite() || !v0.is_finite() {
            poi.result.zncc = ZNCC_OUT_OF_BOUNDS;
            return Ok(());
        }

        let rx = self.radius_x as i32;
        let ry = self.radius_y as i32;
        let du0 = u0 as i32;
        let dv0 = v0 as i32;
        if !window_in_bounds(poi.x, poi.y, rx, ry, 0, 0, ref_img)
            || !window_in_bounds(poi.x, poi.y, rx, ry, du0, dv0, tar_img)
        {
            poi.result.zncc = ZNCC_OUT_OF_BOUNDS;
            return Ok(());
        }
        poi.result.u0 = u0;
        poi.result.v0 = v0;

        let mut guard = self.scratch[slot].lock().unwrap();
        let pack = &mut *guard;
        let w = pack.width;
        let h = pack.height;
        let n = (w * h) as f64;

        for r in 0..h {
            let y = (poi.y - ry + r as i32) as usize;
            for c in 0..w {
                let x = (poi.x - rx + c as i32) as usize;
                pack.ref_buf[r * w + c] = Complex::new(ref_img.value(y, x) as f64, 0.0);
                pack.tar_buf[r * w + c] = Complex::new(
                    tar_img.value((y as i32 + dv0) as usize, (x as i32 + du0) as usize) as f64,
                    0.0,
                );
            }
        }

        let ref_mean = pack.ref_buf.iter().map(|v| v.re).sum::<f64>() / n;
        let tar_mean = pack.tar_buf.iter().map(|v| v.re).sum::<f64>() / n;
        let mut ref_norm = 0.0;
        let mut tar_norm = 0.0;
        for v in pack.ref_buf.iter_mut() {
            v.re -= ref_mean;
            ref_norm += v.re * v.re;
        }
        for v in pack.tar_buf.iter_mut() {
            v.re -= tar_mean;
            tar_norm += v.re * v.re;
        }
        if ref_norm < MIN_SUBSET_NORM || tar_norm < MIN_SUBSET_NORM {
            poi.result.zncc = ZNCC_DEGENERATE;
            return Ok(());
        }

        pack.forward_ref();
        pack.forward_tar();
        cross_spectrum(&mut pack.ref_buf, &pack.tar_buf);
        pack.inverse_ref();

        let mut peak = f64::NEG_INFINITY;
        let mut peak_idx = 0usize;
        for (i, v) in pack.ref_buf.iter().enumerate() {
            if v.re > peak {
                peak = v.re;
                peak_idx = i;
            }
        }

        let mut du = (peak_idx % w) as i32;
        let mut dv = (peak_idx / w) as i32;
        if du > rx {
            du -= w as i32;
        }
        if dv > ry {
            dv -= h as i32;
        }

        poi.deformation.u = (du0 + du) as f64;
        poi.deformation.v = (dv0 + dv) as f64;
        poi.result.zncc = peak / ((ref_norm * tar_norm).sqrt() * n);
        Ok(())
    }
}

fn window_in_bounds(x: i32, y: i32, rx: i32, ry: i32, du: i32, dv: i32, img: &Image2D) -> bool {
    let x0 = x - rx + du;
    let y0 = y - ry + dv;
    x0 >= 0
        && y0 >= 0
        && x0 + 2 * rx <= img.width() as i32
        && y0 + 2 * ry <= img.height() as i32
}
