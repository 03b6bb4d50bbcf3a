use std::sync::Mutex;

use num_complex::Complex;
use rayon::prelude::*;
use rustfft::FftPlanner;
use tracing::info;

use super::scratch::{cross_spectrum, FftPack3D};
use super::FftCcConfig3D;
use crate::consts::{MIN_SUBSET_NORM, ZNCC_DEGENERATE, ZNCC_OUT_OF_BOUNDS};
use crate::error::{CorrError, Result};
use crate::image::Image3D;
use crate::poi::Poi3D;

/// Volumetric integer-voxel displacement estimator; the 3D generalization
/// of [`super::FftCc2D`] with peak decoding row-major over `(w, v, u)`.
pub struct FftCc3D<'a> {
    radius_x: usize,
    radius_y: usize,
    radius_z: usize,
    pool: rayon::ThreadPool,
    scratch: Vec<Mutex<FftPack3D>>,
    ref_vol: Option<&'a Image3D>,
    tar_vol: Option<&'a Image3D>,
}

impl<'a> FftCc3D<'a> {
    pub fn new(config: &FftCcConfig3D) -> Result<Self> {
        if config.subset_radius_x == 0 || config.subset_radius_y == 0 || config.subset_radius_z == 0
        {
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
        let mut planner = FftPlanner::new();
        let scratch = (0..config.thread_number)
            .map(|_| {
                Mutex::new(FftPack3D::new(
                    &mut planner,
                    config.subset_radius_x,
                    config.subset_radius_y,
                    config.subset_radius_z,
                ))
            })
            .collect();
        Ok(Self {
            radius_x: config.subset_radius_x,
            radius_y: config.subset_radius_y,
            radius_z: config.subset_radius_z,
            pool,
            scratch,
            ref_vol: None,
            tar_vol: None,
        })
    }

    pub fn set_images(&mut self, ref_vol: &'a Image3D, tar_vol: &'a Image3D) {
        self.ref_vol = Some(ref_vol);
        self.tar_vol = Some(tar_vol);
    }

    fn volumes(&self) -> Result<(&'a Image3D, &'a Image3D)> {
        match (self.ref_vol, self.tar_vol) {
            (Some(r), Some(t)) => Ok((r, t)),
            _ => Err(CorrError::NotPrepared("FftCc3D: set_images before compute")),
        }
    }

    pub fn compute(&self, poi: &mut Poi3D) -> Result<()> {
        self.compute_with_slot(poi, rayon::current_thread_index().unwrap_or(0))
    }

    pub fn compute_batch(&self, pois: &mut [Poi3D]) -> Result<()> {
        self.volumes()?;
        info!(pois = pois.len(), "fftcc-3d batch");
        self.pool.install(|| {
            pois.par_iter_mut().try_for_each(|poi| {
                self.compute_with_slot(poi, rayon::current_thread_index().unwrap_or(0))
            })
        })
    }

    fn compute_with_slot(&self, poi: &mut Poi3D, slot: usize) -> Result<()> {
        if slot >= self.scratch.len() {
            return Err(CorrError::ScratchExhausted {
                index: slot,
                pool_size: self.scratch.len(),
            });
        }
        let (ref_vol, tar_vol) = self.volumes()?;

        let u0 = poi.deformation.u;
        let v0 = poi.deformation.v;
        let w0 = poi.deformation.w;
        if !u0.is_finite() || !v0.is_finite() || !w0.is_finite() {
            poi.result.zncc = ZNCC_OUT_OF_BOUNDS;
            return Ok(());
        }

        let rx = self.radius_x as i32;
        let ry = self.radius_y as i32;
        let rz = self.radius_z as i32;
        let du0 = u0 as i32;
        let dv0 = v0 as i32;
        let dw0 = w0 as i32;
        if !window_in_bounds(poi, rx, ry, rz, 0, 0, 0, ref_vol)
            || !window_in_bounds(poi, rx, ry, rz, du0, dv0, dw0, tar_vol)
        {
            poi.result.zncc = ZNCC_OUT_OF_BOUNDS;
            return Ok(());
        }
        poi.result.u0 = u0;
        poi.result.v0 = v0;
        poi.result.w0 = w0;

        let mut guard = self.scratch[slot].lock().unwrap();
        let pack = &mut *guard;
        let w = pack.width;
        let h = pack.height;
        let d = pack.depth;
        let n = (w * h * d) as f64;

        for s in 0..d {
            let z = (poi.z - rz + s as i32) as usize;
            for r in 0..h {
                let y = (poi.y - ry + r as i32) as usize;
                for c in 0..w {
                    let x = (poi.x - rx + c as i32) as usize;
                    let idx = (s * h + r) * w + c;
                    pack.ref_buf[idx] = Complex::new(ref_vol.value(z, y, x) as f64, 0.0);
                    pack.tar_buf[idx] = Complex::new(
                        tar_vol.value(
                            (z as i32 + dw0) as usize,
                            (y as i32 + dv0) as usize,
                            (x as i32 + du0) as usize,
                        ) as f64,
                        0.0,
                    );
                }
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
        let mut dv = ((peak_idx / w) % h) as i32;
        let mut dw = (peak_idx / (w * h)) as i32;
        if du > rx {
            du -= w as i32;
        }
        if dv > ry {
            dv -= h as i32;
        }
        if dw > rz {
            dw -= d as i32;
        }

        poi.deformation.u = (du0 + du) as f64;
        poi.deformation.v = (dv0 + dv) as f64;
        poi.deformation.w = (dw0 + dw) as f64;
        poi.result.zncc = peak / ((ref_norm * tar_norm).sqrt() * n);
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn window_in_bounds(
    poi: &Poi3D,
    rx: i32,
    ry: i32,
    rz: i32,
    du: i32,
    dv: i32,
    dw: i32,
    vol: &Image3D,
) -> bool {
    let x0 = poi.x - rx + du;
    let y0 = poi.y - ry + dv;
    let z0 = poi.z - rz + dw;
    x0 >= 0
        && y0 >= 0
        && z0 >= 0
        && x0 + 2 * rx <= vol.width() as i32
        && y0 + 2 * ry <= vol.height() as i32
        && z0 + 2 * rz <= vol.depth() as i32
}
