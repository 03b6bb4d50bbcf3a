use std::sync::Mutex;

use nalgebra::{SMatrix, SVector};
use ndarray::{Array3, Array4};
use rayon::prelude::*;
use tracing::{debug, info};

use super::{check_common, IcgnConfig3D};
use crate::consts::{MIN_SUBSET_NORM, ZNCC_DEGENERATE, ZNCC_OUT_OF_BOUNDS};
use crate::deformation::Deformation3D1;
use crate::error::{CorrError, Result};
use crate::gradient::Gradient3D;
use crate::image::Image3D;
use crate::interp::TricubicBspline;
use crate::point::Point3D;
use crate::poi::Poi3D;
use crate::subset::Subset3D;

type Mat12 = SMatrix<f64, 12, 12>;
type Vec12 = SVector<f64, 12>;

struct Scratch {
    ref_subset: Subset3D,
    tar_subset: Subset3D,
    error_img: Array3<f64>,
    /// Steepest-descent rows, shape `(subset_d, subset_h, subset_w, 12)`.
    sd_img: Array4<f64>,
}

impl Scratch {
    fn new(radius_x: usize, radius_y: usize, radius_z: usize) -> Self {
        let d = 2 * radius_z + 1;
        let h = 2 * radius_y + 1;
        let w = 2 * radius_x + 1;
        Self {
            ref_subset: Subset3D::new(Point3D::default(), radius_x, radius_y, radius_z),
            tar_subset: Subset3D::new(Point3D::default(), radius_x, radius_y, radius_z),
            error_img: Array3::zeros((d, h, w)),
            sd_img: Array4::zeros((d, h, w, 12)),
        }
    }
}

/// First-order inverse-compositional Gauss-Newton refinement in 3D.
///
/// The convergence norm uses only the translational components, matching
/// the volumetric formulation this estimator follows.
pub struct Icgn3D1<'a> {
    radius_x: usize,
    radius_y: usize,
    radius_z: usize,
    conv_criterion: f64,
    stop_condition: usize,
    pool: rayon::ThreadPool,
    scratch: Vec<Mutex<Scratch>>,
    ref_vol: Option<&'a Image3D>,
    tar_vol: Option<&'a Image3D>,
    gradient: Option<Gradient3D>,
    interp: Option<TricubicBspline>,
}

impl<'a> Icgn3D1<'a> {
    pub fn new(config: &IcgnConfig3D) -> Result<Self> {
        check_common(
            &[
                config.subset_radius_x,
                config.subset_radius_y,
                config.subset_radius_z,
            ],
            config.conv_criterion,
            config.stop_condition,
            config.thread_number,
        )?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.thread_number)
            .build()?;
        let scratch = (0..config.thread_number)
            .map(|_| {
                Mutex::new(Scratch::new(
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
            conv_criterion: config.conv_criterion,
            stop_condition: config.stop_condition,
            pool,
            scratch,
            ref_vol: None,
            tar_vol: None,
            gradient: None,
            interp: None,
        })
    }

    pub fn set_images(&mut self, ref_vol: &'a Image3D, tar_vol: &'a Image3D) {
        self.ref_vol = Some(ref_vol);
        self.tar_vol = Some(tar_vol);
        self.gradient = None;
        self.interp = None;
    }

    pub fn prepare(&mut self) -> Result<()> {
        let (ref_vol, tar_vol) = self.volumes()?;
        debug!(
            width = ref_vol.width(),
            height = ref_vol.height(),
            depth = ref_vol.depth(),
            "icgn-3d1 prepare"
        );
        self.gradient = Some(Gradient3D::compute(ref_vol));
        self.interp = Some(TricubicBspline::prepare(tar_vol));
        Ok(())
    }

    pub fn set_criteria(&mut self, conv_criterion: f64, stop_condition: usize) {
        self.conv_criterion = conv_criterion;
        self.stop_condition = stop_condition;
    }

    fn volumes(&self) -> Result<(&'a Image3D, &'a Image3D)> {
        match (self.ref_vol, self.tar_vol) {
            (Some(r), Some(t)) => Ok((r, t)),
            _ => Err(CorrError::NotPrepared("Icgn3D1: set_images before compute")),
        }
    }

    pub fn compute(&self, poi: &mut Poi3D) -> Result<()> {
        self.compute_with_slot(poi, rayon::current_thread_index().unwrap_or(0))
    }

    pub fn compute_batch(&self, pois: &mut [Poi3D]) -> Result<()> {
        self.volumes()?;
        info!(pois = pois.len(), "icgn-3d1 batch");
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
        let (ref_vol, _) = self.volumes()?;
        let gradient = self
            .gradient
            .as_ref()
            .ok_or(CorrError::NotPrepared("Icgn3D1: prepare before compute"))?;
        let interp = self
            .interp
            .as_ref()
            .ok_or(CorrError::NotPrepared("Icgn3D1: prepare before compute"))?;

        let df = &poi.deformation;
        let guess = [
            df.u, df.ux, df.uy, df.uz, df.v, df.vx, df.vy, df.vz, df.w, df.wx, df.wy, df.wz,
        ];
        if guess.iter().any(|g| !g.is_finite()) {
            poi.result.zncc = ZNCC_OUT_OF_BOUNDS;
            return Ok(());
        }
        let rx = self.radius_x as i32;
        let ry = self.radius_y as i32;
        let rz = self.radius_z as i32;
        if poi.x - rx < 0
            || poi.y - ry < 0
            || poi.z - rz < 0
            || poi.x + rx >= ref_vol.width() as i32
            || poi.y + ry >= ref_vol.height() as i32
            || poi.z + rz >= ref_vol.depth() as i32
        {
            poi.result.zncc = ZNCC_OUT_OF_BOUNDS;
            return Ok(());
        }

        let mut guard = self.scratch[slot].lock().unwrap();
        let s = &mut *guard;
        let sdep = s.ref_subset.depth();
        let sh = s.ref_subset.height();
        let sw = s.ref_subset.width();

        s.ref_subset.center = Point3D::from_indices(poi.x, poi.y, poi.z);
        s.ref_subset.fill(ref_vol);
        let ref_norm = s.ref_subset.zero_mean_norm();
        if ref_norm < MIN_SUBSET_NORM {
            poi.result.zncc = ZNCC_DEGENERATE;
            return Ok(());
        }

        let mut hessian = Mat12::zeros();
        for t in 0..sdep {
            let zl = t as i32 - rz;
            for r in 0..sh {
                let yl = r as i32 - ry;
                for c in 0..sw {
                    let xl = c as i32 - rx;
                    let idx = [
                        (poi.z + zl) as usize,
                        (poi.y + yl) as usize,
                        (poi.x + xl) as usize,
                    ];
                    let gx = gradient.gx[idx];
                    let gy = gradient.gy[idx];
                    let gz = gradient.gz[idx];
                    let x = xl as f64;
                    let y = yl as f64;
                    let z = zl as f64;
                    let sd = [
                        gx,
                        gx * x,
                        gx * y,
                        gx * z,
                        gy,
                        gy * x,
                        gy * y,
                        gy * z,
                        gz,
                        gz * x,
                        gz * y,
                        gz * z,
                    ];
                    for (k, v) in sd.iter().enumerate() {
                        s.sd_img[[t, r, c, k]] = *v;
                    }
                    for i in 0..12 {
                        for j in 0..12 {
                            hessian[(i, j)] += sd[i] * sd[j];
                        }
                    }
                }
            }
        }
        let hessian_inv = match hessian.try_inverse() {
            Some(inv) => inv,
            None => {
                poi.result.zncc = ZNCC_DEGENERATE;
                return Ok(());
            }
        };

        poi.result.u0 = guess[0];
        poi.result.v0 = guess[4];
        poi.result.w0 = guess[8];

        let mut p = Deformation3D1::new(
            guess[0], guess[1], guess[2], guess[3], guess[4], guess[5], guess[6], guess[7],
            guess[8], guess[9], guess[10], guess[11],
        );
        let cx = poi.x as f64;
        let cy = poi.y as f64;
        let cz = poi.z as f64;

        let mut iteration = 0usize;
        let mut dp_norm = f64::MAX;
        let mut znssd = 0.0;
        while iteration < self.stop_condition && dp_norm >= self.conv_criterion {
            iteration += 1;

            for t in 0..sdep {
                for r in 0..sh {
                    for c in 0..sw {
                        let local = Point3D::new(
                            (c as i32 - rx) as f64,
                            (r as i32 - ry) as f64,
                            (t as i32 - rz) as f64,
                        );
                        let warped = p.warp_point(local);
                        let global =
                            Point3D::new(cx + warped.x, cy + warped.y, cz + warped.z);
                        s.tar_subset.data[[t, r, c]] = interp.sample(&global);
                    }
                }
            }
            let tar_norm = s.tar_subset.zero_mean_norm();
            if tar_norm < MIN_SUBSET_NORM {
                poi.result.zncc = ZNCC_DEGENERATE;
                return Ok(());
            }
            let scale = ref_norm / tar_norm;

            znssd = 0.0;
            for t in 0..sdep {
                for r in 0..sh {
                    for c in 0..sw {
                        let e =
                            s.tar_subset.data[[t, r, c]] * scale - s.ref_subset.data[[t, r, c]];
                        s.error_img[[t, r, c]] = e;
                        znssd += e * e;
                    }
                }
            }
            znssd /= ref_norm * ref_norm;

            let mut numerator = Vec12::zeros();
            for t in 0..sdep {
                for r in 0..sh {
                    for c in 0..sw {
                        let e = s.error_img[[t, r, c]];
                        for k in 0..12 {
                            numerator[k] += s.sd_img[[t, r, c, k]] * e;
                        }
                    }
                }
            }

            let dp = hessian_inv * numerator;
            let incr = Deformation3D1::new(
                dp[0], dp[1], dp[2], dp[3], dp[4], dp[5], dp[6], dp[7], dp[8], dp[9], dp[10],
                dp[11],
            );
            if !p.compose_inverse(&incr) {
                poi.result.zncc = ZNCC_DEGENERATE;
                return Ok(());
            }
            // Translational components only.
            dp_norm = (dp[0] * dp[0] + dp[4] * dp[4] + dp[8] * dp[8]).sqrt();
        }

        poi.deformation.u = p.u;
        poi.deformation.ux = p.ux;
        poi.deformation.uy = p.uy;
        poi.deformation.uz = p.uz;
        poi.deformation.v = p.v;
        poi.deformation.vx = p.vx;
        poi.deformation.vy = p.vy;
        poi.deformation.vz = p.vz;
        poi.deformation.w = p.w;
        poi.deformation.wx = p.wx;
        poi.deformation.wy = p.wy;
        poi.deformation.wz = p.wz;
        poi.result.zncc = 0.5 * (2.0 - znssd);
        poi.result.iteration = iteration;
        poi.result.convergence = dp_norm;
        Ok(())
    }
}
